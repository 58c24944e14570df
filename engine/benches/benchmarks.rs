//! Performance benchmarks for repairdesk-engine

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use repairdesk_engine::{
    canonical, filter::filter_in, id, Customer, Estimate, FilterSpec, OrderDetails, OrderRecord,
    OrderStatus, Receiver, StatusFilter,
};

fn make_order(i: usize) -> OrderRecord {
    let base = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
    OrderRecord {
        id: format!("order_{i}"),
        receiver: Receiver {
            name: "Meera".into(),
            designation: "Front desk".into(),
        },
        customer: Some(Customer {
            name: format!("Customer {i}"),
            phone: format!("90000{i:05}"),
            address: String::new(),
        }),
        order_details: OrderDetails {
            device_model: "Galaxy S21".into(),
            status: OrderStatus::ALL[i % OrderStatus::ALL.len()],
            problems: vec!["Battery".into(), "Screen".into()],
        },
        estimate: Estimate {
            repair_cost: format!("{}", 1000 + i),
            advance_paid: "200".into(),
            pickup_date: Some(base + Duration::days((i % 30) as i64)),
            pickup_time: None,
        },
        repair_partner: Default::default(),
        device_kyc: Default::default(),
    }
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");

    for size in [100usize, 1000, 10000] {
        let records: Vec<_> = (0..size).map(make_order).collect();
        let spec = FilterSpec::new()
            .order_status("Pending,Delivered".parse::<StatusFilter>().unwrap())
            .customer_search("customer 1");

        group.bench_with_input(BenchmarkId::new("status_and_search", size), &records, |b, records| {
            b.iter(|| filter_in(black_box(records), black_box(&spec), &Utc))
        });
    }

    let records: Vec<_> = (0..1000).map(make_order).collect();
    let spec = FilterSpec::new().pickup_date(chrono::NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
    group.bench_function("pickup_day_1000", |b| {
        b.iter(|| filter_in(black_box(&records), black_box(&spec), &Utc))
    });

    group.finish();
}

fn bench_equality(c: &mut Criterion) {
    let mut group = c.benchmark_group("equality");

    let a = make_order(7);
    let same = a.clone();
    let mut changed = a.clone();
    changed.order_details.status = OrderStatus::Delivered;

    group.bench_function("is_equal_same", |b| {
        b.iter(|| canonical::is_equal(black_box(&a), black_box(&same)))
    });

    group.bench_function("is_equal_changed", |b| {
        b.iter(|| canonical::is_equal(black_box(&a), black_box(&changed)))
    });

    group.bench_function("canonical_json", |b| {
        b.iter(|| canonical::canonical_json(black_box(&a)))
    });

    group.finish();
}

fn bench_ids(c: &mut Criterion) {
    let mut group = c.benchmark_group("ids");

    group.bench_function("generate", |b| b.iter(id::generate));

    group.bench_function("validate", |b| {
        let generated = id::generate();
        b.iter(|| id::validate(black_box(&generated)))
    });

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    let records: Vec<_> = (0..500).map(make_order).collect();
    let blob = serde_json::to_string(&records).unwrap();

    group.bench_function("orders_to_json_500", |b| {
        b.iter(|| serde_json::to_string(black_box(&records)))
    });

    group.bench_function("orders_from_json_500", |b| {
        b.iter(|| serde_json::from_str::<Vec<OrderRecord>>(black_box(&blob)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_filter,
    bench_equality,
    bench_ids,
    bench_serialization,
);
criterion_main!(benches);
