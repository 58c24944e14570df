//! Record identifier generation.
//!
//! Ids are `<time>_<random>`: the time component is the current Unix time in
//! milliseconds rendered in base 36, bumped forward when needed so that it
//! strictly increases within a process; the random component is eight base-36
//! characters. The result fits the remote store's key rules: only
//! `[A-Za-z0-9_]`, never a leading `_`, at most 36 characters.
//!
//! No check against existing records is made.

use crate::{error::Result, Error, RecordId};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum id length accepted by the remote store.
pub const MAX_ID_LEN: usize = 36;

const RANDOM_LEN: usize = 8;
const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static LAST_MILLIS: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh record id.
pub fn generate() -> RecordId {
    let millis = next_millis(now_millis());
    let mut rng = rand::thread_rng();

    let mut id = to_base36(millis);
    id.push('_');
    for _ in 0..RANDOM_LEN {
        id.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
    }
    id
}

/// Check that an id satisfies the storage key rules.
pub fn validate(id: &str) -> Result<()> {
    let well_formed = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && !id.starts_with('_')
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');

    if well_formed {
        Ok(())
    } else {
        Err(Error::InvalidRecordId(id.to_string()))
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Returns `max(now, last + 1)` and records it.
fn next_millis(now: u64) -> u64 {
    let mut last = LAST_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_MILLIS.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => last = observed,
        }
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::with_capacity(13);
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
