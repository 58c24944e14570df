//! Reconciliation of the local order set against the remote store.
//!
//! Local wins. Each pass walks every local record and drives it through
//!
//! ```text
//! START -> FETCHING_REMOTE -> {NOT_FOUND, FOUND} -> DECIDING
//!       -> {CREATING, UPDATING, SKIPPING} -> DONE | FAILED
//! ```
//!
//! A record missing remotely is created, a diverging one is overwritten with
//! the local copy, an equal one is left alone. Failures are collected per
//! record and never abort the pass.
//!
//! # Retries
//!
//! When a pass ends with failures the whole pass is re-run after a delay
//! taken from the [`RetryPolicy`] (exponential backoff). Once the attempt
//! budget is spent the engine publishes [`SyncStatus::Exhausted`] and stops.
//!
//! # Overlap
//!
//! Passes never overlap: they are serialized by an async mutex. Calling
//! [`SyncEngine::reconcile`] supersedes a retry that is scheduled but has
//! not started yet; a retry already running finishes first.
//!
//! Nothing here deletes records on either side.

use crate::canonical::is_equal;
use crate::remote::RemoteStore;
use crate::store::OrderStore;
use crate::{Error, OrderRecord, RecordId};
use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// Bounded exponential backoff for failed passes.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total passes, the first one included.
    pub max_attempts: u32,
    /// Delay before the second pass.
    pub initial_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5 * 60),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delays before each retry pass, in order. Yields `max_attempts - 1` delays.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_factor(self.multiplier as f32)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
            .build()
    }
}

/// What a pass did with one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordOutcome {
    Created,
    Updated,
    Skipped,
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Records that reached DONE (created, updated or skipped).
    pub succeeded: usize,
    /// Ids that reached FAILED, in local order.
    pub failed: Vec<RecordId>,
    /// Whether another pass has been scheduled.
    pub retry_scheduled: bool,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Pass number within the current retry chain, starting at 1.
    pub attempt: u32,
}

impl ReconcileReport {
    /// Whether every record made it to the remote store.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Remote writes issued by the pass.
    pub fn writes(&self) -> usize {
        self.created + self.updated
    }

    fn record(&mut self, id: &str, outcome: Result<RecordOutcome, Error>) {
        match outcome {
            Ok(RecordOutcome::Created) => self.created += 1,
            Ok(RecordOutcome::Updated) => self.updated += 1,
            Ok(RecordOutcome::Skipped) => self.skipped += 1,
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "order failed to sync");
                self.failed.push(id.to_string());
                return;
            }
        }
        self.succeeded += 1;
    }
}

/// Engine state as seen by the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SyncStatus {
    /// No pass has run, or the retry chain was cancelled or superseded.
    #[default]
    Idle,
    Running { attempt: u32 },
    /// The last pass synced every record.
    Synced { succeeded: usize },
    /// Some records failed; pass `attempt` will run after `delay`.
    RetryScheduled { attempt: u32, delay: Duration },
    /// Retries are used up and these records are still failing.
    Exhausted { attempts: u32, failed: Vec<RecordId> },
}

impl SyncStatus {
    /// Whether no further pass will run without a new request.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            SyncStatus::Idle | SyncStatus::Synced { .. } | SyncStatus::Exhausted { .. }
        )
    }
}

/// Drive a single record through one pass.
pub async fn reconcile_record(
    remote: &dyn RemoteStore,
    local: &OrderRecord,
) -> crate::Result<RecordOutcome> {
    match remote.get(&local.id).await? {
        None => {
            remote.create(local).await?;
            Ok(RecordOutcome::Created)
        }
        Some(existing) if is_equal(local, &existing) => Ok(RecordOutcome::Skipped),
        Some(_) => {
            remote.update(&local.id, local).await?;
            Ok(RecordOutcome::Updated)
        }
    }
}

struct Inner {
    store: Arc<OrderStore>,
    remote: Arc<dyn RemoteStore>,
    policy: RetryPolicy,
    concurrency: usize,
    pass_lock: Mutex<()>,
    generation: AtomicU64,
    /// User passes waiting for `pass_lock`.
    queued: AtomicUsize,
    status: watch::Sender<SyncStatus>,
}

/// Counts a user pass as queued until it holds the pass lock.
struct QueuedPass<'a>(&'a AtomicUsize);

impl<'a> QueuedPass<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for QueuedPass<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs reconciliation passes and their retries.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("policy", &self.inner.policy)
            .field("concurrency", &self.inner.concurrency)
            .field("status", &*self.inner.status.borrow())
            .finish()
    }
}

impl SyncEngine {
    /// Engine with the default retry policy, one record at a time.
    pub fn new(store: Arc<OrderStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self::with_options(store, remote, RetryPolicy::default(), 1)
    }

    pub fn with_options(
        store: Arc<OrderStore>,
        remote: Arc<dyn RemoteStore>,
        policy: RetryPolicy,
        concurrency: usize,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                store,
                remote,
                policy,
                concurrency: concurrency.max(1),
                pass_lock: Mutex::new(()),
                generation: AtomicU64::new(0),
                queued: AtomicUsize::new(0),
                status,
            }),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    /// Current status.
    pub fn status(&self) -> SyncStatus {
        self.inner.status.borrow().clone()
    }

    /// Receiver that observes every status change.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    /// Run a pass now.
    ///
    /// Supersedes any scheduled retry. When the pass has failures and the
    /// policy allows, a retry is scheduled in the background and the report
    /// says so.
    pub async fn reconcile(&self) -> ReconcileReport {
        let queued = QueuedPass::enter(&self.inner.queued);
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = self.inner.pass_lock.lock().await;
        drop(queued);

        let mut schedule = self.inner.policy.backoff();
        let mut report = self.run_pass(1).await;
        if let Some(delay) = self.settle(generation, &mut report, &mut schedule) {
            let engine = self.clone();
            let next = report.attempt + 1;
            tokio::spawn(async move {
                engine.retry_loop(schedule, next, delay, generation).await
            });
        }
        report
    }

    /// Drop any scheduled retry. A pass already running is not interrupted.
    pub fn cancel_retry(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.status.send_if_modified(|status| {
            if matches!(status, SyncStatus::RetryScheduled { .. }) {
                *status = SyncStatus::Idle;
                true
            } else {
                false
            }
        });
        tracing::info!("cancelled scheduled sync retry");
    }

    /// Wait until no further pass is pending.
    ///
    /// Fails with [`Error::RetryExhausted`] when the retry budget ran out.
    pub async fn wait_for_settled(&self) -> crate::Result<()> {
        let mut rx = self.subscribe();
        loop {
            let status = rx.borrow_and_update().clone();
            match status {
                SyncStatus::Exhausted { attempts, failed } => {
                    return Err(Error::RetryExhausted { attempts, failed })
                }
                SyncStatus::Idle | SyncStatus::Synced { .. } => return Ok(()),
                SyncStatus::Running { .. } | SyncStatus::RetryScheduled { .. } => {}
            }
            if rx.changed().await.is_err() {
                return Ok(());
            }
        }
    }

    async fn retry_loop(
        &self,
        mut schedule: ExponentialBackoff,
        mut attempt: u32,
        mut delay: Duration,
        generation: u64,
    ) {
        loop {
            tokio::time::sleep(delay).await;
            if self.is_superseded(generation) {
                tracing::debug!(attempt, "scheduled retry superseded");
                return;
            }

            let _guard = self.inner.pass_lock.lock().await;
            if self.is_superseded(generation) {
                tracing::debug!(attempt, "scheduled retry superseded");
                return;
            }

            let mut report = self.run_pass(attempt).await;
            match self.settle(generation, &mut report, &mut schedule) {
                Some(next_delay) => {
                    attempt += 1;
                    delay = next_delay;
                }
                None => return,
            }
        }
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) != generation
    }

    async fn run_pass(&self, attempt: u32) -> ReconcileReport {
        self.inner
            .status
            .send_replace(SyncStatus::Running { attempt });

        let records = self.inner.store.all().await;
        tracing::debug!(attempt, count = records.len(), "starting sync pass");

        let outcomes: Vec<_> = stream::iter(records)
            .map(|record| {
                let remote = Arc::clone(&self.inner.remote);
                async move {
                    let outcome = reconcile_record(remote.as_ref(), &record).await;
                    if let Ok(step) = &outcome {
                        tracing::debug!(id = %record.id, outcome = ?step, "order synced");
                    }
                    (record.id, outcome)
                }
            })
            .buffered(self.inner.concurrency)
            .collect()
            .await;

        let mut report = ReconcileReport {
            attempt,
            ..ReconcileReport::default()
        };
        for (id, outcome) in outcomes {
            report.record(&id, outcome);
        }
        report
    }

    /// Publish the outcome of a pass and decide whether another one follows.
    ///
    /// Returns the delay before the next pass when a retry is scheduled. An
    /// empty `schedule` means the attempt budget is spent.
    fn settle(
        &self,
        generation: u64,
        report: &mut ReconcileReport,
        schedule: &mut ExponentialBackoff,
    ) -> Option<Duration> {
        let status = &self.inner.status;
        if report.is_complete() {
            tracing::info!(
                attempt = report.attempt,
                succeeded = report.succeeded,
                created = report.created,
                updated = report.updated,
                skipped = report.skipped,
                "sync pass complete"
            );
            status.send_replace(SyncStatus::Synced {
                succeeded: report.succeeded,
            });
            return None;
        }

        if self.is_superseded(generation) {
            tracing::debug!(attempt = report.attempt, "retry chain superseded");
            // A queued pass publishes its own status; only a cancel leaves us idle.
            if self.inner.queued.load(Ordering::SeqCst) == 0 {
                status.send_replace(SyncStatus::Idle);
            }
            return None;
        }

        if let Some(delay) = schedule.next() {
            let next = report.attempt + 1;
            tracing::warn!(
                attempt = report.attempt,
                failed = report.failed.len(),
                retry_in = ?delay,
                "sync pass had failures; retry scheduled"
            );
            report.retry_scheduled = true;
            status.send_replace(SyncStatus::RetryScheduled {
                attempt: next,
                delay,
            });
            Some(delay)
        } else {
            tracing::error!(
                attempts = report.attempt,
                failed = ?report.failed,
                "sync retries exhausted"
            );
            status.send_replace(SyncStatus::Exhausted {
                attempts: report.attempt,
                failed: report.failed.clone(),
            });
            None
        }
    }
}
