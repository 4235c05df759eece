//! Bounded background work queues.
//!
//! Index synchronization and analytics recording run detached from the
//! request that triggered them. Both go through a [`BoundedDispatcher`]: a
//! fixed number of workers, each draining its own fixed-capacity channel,
//! with an explicit [`OverflowPolicy`] deciding what happens when a queue is
//! full.

use crate::metrics::{DISPATCH_DROPPED_TOTAL, DISPATCH_QUEUE_DEPTH};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumString};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

/// What to do with a task when the queue is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OverflowPolicy {
    /// Reject the incoming task immediately (logged and counted)
    #[default]
    DropNewest,
    /// Wait up to `block_timeout_ms` for capacity, then drop
    Block,
}

/// Queue sizing for one dispatcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Total capacity, split evenly across workers
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub overflow: OverflowPolicy,

    /// Upper bound on waiting for capacity under `OverflowPolicy::Block`
    #[serde(default = "default_block_timeout_ms")]
    pub block_timeout_ms: u64,
}

fn default_queue_size() -> usize {
    1_000
}

fn default_workers() -> usize {
    4
}

fn default_block_timeout_ms() -> u64 {
    500
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_size: default_queue_size(),
            workers: default_workers(),
            overflow: OverflowPolicy::default(),
            block_timeout_ms: default_block_timeout_ms(),
        }
    }
}

/// Result of handing a task to a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Queued,
    /// Queue full (or blocking wait timed out)
    Dropped,
    /// Workers have shut down
    Closed,
}

impl DispatchOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, DispatchOutcome::Queued)
    }
}

/// Processes tasks pulled off a dispatcher queue
#[async_trait]
pub trait TaskHandler<T>: Send + Sync {
    async fn handle(&self, task: T);
}

/// Fixed-capacity queues with a fixed worker pool.
///
/// Each worker drains its own queue. Keyed submissions always land on the
/// same worker, so tasks sharing a key are handled one at a time in
/// submission order. Unkeyed submissions are spread round-robin.
pub struct BoundedDispatcher<T> {
    name: String,
    shards: Vec<mpsc::Sender<T>>,
    next_shard: AtomicUsize,
    overflow: OverflowPolicy,
    block_timeout: Duration,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl<T: Send + 'static> BoundedDispatcher<T> {
    /// Create the queues and spawn their workers on the current runtime.
    ///
    /// `queue_size` is the total capacity, split evenly across workers.
    pub fn spawn(
        name: impl Into<String>,
        config: &DispatchConfig,
        handler: Arc<dyn TaskHandler<T>>,
    ) -> Self {
        let name = name.into();
        let workers = config.workers.max(1);
        let queue_size = config.queue_size.max(workers);
        let shard_capacity = queue_size.div_ceil(workers);

        let pending = Arc::new(AtomicUsize::new(0));
        let idle = Arc::new(Notify::new());

        let shards = (0..workers)
            .map(|worker_id| {
                let (tx, rx) = mpsc::channel(shard_capacity);
                Self::spawn_worker(
                    name.clone(),
                    worker_id,
                    rx,
                    handler.clone(),
                    pending.clone(),
                    idle.clone(),
                );
                tx
            })
            .collect();

        info!(
            queue = %name,
            workers,
            queue_size,
            overflow = %config.overflow,
            "Dispatcher started"
        );

        Self {
            name,
            shards,
            next_shard: AtomicUsize::new(0),
            overflow: config.overflow,
            block_timeout: Duration::from_millis(config.block_timeout_ms),
            pending,
            idle,
        }
    }

    fn spawn_worker(
        name: String,
        worker_id: usize,
        mut rx: mpsc::Receiver<T>,
        handler: Arc<dyn TaskHandler<T>>,
        pending: Arc<AtomicUsize>,
        idle: Arc<Notify>,
    ) {
        tokio::spawn(async move {
            debug!(queue = %name, worker_id, "Dispatch worker started");

            while let Some(task) = rx.recv().await {
                handler.handle(task).await;

                let remaining = pending.fetch_sub(1, Ordering::SeqCst) - 1;
                DISPATCH_QUEUE_DEPTH
                    .with_label_values(&[name.as_str()])
                    .set(remaining as f64);
                if remaining == 0 {
                    idle.notify_waiters();
                }
            }

            debug!(queue = %name, worker_id, "Dispatch worker stopped");
        });
    }

    fn round_robin(&self) -> &mpsc::Sender<T> {
        let shard = self.next_shard.fetch_add(1, Ordering::Relaxed) % self.shards.len();
        &self.shards[shard]
    }

    fn keyed(&self, key: &str) -> &mpsc::Sender<T> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() % self.shards.len() as u64) as usize]
    }

    /// Submit a task according to the configured overflow policy
    pub async fn submit(&self, task: T) -> DispatchOutcome {
        self.submit_to(self.round_robin(), task).await
    }

    /// Like [`submit`](Self::submit), keeping tasks with the same key in order
    pub async fn submit_keyed(&self, key: &str, task: T) -> DispatchOutcome {
        self.submit_to(self.keyed(key), task).await
    }

    async fn submit_to(&self, tx: &mpsc::Sender<T>, task: T) -> DispatchOutcome {
        match self.overflow {
            OverflowPolicy::DropNewest => self.try_submit_to(tx, task),
            OverflowPolicy::Block => {
                self.pending.fetch_add(1, Ordering::SeqCst);
                match tokio::time::timeout(self.block_timeout, tx.send(task)).await {
                    Ok(Ok(())) => self.queued(),
                    Ok(Err(_)) => self.rejected(DispatchOutcome::Closed),
                    Err(_) => self.rejected(DispatchOutcome::Dropped),
                }
            }
        }
    }

    /// Submit without ever waiting; a full queue drops the task
    pub fn try_submit(&self, task: T) -> DispatchOutcome {
        self.try_submit_to(self.round_robin(), task)
    }

    fn try_submit_to(&self, tx: &mpsc::Sender<T>, task: T) -> DispatchOutcome {
        self.pending.fetch_add(1, Ordering::SeqCst);
        match tx.try_send(task) {
            Ok(()) => self.queued(),
            Err(mpsc::error::TrySendError::Full(_)) => self.rejected(DispatchOutcome::Dropped),
            Err(mpsc::error::TrySendError::Closed(_)) => self.rejected(DispatchOutcome::Closed),
        }
    }

    fn queued(&self) -> DispatchOutcome {
        DISPATCH_QUEUE_DEPTH
            .with_label_values(&[self.name.as_str()])
            .set(self.pending() as f64);
        DispatchOutcome::Queued
    }

    fn rejected(&self, outcome: DispatchOutcome) -> DispatchOutcome {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }

        let reason = match outcome {
            DispatchOutcome::Closed => "closed",
            _ => "full",
        };
        DISPATCH_DROPPED_TOTAL
            .with_label_values(&[self.name.as_str(), reason])
            .inc();
        warn!(queue = %self.name, reason, "Background task dropped");

        outcome
    }

    /// Tasks queued or in flight
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait until every accepted task has been handled
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Like [`wait_idle`](Self::wait_idle) with an upper bound; returns whether the queue drained
    pub async fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_idle()).await.is_ok()
    }
}
