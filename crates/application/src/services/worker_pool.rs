use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::ports::UrlProcessor;
use crate::services::HostPolicy;

/// Snapshot of pool counters. `scanned` counts admissions, `submitted` URLs
/// handed to a processor, `processed` URLs whose processor call returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStatistics {
    pub scanned: u64,
    pub submitted: u64,
    pub processed: u64,
    pub workers: usize,
}

struct WorkerQueues {
    pending: HashSet<String>,
    in_flight: HashSet<String>,
}

struct WorkerEntry {
    queues: Arc<Mutex<WorkerQueues>>,
    task: JoinHandle<()>,
}

struct PoolState {
    workers: HashMap<String, WorkerEntry>,
    finished: Vec<JoinHandle<()>>,
}

struct PoolShared {
    // Lock order is always pool state before worker queues.
    state: Mutex<PoolState>,
    worker_finished: Notify,
    scanned: AtomicU64,
    submitted: AtomicU64,
    processed: AtomicU64,
}

/// Bounded pool of per-host workers keyed by aggregation key. At most one
/// worker (and therefore one in-flight batch) exists per key; admission for
/// keys without a worker blocks while the pool is at capacity.
pub struct HostWorkerPool {
    shared: Arc<PoolShared>,
    processor: Arc<dyn UrlProcessor>,
    policy: Arc<HostPolicy>,
    max_workers: usize,
    max_host_queue: usize,
}

impl HostWorkerPool {
    pub fn new(
        processor: Arc<dyn UrlProcessor>,
        policy: Arc<HostPolicy>,
        max_workers: usize,
        max_host_queue: usize,
    ) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                state: Mutex::new(PoolState {
                    workers: HashMap::new(),
                    finished: Vec::new(),
                }),
                worker_finished: Notify::new(),
                scanned: AtomicU64::new(0),
                submitted: AtomicU64::new(0),
                processed: AtomicU64::new(0),
            }),
            processor,
            policy,
            max_workers,
            max_host_queue,
        }
    }

    /// Admit one URL. Returns immediately when the key already has a worker
    /// (duplicates of in-flight URLs and per-host overflow are dropped);
    /// otherwise waits for pool headroom before spawning a fresh worker.
    pub async fn add_url(&self, url: String) {
        self.shared.scanned.fetch_add(1, Ordering::Relaxed);

        let key = self.policy.aggregation_key(&url);

        loop {
            // Arm the wakeup before checking capacity so a worker finishing
            // in between is not missed.
            let finished = self.shared.worker_finished.notified();

            {
                let mut state = self.shared.state.lock().expect("pool state poisoned");

                if let Some(entry) = state.workers.get(&key) {
                    let mut queues = entry.queues.lock().expect("worker queues poisoned");
                    if queues.in_flight.contains(&url) {
                        return;
                    }
                    if queues.pending.len() < self.max_host_queue {
                        queues.pending.insert(url);
                    } else {
                        debug!(host = %key, %url, "host queue full, dropping url");
                    }
                    return;
                }

                if state.workers.len() < self.max_workers {
                    let queues = Arc::new(Mutex::new(WorkerQueues {
                        pending: HashSet::from([url]),
                        in_flight: HashSet::new(),
                    }));
                    // The worker cannot observe its (non-empty) queue until
                    // the state lock is released below.
                    let task = tokio::spawn(run_worker(
                        self.shared.clone(),
                        self.processor.clone(),
                        key.clone(),
                        queues.clone(),
                    ));
                    state.workers.insert(key, WorkerEntry { queues, task });
                    return;
                }
            }

            finished.await;
            self.reap_finished().await;
        }
    }

    /// Wait until every worker has drained and retired.
    pub async fn join(&self) {
        loop {
            let finished = self.shared.worker_finished.notified();

            if self
                .shared
                .state
                .lock()
                .expect("pool state poisoned")
                .workers
                .is_empty()
            {
                self.reap_finished().await;
                return;
            }

            finished.await;
            self.reap_finished().await;
        }
    }

    pub fn statistics(&self) -> PoolStatistics {
        PoolStatistics {
            scanned: self.shared.scanned.load(Ordering::Relaxed),
            submitted: self.shared.submitted.load(Ordering::Relaxed),
            processed: self.shared.processed.load(Ordering::Relaxed),
            workers: self
                .shared
                .state
                .lock()
                .expect("pool state poisoned")
                .workers
                .len(),
        }
    }

    pub fn reset_statistics(&self) {
        self.shared.scanned.store(0, Ordering::Relaxed);
        self.shared.submitted.store(0, Ordering::Relaxed);
        self.shared.processed.store(0, Ordering::Relaxed);
    }

    async fn reap_finished(&self) {
        let finished: Vec<JoinHandle<()>> = {
            let mut state = self.shared.state.lock().expect("pool state poisoned");
            state.finished.drain(..).collect()
        };

        for task in finished {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!(error = %e, "host worker panicked");
                }
            }
        }
    }
}

async fn run_worker(
    shared: Arc<PoolShared>,
    processor: Arc<dyn UrlProcessor>,
    key: String,
    queues: Arc<Mutex<WorkerQueues>>,
) {
    loop {
        let batch: Vec<String> = {
            let mut state = shared.state.lock().expect("pool state poisoned");
            let mut q = queues.lock().expect("worker queues poisoned");

            if q.pending.is_empty() {
                // Retirement happens under the pool lock, so no URL can be
                // enqueued between the emptiness check and the removal.
                if let Some(entry) = state.workers.remove(&key) {
                    state.finished.push(entry.task);
                }
                shared.worker_finished.notify_one();
                return;
            }

            q.in_flight = std::mem::take(&mut q.pending);
            q.in_flight.iter().cloned().collect()
        };

        let count = batch.len() as u64;
        shared.submitted.fetch_add(count, Ordering::Relaxed);

        // Keeps the pool joinable when a processor panics: the entry is
        // removed and the finished event still fires.
        let mut retire = RetireOnPanic {
            shared: &shared,
            key: &key,
            armed: true,
        };
        let result = processor.process_urls(batch).await;
        retire.armed = false;
        drop(retire);

        if let Err(e) = result {
            error!(host = %key, error = %e, "failed to process url batch");
        }

        queues
            .lock()
            .expect("worker queues poisoned")
            .in_flight
            .clear();
        shared.processed.fetch_add(count, Ordering::Relaxed);
    }
}

struct RetireOnPanic<'a> {
    shared: &'a PoolShared,
    key: &'a str,
    armed: bool,
}

impl Drop for RetireOnPanic<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.workers.remove(self.key);
        self.shared.worker_finished.notify_one();
    }
}
