use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::TryStreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use linkpatrol_application::ports::UrlStore;
use linkpatrol_application::services::HostWorkerPool;

const DEFAULT_TARGET_DURATION: Duration = Duration::from_secs(60);

/// Outer scheduler loop: each iteration streams due URLs into the worker
/// pool, stops streaming once the iteration wallclock target is reached,
/// then paces itself out to the target before starting over.
pub struct CheckerLoop {
    store: Arc<dyn UrlStore>,
    pool: Arc<HostWorkerPool>,
    target_duration: Duration,
    single_run: bool,
    run_number: AtomicU64,
    run_start: Mutex<Instant>,
}

impl CheckerLoop {
    pub fn new(store: Arc<dyn UrlStore>, pool: Arc<HostWorkerPool>) -> Self {
        Self {
            store,
            pool,
            target_duration: DEFAULT_TARGET_DURATION,
            single_run: false,
            run_number: AtomicU64::new(0),
            run_start: Mutex::new(Instant::now()),
        }
    }

    pub fn with_target_duration(mut self, target_duration: Duration) -> Self {
        self.target_duration = target_duration;
        self
    }

    pub fn with_single_run(mut self, single_run: bool) -> Self {
        self.single_run = single_run;
        self
    }

    /// One line of current-iteration statistics, for the SIGINFO dump.
    pub fn statistics_line(&self) -> String {
        let stats = self.pool.statistics();
        let run = self.run_number.load(Ordering::Relaxed);
        let elapsed = self
            .run_start
            .lock()
            .expect("run start poisoned")
            .elapsed();

        format!(
            "Run #{} running for {:.2}: {} url(s) scanned, {} submitted for processing, {} processed, {} worker(s) running",
            run,
            elapsed.as_secs_f64(),
            stats.scanned,
            stats.submitted,
            stats.processed,
            stats.workers,
        )
    }

    /// Drives iterations until cancelled (or forever on `single_run = false`).
    /// Cancellation is terminal: the current iteration stops streaming and
    /// in-flight workers wind down through `join`.
    pub async fn run(&self, shutdown: CancellationToken) {
        loop {
            let run_number = self.run_number.fetch_add(1, Ordering::Relaxed) + 1;
            let run_start = Instant::now();
            *self.run_start.lock().expect("run start poisoned") = run_start;

            info!(run = run_number, "run started");
            self.pool.reset_statistics();

            {
                let mut urls = self.store.urls_due();
                loop {
                    if shutdown.is_cancelled() {
                        break;
                    }
                    match urls.try_next().await {
                        Ok(Some(url)) => {
                            self.pool.add_url(url).await;
                            if run_start.elapsed() > self.target_duration {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            error!(error = %e, "failed to stream due urls");
                            break;
                        }
                    }
                }
            }

            if shutdown.is_cancelled() {
                info!("shutdown requested, draining workers");
                self.pool.join().await;
                return;
            }

            if self.single_run {
                self.pool.join().await;
                return;
            }

            let elapsed = run_start.elapsed();
            if elapsed < self.target_duration {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("shutdown requested, draining workers");
                        self.pool.join().await;
                        return;
                    }
                    _ = tokio::time::sleep(self.target_duration - elapsed) => {}
                }
            }

            let stats = self.pool.statistics();
            let duration_secs = run_start.elapsed().as_secs_f64();
            info!(
                run = run_number,
                duration_secs,
                scanned = stats.scanned,
                submitted = stats.submitted,
                processed = stats.processed,
                workers = stats.workers,
                "run finished"
            );
        }
    }
}
