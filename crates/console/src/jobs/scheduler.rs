//! Periodic jobs sharing one cancellation token.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::ConsoleError;
use crate::telemetry;

const MIN_PERIOD: Duration = Duration::from_millis(100);

/// A task run on a fixed period while its scheduler is alive.
#[async_trait::async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    fn period(&self) -> Duration;

    async fn run(&self) -> Result<(), ConsoleError>;
}

/// Owns the tasks driving a set of jobs.
///
/// Jobs start as soon as they are spawned and first run one period later.
/// Ticks missed while the host was suspended are skipped, not replayed.
pub struct JobScheduler {
    cancel: CancellationToken,
    tasks: JoinSet<&'static str>,
}

impl JobScheduler {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Scheduler whose jobs also stop when `parent` is cancelled.
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            cancel: parent.child_token(),
            tasks: JoinSet::new(),
        }
    }

    pub fn spawn<J: Job + 'static>(&mut self, job: J) {
        let job: Arc<dyn Job> = Arc::new(job);
        debug!(job = job.name(), period_ms = job.period().as_millis(), "Job scheduled");
        self.tasks.spawn(drive(job, self.cancel.clone()));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancels every job and waits up to `grace` for them to finish; stragglers are aborted.
    pub async fn stop(mut self, grace: Duration) {
        self.cancel.cancel();

        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = self.tasks.join_next().await {
                match joined {
                    Ok(name) => debug!(job = name, "Job stopped"),
                    Err(e) => warn!(error = %e, "Job task ended abnormally"),
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(grace_ms = grace.as_millis(), "Jobs did not stop in time, aborting");
            self.tasks.abort_all();
        }
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn drive(job: Arc<dyn Job>, cancel: CancellationToken) -> &'static str {
    let name = job.name();
    let period = job.period().max(MIN_PERIOD);
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticks.tick() => {
                let started = std::time::Instant::now();
                let result = job.run().await;
                telemetry::record_job_run(name, result.is_ok());
                match result {
                    Ok(()) => debug!(job = name, elapsed_ms = started.elapsed().as_millis(), "Job ran"),
                    Err(e) => error!(job = name, error = %e, "Job failed"),
                }
            }
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        runs: Arc<AtomicUsize>,
        period: Duration,
        fails: bool,
    }

    #[async_trait::async_trait]
    impl Job for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn period(&self) -> Duration {
            self.period
        }

        async fn run(&self) -> Result<(), ConsoleError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fails {
                return Err(ConsoleError::Network("offline".into()));
            }
            Ok(())
        }
    }

    fn counting(period_secs: u64, fails: bool) -> (Counting, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let job = Counting {
            runs: Arc::clone(&runs),
            period: Duration::from_secs(period_secs),
            fails,
        };
        (job, runs)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_run_waits_one_period() {
        let mut scheduler = JobScheduler::new();
        let (job, runs) = counting(10, false);
        scheduler.spawn(job);
        assert_eq!(scheduler.len(), 1);

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        scheduler.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_the_job() {
        let mut scheduler = JobScheduler::new();
        let (job, runs) = counting(1, true);
        scheduler.spawn(job);

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        scheduler.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_runs() {
        let mut scheduler = JobScheduler::new();
        let (job, runs) = counting(1, false);
        scheduler.spawn(job);

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        scheduler.stop(Duration::from_secs(1)).await;
        let after = runs.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(runs.load(Ordering::SeqCst), after);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_reaches_child_jobs() {
        let parent = CancellationToken::new();
        let mut scheduler = JobScheduler::child_of(&parent);
        let (job, runs) = counting(1, false);
        scheduler.spawn(job);

        parent.cancel();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        scheduler.stop(Duration::from_secs(1)).await;
        assert!(parent.is_cancelled());
    }
}
