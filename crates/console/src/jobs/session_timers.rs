//! Refresh and idle-countdown timers bound to the session lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::scheduler::{Job, JobScheduler};
use crate::error::ConsoleError;
use crate::session::{SessionApi, SessionGuard, SessionState};

const JOB_STOP_GRACE: Duration = Duration::from_secs(2);

/// Refreshes the token once it is close to expiry.
pub struct TokenRefreshJob {
    guard: Arc<SessionGuard>,
    api: Arc<dyn SessionApi>,
}

impl TokenRefreshJob {
    pub fn new(guard: Arc<SessionGuard>, api: Arc<dyn SessionApi>) -> Self {
        Self { guard, api }
    }
}

#[async_trait::async_trait]
impl Job for TokenRefreshJob {
    fn name(&self) -> &'static str {
        "token_refresh"
    }

    fn period(&self) -> Duration {
        Duration::from_secs(self.guard.config().refresh_interval_secs)
    }

    async fn run(&self) -> Result<(), ConsoleError> {
        self.guard.refresh(self.api.as_ref()).await.map(|_| ())
    }
}

/// Ends the session once the idle deadline passes.
pub struct SessionCountdownJob {
    guard: Arc<SessionGuard>,
}

impl SessionCountdownJob {
    pub fn new(guard: Arc<SessionGuard>) -> Self {
        Self { guard }
    }
}

#[async_trait::async_trait]
impl Job for SessionCountdownJob {
    fn name(&self) -> &'static str {
        "session_countdown"
    }

    fn period(&self) -> Duration {
        Duration::from_secs(self.guard.config().countdown_tick_secs)
    }

    async fn run(&self) -> Result<(), ConsoleError> {
        if let Some(left) = self.guard.tick_countdown() {
            debug!(seconds_left = left, "Session countdown");
        }
        Ok(())
    }
}

/// Supervisor that runs the session jobs while a session is active.
///
/// A fresh scheduler is started whenever the guard publishes an active
/// session and stopped as soon as the session ends.
pub struct SessionTimers {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SessionTimers {
    pub fn spawn(guard: Arc<SessionGuard>, api: Arc<dyn SessionApi>) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let mut state_rx = guard.subscribe();

        let handle = tokio::spawn(async move {
            let mut running: Option<JobScheduler> = None;

            loop {
                let active = matches!(*state_rx.borrow_and_update(), SessionState::Active(_));

                if active && running.is_none() {
                    let mut scheduler = JobScheduler::child_of(&token);
                    scheduler.spawn(TokenRefreshJob::new(Arc::clone(&guard), Arc::clone(&api)));
                    scheduler.spawn(SessionCountdownJob::new(Arc::clone(&guard)));
                    info!("Session timers started");
                    running = Some(scheduler);
                } else if !active {
                    if let Some(scheduler) = running.take() {
                        scheduler.stop(JOB_STOP_GRACE).await;
                        info!("Session timers stopped");
                    }
                }

                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = state_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }

            if let Some(scheduler) = running.take() {
                scheduler.stop(JOB_STOP_GRACE).await;
            }
        });

        Self { cancel, handle }
    }

    /// Stops the timers and waits for their tasks to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Session timer supervisor ended abnormally");
        }
    }
}
