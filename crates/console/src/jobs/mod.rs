//! Background timers bound to the operator session.

mod scheduler;
mod session_timers;

pub use scheduler::{Job, JobScheduler};
pub use session_timers::{SessionCountdownJob, SessionTimers, TokenRefreshJob};
