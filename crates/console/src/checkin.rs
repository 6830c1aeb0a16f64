//! Check-in orchestration: one backend call, one classification, one cue.

use std::sync::Arc;

use async_trait::async_trait;
use domain::models::{CheckInReply, Guest};
use domain::services::{is_message_for, messages, Locale};
use tracing::{info, warn};

use crate::error::ConsoleError;
use crate::feedback::{Cue, Feedback};
use crate::scanner::RearmHandle;
use crate::telemetry;

const ALREADY_CHECKED_IN: &str = "alreadyCheckedIn";

#[async_trait]
pub trait CheckInApi: Send + Sync {
    async fn check_in(&self, qr_id: &str) -> Result<CheckInReply, ConsoleError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
    Accepted,
    AlreadyDone,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyIdentifier,
    NotFound,
    Backend,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted(Guest),
    AlreadyDone(Guest),
    Rejected { reason: RejectReason, message: String },
}

impl Outcome {
    pub fn cue(&self) -> Cue {
        match self {
            Outcome::Accepted(_) | Outcome::AlreadyDone(_) => Cue::Affirmative,
            Outcome::Rejected { .. } => Cue::Negative,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Outcome::Accepted(_) => Phase::Accepted,
            Outcome::AlreadyDone(_) => Phase::AlreadyDone,
            Outcome::Rejected { .. } => Phase::Rejected,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Accepted(_) => "accepted",
            Outcome::AlreadyDone(_) => "already_done",
            Outcome::Rejected {
                reason: RejectReason::EmptyIdentifier,
                ..
            } => "rejected_empty",
            Outcome::Rejected {
                reason: RejectReason::NotFound,
                ..
            } => "rejected_not_found",
            Outcome::Rejected { .. } => "rejected",
        }
    }

    pub fn guest(&self) -> Option<&Guest> {
        match self {
            Outcome::Accepted(guest) | Outcome::AlreadyDone(guest) => Some(guest),
            Outcome::Rejected { .. } => None,
        }
    }
}

/// Guest detail opened after a successful scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    pub guest: Guest,
    pub already_checked_in: bool,
}

pub struct CheckInOrchestrator {
    api: Arc<dyn CheckInApi>,
    feedback: Arc<dyn Feedback>,
    locale: Locale,
    phase: Phase,
    detail: Option<Detail>,
    error: Option<String>,
    rearm: Option<RearmHandle>,
}

impl CheckInOrchestrator {
    pub fn new(api: Arc<dyn CheckInApi>, feedback: Arc<dyn Feedback>, locale: Locale) -> Self {
        Self {
            api,
            feedback,
            locale,
            phase: Phase::Idle,
            detail: None,
            error: None,
            rearm: None,
        }
    }

    /// Resets the scanner's dedup key whenever the detail closes.
    pub fn attach_scanner(&mut self, rearm: RearmHandle) {
        self.rearm = Some(rearm);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn detail(&self) -> Option<&Detail> {
        self.detail.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn check_in(&mut self, identifier: &str) -> Outcome {
        let qr_id = identifier.trim();

        let outcome = if qr_id.is_empty() {
            Outcome::Rejected {
                reason: RejectReason::EmptyIdentifier,
                message: messages::text(self.locale, "qrIdEmpty"),
            }
        } else {
            self.phase = Phase::Submitting;
            self.detail = None;
            self.error = None;
            let result = self.api.check_in(qr_id).await;
            self.classify(result)
        };

        self.apply(&outcome);
        outcome
    }

    /// Manual check-in from the registry list.
    pub async fn check_in_guest(&mut self, guest: &Guest) -> Outcome {
        self.check_in(&guest.qr_id).await
    }

    pub fn close_detail(&mut self) {
        self.phase = Phase::Idle;
        self.detail = None;
        self.error = None;
        if let Some(rearm) = &self.rearm {
            rearm.reset();
        }
    }

    /// A frame held a code that could not be read: negative cue and the
    /// localized read error, without touching the backend or the detail.
    pub fn report_unreadable(&mut self) -> String {
        let message = messages::text(self.locale, "qrCodeReadError");
        self.error = Some(message.clone());
        self.feedback.play(Cue::Negative);
        telemetry::record_checkin_outcome("unreadable");
        message
    }

    fn classify(&self, result: Result<CheckInReply, ConsoleError>) -> Outcome {
        let err = match result {
            Ok(reply) => {
                return match reply.resolved_guest() {
                    Some(guest) if reply.already_checked_in => Outcome::AlreadyDone(guest.clone()),
                    Some(guest) => Outcome::Accepted(guest.clone()),
                    None => Outcome::Rejected {
                        reason: RejectReason::NotFound,
                        message: format!(
                            "{}: {}",
                            messages::text(self.locale, "error"),
                            messages::text(self.locale, "guestNotFound")
                        ),
                    },
                };
            }
            Err(err) => err,
        };

        if let Some(body) = err.body() {
            let already = body
                .message
                .as_deref()
                .is_some_and(|m| is_message_for(m, ALREADY_CHECKED_IN))
                || body.message_key.as_deref() == Some(ALREADY_CHECKED_IN);
            if already {
                if let Some(guest) = body.guest.as_ref().filter(|g| g.is_resolved()) {
                    return Outcome::AlreadyDone(guest.clone());
                }
            }
        }

        let reason = match err {
            ConsoleError::NotFound(_) => RejectReason::NotFound,
            _ => RejectReason::Backend,
        };
        let message = err
            .body()
            .and_then(|b| b.localized(self.locale))
            .unwrap_or_else(|| match err {
                ConsoleError::Network(_) => messages::text(self.locale, "networkError"),
                ConsoleError::Unauthorized(_) => messages::text(self.locale, "session_expired"),
                _ => messages::text(self.locale, "guestNotFound"),
            });

        warn!(error = %err, "Check-in rejected");
        Outcome::Rejected { reason, message }
    }

    fn apply(&mut self, outcome: &Outcome) {
        self.phase = outcome.phase();
        self.detail = None;
        self.error = match outcome {
            Outcome::Rejected { message, .. } => Some(message.clone()),
            _ => None,
        };

        self.feedback.play(outcome.cue());
        telemetry::record_checkin_outcome(outcome.label());

        if let Some(guest) = outcome.guest() {
            self.detail = Some(Detail {
                guest: guest.clone(),
                already_checked_in: matches!(outcome, Outcome::AlreadyDone(_)),
            });
        }

        info!(
            outcome = outcome.label(),
            qr_id = outcome.guest().map(|g| g.qr_id.as_str()).unwrap_or_default(),
            "Check-in classified"
        );
    }
}
