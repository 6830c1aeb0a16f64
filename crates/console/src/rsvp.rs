//! Public RSVP flow: guest lookup, attend/decline and plus-one self-registration.
//!
//! Every call here is unauthenticated; a 401 from these endpoints never
//! touches the operator session.

use std::sync::Arc;

use domain::models::{EventInformation, Guest, PlusOneForm};
use domain::services::shows_plus_one_form;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

use crate::backend::{Auth, HttpBackend};
use crate::error::ConsoleError;

#[derive(Debug, Deserialize)]
struct RsvpStatus {
    #[serde(rename = "rsvpEnabled", default)]
    rsvp_enabled: bool,
}

#[derive(Debug, Deserialize)]
struct AddGuestReply {
    guest: Guest,
}

/// What the guest sees after answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsvpStep {
    Declined,
    /// Attending and may still register plus-ones
    PlusOneForm,
    Confirmed,
}

pub fn next_step(guest: &Guest, rsvp_enabled: bool) -> RsvpStep {
    match guest.will_attend {
        Some(false) => RsvpStep::Declined,
        _ if shows_plus_one_form(guest, rsvp_enabled) => RsvpStep::PlusOneForm,
        _ => RsvpStep::Confirmed,
    }
}

pub struct RsvpPortal {
    backend: Arc<HttpBackend>,
}

impl RsvpPortal {
    pub fn new(backend: Arc<HttpBackend>) -> Self {
        Self { backend }
    }

    pub async fn guest(&self, qr_id: &str) -> Result<Guest, ConsoleError> {
        let qr_id = non_empty(qr_id)?;
        self.backend
            .get_json(
                "public.guest",
                &format!("/api/public/guest/{}", qr_id),
                &[],
                Auth::Anonymous,
            )
            .await
    }

    pub async fn rsvp_enabled(&self) -> Result<bool, ConsoleError> {
        let status: RsvpStatus = self
            .backend
            .get_json("public.rsvp_status", "/api/public/rsvp-status", &[], Auth::Anonymous)
            .await?;
        Ok(status.rsvp_enabled)
    }

    pub async fn event_information(&self) -> Result<EventInformation, ConsoleError> {
        self.backend
            .get_json(
                "public.event_information",
                "/api/public/event-information",
                &[],
                Auth::Anonymous,
            )
            .await
    }

    /// Records the answer and returns the guest as it now stands.
    pub async fn respond(&self, guest: &Guest, will_attend: bool) -> Result<Guest, ConsoleError> {
        let qr_id = non_empty(&guest.qr_id)?;
        let _: Value = self
            .backend
            .send_json(
                Method::POST,
                "public.rsvp",
                &format!("/api/public/rsvp/{}", qr_id),
                &json!({ "willAttend": will_attend }),
                Auth::Anonymous,
            )
            .await?;

        info!(qr_id, will_attend, "RSVP recorded");
        let mut updated = guest.clone();
        updated.will_attend = Some(will_attend);
        updated.responded = true;
        if !will_attend {
            updated.guests.clear();
        }
        Ok(updated)
    }

    /// Registers a plus-one for an attending inviter with capacity left.
    pub async fn add_guest(
        &self,
        inviter: &Guest,
        rsvp_enabled: bool,
        form: PlusOneForm,
    ) -> Result<Guest, ConsoleError> {
        if !rsvp_enabled {
            return Err(ConsoleError::Validation("rsvpDisabled".to_string()));
        }
        if !shows_plus_one_form(inviter, rsvp_enabled) {
            return Err(ConsoleError::Validation("plusOneLimitReached".to_string()));
        }
        form.validate()?;

        let qr_id = non_empty(&inviter.qr_id)?;
        let reply: AddGuestReply = self
            .backend
            .send_json(
                Method::POST,
                "public.add_guest",
                &format!("/api/public/add-guest/{}", qr_id),
                &form,
                Auth::Anonymous,
            )
            .await?;

        let mut updated = inviter.clone();
        updated.guests.push(reply.guest);
        info!(qr_id, count = updated.guests.len(), "Plus-one registered");
        Ok(updated)
    }
}

fn non_empty(qr_id: &str) -> Result<&str, ConsoleError> {
    let qr_id = qr_id.trim();
    if qr_id.is_empty() {
        return Err(ConsoleError::Validation("qrIdEmpty".to_string()));
    }
    Ok(qr_id)
}
