//! Event administration: feature switches, capacity and volunteer settings,
//! bulk resets and mail dispatch.

use std::sync::Arc;

use domain::models::{
    BulkMailRequest, FeatureFlag, GuestMailRequest, GuestTypeSettings, GuestTypeSettingsEnvelope,
    MailMessage, MailResponse, Volunteer, VolunteerSettings,
};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{info, warn};
use validator::Validate;

use crate::backend::{Auth, HttpBackend};
use crate::error::ConsoleError;

fn status_path(flag: FeatureFlag) -> &'static str {
    match flag {
        FeatureFlag::Rsvp => "/api/public/rsvp-status",
        FeatureFlag::Telegram => "/api/admin/telegram-status",
        FeatureFlag::VolunteerSystem => "/api/admin/volunteer-system-status",
    }
}

fn toggle_path(flag: FeatureFlag) -> &'static str {
    match flag {
        FeatureFlag::Rsvp => "/api/public/admin/toggle-rsvp",
        FeatureFlag::Telegram => "/api/admin/toggle-telegram",
        FeatureFlag::VolunteerSystem => "/api/admin/toggle-volunteer-system",
    }
}

/// Reads a flag out of a status or toggle reply; absent means off.
pub fn flag_value(flag: FeatureFlag, reply: &Value) -> bool {
    reply
        .get(flag.wire_field())
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

pub struct EventAdmin {
    backend: Arc<HttpBackend>,
}

impl EventAdmin {
    pub fn new(backend: Arc<HttpBackend>) -> Self {
        Self { backend }
    }

    pub async fn flag(&self, flag: FeatureFlag) -> Result<bool, ConsoleError> {
        let reply: Value = self
            .backend
            .get_json("admin.flag_status", status_path(flag), &[], Auth::Operator)
            .await?;
        Ok(flag_value(flag, &reply))
    }

    /// Flips a feature switch and returns its new state.
    pub async fn toggle(&self, flag: FeatureFlag) -> Result<bool, ConsoleError> {
        let reply: Value = self
            .backend
            .send_json(
                Method::POST,
                "admin.flag_toggle",
                toggle_path(flag),
                &json!({}),
                Auth::Operator,
            )
            .await?;
        let enabled = flag_value(flag, &reply);
        info!(flag = flag.label(), enabled, "Feature switch toggled");
        Ok(enabled)
    }

    pub async fn guest_type_settings(&self) -> Result<GuestTypeSettings, ConsoleError> {
        let envelope: GuestTypeSettingsEnvelope = self
            .backend
            .get_json(
                "admin.guest_type_settings",
                "/api/admin/guest-type-settings",
                &[],
                Auth::Operator,
            )
            .await?;
        Ok(envelope.settings)
    }

    pub async fn save_guest_type_settings(
        &self,
        settings: GuestTypeSettings,
    ) -> Result<(), ConsoleError> {
        let _: Value = self
            .backend
            .send_json(
                Method::POST,
                "admin.guest_type_settings",
                "/api/admin/guest-type-settings",
                &GuestTypeSettingsEnvelope { settings },
                Auth::Operator,
            )
            .await?;
        info!("Guest type settings saved");
        Ok(())
    }

    pub async fn volunteers(&self) -> Result<Vec<Volunteer>, ConsoleError> {
        let reply: VolunteerSettings = self
            .backend
            .get_json(
                "admin.volunteers",
                "/api/admin/volunteer-settings",
                &[],
                Auth::Operator,
            )
            .await?;
        Ok(reply.volunteers)
    }

    /// Saves the volunteer list; blank names are refused before sending.
    pub async fn save_volunteers(&self, settings: &VolunteerSettings) -> Result<(), ConsoleError> {
        let normalized = settings.normalized()?;
        let _: Value = self
            .backend
            .send_json(
                Method::POST,
                "admin.volunteers",
                "/api/admin/volunteer-settings",
                &normalized,
                Auth::Operator,
            )
            .await?;
        info!(count = normalized.volunteers.len(), "Volunteer settings saved");
        Ok(())
    }

    pub async fn reset_checkins(&self) -> Result<(), ConsoleError> {
        let _: Value = self
            .backend
            .send_json(
                Method::POST,
                "admin.reset_checkins",
                "/api/admin/participants/reset-checkins",
                &json!({}),
                Auth::Operator,
            )
            .await?;
        warn!("All check-ins reset");
        Ok(())
    }

    /// Resets check-ins first so no participant stays marked as arrived.
    pub async fn delete_participants(&self) -> Result<(), ConsoleError> {
        self.reset_checkins().await?;
        self.backend
            .send_empty(
                Method::DELETE,
                "admin.delete_participants",
                "/api/admin/participants",
                Auth::Operator,
            )
            .await?;
        warn!("All participants deleted");
        Ok(())
    }

    pub async fn reset_all(&self) -> Result<(), ConsoleError> {
        self.backend
            .send_empty(Method::DELETE, "admin.reset_all", "/api/admin/reset-all", Auth::Operator)
            .await?;
        warn!("Event data reset");
        Ok(())
    }

    pub async fn end_event(&self) -> Result<(), ConsoleError> {
        self.backend
            .send_empty(Method::DELETE, "admin.end_event", "/api/admin/event/end", Auth::Operator)
            .await?;
        warn!("Event ended");
        Ok(())
    }

    pub async fn send_mail(&self, message: &MailMessage) -> Result<MailResponse, ConsoleError> {
        message.validate()?;
        let reply: MailResponse = self
            .backend
            .send_json(Method::POST, "mail.send", "/api/admin/mail/send", message, Auth::Operator)
            .await?;
        log_mail(&reply, "send");
        Ok(reply)
    }

    pub async fn send_bulk_mail(
        &self,
        request: &BulkMailRequest,
    ) -> Result<MailResponse, ConsoleError> {
        let reply: MailResponse = self
            .backend
            .send_json(Method::POST, "mail.bulk", "/api/admin/mail/bulk", request, Auth::Operator)
            .await?;
        log_mail(&reply, "bulk");
        Ok(reply)
    }

    pub async fn send_mail_to_guests(
        &self,
        request: &GuestMailRequest,
    ) -> Result<MailResponse, ConsoleError> {
        if request.guest_ids.is_empty() {
            return Err(ConsoleError::Validation("selectGuests".to_string()));
        }
        request.validate()?;
        let reply: MailResponse = self
            .backend
            .send_json(
                Method::POST,
                "mail.send_to_guests",
                "/api/admin/mail/send-to-guests",
                request,
                Auth::Operator,
            )
            .await?;
        log_mail(&reply, "selected");
        Ok(reply)
    }
}

fn log_mail(reply: &MailResponse, kind: &'static str) {
    if reply.success {
        info!(
            kind,
            sent = reply.total_sent.unwrap_or(0),
            failed = reply.total_failed.unwrap_or(0),
            "Mail dispatched"
        );
    } else {
        warn!(
            kind,
            message = reply.message.as_deref().unwrap_or_default(),
            "Mail dispatch refused"
        );
    }
}
