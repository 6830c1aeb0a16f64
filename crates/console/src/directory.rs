//! Guest registry: paginated listing, guest and plus-one maintenance.

use std::sync::Arc;

use domain::models::{
    Guest, GuestForm, GuestListResponse, GuestQuery, GuestType, GuestTypeSettings,
    InvitersResponse, PlusOneForm, PlusOnesResponse,
};
use domain::services::can_add_plus_one;
use futures::future::join_all;
use reqwest::Method;
use serde_json::{json, Value};
use shared::pagination::PageRequest;
use tracing::{info, warn};
use validator::Validate;

use crate::backend::{Auth, HttpBackend};
use crate::error::ConsoleError;

const GUESTS_PATH: &str = "/api/admin/guests";

/// Result of removing an inviter's plus-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlusOneRemoval {
    /// The linked PLUSONE record was deleted and the link cleared
    Deleted,
    /// Only the link was cleared; no record was found or deletion failed
    LinkCleared,
}

impl PlusOneRemoval {
    pub fn message_key(&self) -> &'static str {
        match self {
            PlusOneRemoval::Deleted => "removeInvitedSuccess",
            PlusOneRemoval::LinkCleared => "removeInvitedSuccessNoPlusOne",
        }
    }
}

/// Outcome of a bulk delete; failures do not stop the other deletions.
#[derive(Debug, Default)]
pub struct BulkDelete {
    pub deleted: Vec<String>,
    pub failed: Vec<(String, ConsoleError)>,
}

impl BulkDelete {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct GuestDirectory {
    backend: Arc<HttpBackend>,
}

impl GuestDirectory {
    pub fn new(backend: Arc<HttpBackend>) -> Self {
        Self { backend }
    }

    pub async fn list(
        &self,
        page: &PageRequest,
        query: &GuestQuery,
    ) -> Result<GuestListResponse, ConsoleError> {
        let mut params: Vec<(&str, String)> = page.query_pairs();
        params.extend(query.query_pairs());
        self.backend
            .get_json("guests.list", GUESTS_PATH, &params, Auth::Operator)
            .await
    }

    /// Every guest matching the query, bypassing pagination.
    pub async fn all(&self, query: &GuestQuery) -> Result<Vec<Guest>, ConsoleError> {
        let page = self.list(&PageRequest::all(), query).await?;
        Ok(page.guests)
    }

    /// Attending guests, as listed by the manual check-in and participant views.
    pub async fn participants(
        &self,
        page: &PageRequest,
        search: Option<String>,
    ) -> Result<GuestListResponse, ConsoleError> {
        let query = GuestQuery {
            search,
            attending: true,
        };
        self.list(page, &query).await
    }

    pub async fn create(&self, form: GuestForm) -> Result<(), ConsoleError> {
        form.validate()?;
        form.validate_inviter().map_err(ConsoleError::Validation)?;

        let _: Value = self
            .backend
            .send_json(Method::POST, "guests.create", GUESTS_PATH, &form, Auth::Operator)
            .await?;
        info!(email = %form.email, guest_type = %form.guest_type, "Guest created");
        Ok(())
    }

    pub async fn update(&self, id: &str, form: GuestForm) -> Result<(), ConsoleError> {
        form.validate()?;
        form.validate_inviter().map_err(ConsoleError::Validation)?;

        let _: Value = self
            .backend
            .send_json(
                Method::PUT,
                "guests.update",
                &guest_path(id),
                &form.into_payload(),
                Auth::Operator,
            )
            .await?;
        info!(guest_id = id, "Guest updated");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), ConsoleError> {
        self.backend
            .send_empty(Method::DELETE, "guests.delete", &guest_path(id), Auth::Operator)
            .await?;
        info!(guest_id = id, "Guest deleted");
        Ok(())
    }

    /// Deletes the selected guests concurrently.
    pub async fn delete_many(&self, ids: &[String]) -> BulkDelete {
        let results = join_all(ids.iter().map(|id| async move {
            let result = self.delete(id).await;
            (id.clone(), result)
        }))
        .await;

        let mut outcome = BulkDelete::default();
        for (id, result) in results {
            match result {
                Ok(()) => outcome.deleted.push(id),
                Err(e) => {
                    warn!(guest_id = %id, error = %e, "Bulk delete entry failed");
                    outcome.failed.push((id, e));
                }
            }
        }
        outcome
    }

    pub async fn toggle_attend(&self, id: &str) -> Result<(), ConsoleError> {
        let _: Value = self
            .backend
            .send_json(
                Method::PUT,
                "guests.toggle_attend",
                &format!("{}/toggle-attend", guest_path(id)),
                &json!({}),
                Auth::Operator,
            )
            .await?;
        Ok(())
    }

    /// EMPLOYEE and VIP guests matching the search, for the inviter picker.
    pub async fn inviters(&self, search: &str) -> Result<Vec<Guest>, ConsoleError> {
        let reply: InvitersResponse = self
            .backend
            .get_json(
                "guests.inviters",
                "/api/admin/guests/employee-vip",
                &[("search", search.trim().to_string())],
                Auth::Operator,
            )
            .await?;
        Ok(reply.inviters)
    }

    /// Deletes the inviter's linked PLUSONE record, then clears the link.
    ///
    /// Failing to find or delete the record does not stop the link from
    /// being cleared; failing to clear the link is an error.
    pub async fn remove_plus_one(&self, inviter: &Guest) -> Result<PlusOneRemoval, ConsoleError> {
        let inviter_id = require_id(inviter)?;
        let mut removal = PlusOneRemoval::LinkCleared;

        if let Some(qr_id) = inviter.linked_plus_one() {
            match self.all(&GuestQuery::default()).await {
                Ok(guests) => match find_linked_plus_one(&guests, qr_id).and_then(|g| g.id.clone()) {
                    Some(plus_one_id) => match self.delete(&plus_one_id).await {
                        Ok(()) => removal = PlusOneRemoval::Deleted,
                        Err(e) => warn!(qr_id, error = %e, "Plus-one deletion failed, clearing link"),
                    },
                    None => info!(qr_id, "Linked plus-one not found"),
                },
                Err(e) => warn!(qr_id, error = %e, "Plus-one lookup failed, clearing link"),
            }
        }

        let _: Value = self
            .backend
            .send_json(
                Method::PUT,
                "guests.update",
                &guest_path(inviter_id),
                &json!({ "plusOneQrId": "" }),
                Auth::Operator,
            )
            .await?;
        info!(guest_id = inviter_id, outcome = ?removal, "Plus-one link cleared");
        Ok(removal)
    }

    pub async fn plus_ones(&self, inviter: &Guest) -> Result<Vec<Guest>, ConsoleError> {
        let inviter_id = require_id(inviter)?;
        let reply: PlusOnesResponse = self
            .backend
            .get_json(
                "plusones.list",
                &plus_ones_path(inviter_id),
                &[],
                Auth::Operator,
            )
            .await?;
        Ok(reply.plus_ones)
    }

    /// Adds a plus-one unless the inviter's type capacity is used up.
    pub async fn add_plus_one(
        &self,
        inviter: &Guest,
        form: PlusOneForm,
        settings: &GuestTypeSettings,
    ) -> Result<(), ConsoleError> {
        form.validate()?;
        let inviter_id = require_id(inviter)?;

        let current = self.plus_ones(inviter).await?.len();
        if !can_add_plus_one(inviter, current, settings) {
            return Err(ConsoleError::Validation("plusOneLimitReached".to_string()));
        }

        let _: Value = self
            .backend
            .send_json(
                Method::POST,
                "plusones.create",
                &plus_ones_path(inviter_id),
                &form,
                Auth::Operator,
            )
            .await?;
        info!(guest_id = inviter_id, count = current + 1, "Plus-one added");
        Ok(())
    }

    pub async fn update_plus_one(
        &self,
        inviter: &Guest,
        qr_id: &str,
        form: PlusOneForm,
    ) -> Result<(), ConsoleError> {
        form.validate()?;
        let inviter_id = require_id(inviter)?;
        let _: Value = self
            .backend
            .send_json(
                Method::PUT,
                "plusones.update",
                &format!("{}/{}", plus_ones_path(inviter_id), qr_id),
                &form,
                Auth::Operator,
            )
            .await?;
        Ok(())
    }

    pub async fn delete_plus_one(&self, inviter: &Guest, qr_id: &str) -> Result<(), ConsoleError> {
        let inviter_id = require_id(inviter)?;
        self.backend
            .send_empty(
                Method::DELETE,
                "plusones.delete",
                &format!("{}/{}", plus_ones_path(inviter_id), qr_id),
                Auth::Operator,
            )
            .await
    }
}

fn guest_path(id: &str) -> String {
    format!("{}/{}", GUESTS_PATH, id)
}

fn plus_ones_path(inviter_id: &str) -> String {
    format!("{}/plusones", guest_path(inviter_id))
}

fn require_id(guest: &Guest) -> Result<&str, ConsoleError> {
    guest
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ConsoleError::Validation("guestNotFound".to_string()))
}

/// The PLUSONE record carrying the given qrId.
pub fn find_linked_plus_one<'a>(guests: &'a [Guest], qr_id: &str) -> Option<&'a Guest> {
    guests
        .iter()
        .find(|g| g.guest_type == GuestType::Plusone && g.qr_id == qr_id && g.is_resolved())
}
