//! Check-in request/response models.

use serde::{Deserialize, Serialize};

use super::guest::Guest;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub qr_id: String,
}

/// Successful check-in reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInReply {
    #[serde(default)]
    pub guest: Option<Guest>,
    #[serde(default)]
    pub already_checked_in: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl CheckInReply {
    /// The guest, only when the backend resolved one.
    pub fn resolved_guest(&self) -> Option<&Guest> {
        self.guest.as_ref().filter(|g| g.is_resolved())
    }
}
