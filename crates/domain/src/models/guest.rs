//! Guest domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Marker the backend stores when a guest has no linked plus-one.
pub const NO_PLUS_ONE: &str = "NA";

/// Guest category; drives plus-one capacity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum GuestType {
    #[default]
    Regular,
    Vip,
    Employee,
    Plusone,
}

impl GuestType {
    pub const ALL: [GuestType; 4] = [
        GuestType::Regular,
        GuestType::Vip,
        GuestType::Employee,
        GuestType::Plusone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GuestType::Regular => "REGULAR",
            GuestType::Vip => "VIP",
            GuestType::Employee => "EMPLOYEE",
            GuestType::Plusone => "PLUSONE",
        }
    }

    /// EMPLOYEE and VIP guests may bring plus-ones.
    pub fn is_inviter(&self) -> bool {
        matches!(self, GuestType::Employee | GuestType::Vip)
    }
}

impl FromStr for GuestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "REGULAR" => Ok(GuestType::Regular),
            "VIP" => Ok(GuestType::Vip),
            "EMPLOYEE" => Ok(GuestType::Employee),
            "PLUSONE" => Ok(GuestType::Plusone),
            _ => Err(format!("Unknown guest type: {}", s)),
        }
    }
}

impl fmt::Display for GuestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guest record as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    /// Backend identifier; present once the guest is resolved
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub qr_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub guest_type: GuestType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub will_attend: Option<bool>,
    #[serde(default)]
    pub responded: bool,
    #[serde(default)]
    pub is_checked_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plus_one_qr_id: Option<String>,
    #[serde(default)]
    pub guests: Vec<Guest>,
    /// Only present on the public projection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_guests: Option<u32>,
}

impl Guest {
    pub fn is_resolved(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Linked plus-one identifier, ignoring the `"NA"` marker and blanks.
    pub fn linked_plus_one(&self) -> Option<&str> {
        self.plus_one_qr_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty() && *id != NO_PLUS_ONE)
    }

    pub fn plus_one_count(&self) -> usize {
        self.guests.len()
    }
}

/// Create/update form for a guest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GuestForm {
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub first_name: String,

    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub guest_type: GuestType,

    /// Inviter `_id`, required for PLUSONE guests
    #[serde(default)]
    pub selected_inviter_id: Option<String>,
}

impl GuestForm {
    /// PLUSONE guests must name an inviter.
    pub fn validate_inviter(&self) -> Result<(), String> {
        let has_inviter = self
            .selected_inviter_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        if self.guest_type == GuestType::Plusone && !has_inviter {
            return Err("inviter_required".to_string());
        }
        Ok(())
    }

    /// Payload sent on update; the inviter is only meaningful for PLUSONE.
    pub fn into_payload(mut self) -> Self {
        if self.guest_type != GuestType::Plusone {
            self.selected_inviter_id = None;
        }
        self
    }
}

/// Form for a plus-one attached to an inviter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlusOneForm {
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub first_name: String,

    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Filters accepted by the guest list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestQuery {
    pub search: Option<String>,
    /// Only guests who answered "attending"
    pub attending: bool,
}

impl GuestQuery {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            attending: false,
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                pairs.push(("search", search.to_string()));
            }
        }
        if self.attending {
            pairs.push(("attending", "true".to_string()));
        }
        pairs
    }
}

/// Paginated guest list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestListResponse {
    #[serde(default)]
    pub guests: Vec<Guest>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl GuestListResponse {
    /// Total number of guests, falling back to the page length.
    pub fn total(&self) -> u64 {
        self.count.unwrap_or(self.guests.len() as u64)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvitersResponse {
    #[serde(default)]
    pub inviters: Vec<Guest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlusOnesResponse {
    #[serde(default)]
    pub plus_ones: Vec<Guest>,
}
