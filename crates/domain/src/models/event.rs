//! Public event information shown on invitations.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInformation {
    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub event_date: String,
    #[serde(default)]
    pub event_time: String,
    #[serde(default)]
    pub event_location: String,
    #[serde(default)]
    pub event_address: String,
}
