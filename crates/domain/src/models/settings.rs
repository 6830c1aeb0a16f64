//! Event-level settings: plus-one capacity per guest type and volunteers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::guest::GuestType;

/// Maximum plus-ones per guest type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestTypeSettings(BTreeMap<GuestType, u32>);

impl Default for GuestTypeSettings {
    fn default() -> Self {
        let mut map = BTreeMap::new();
        map.insert(GuestType::Regular, 0);
        map.insert(GuestType::Vip, 5);
        map.insert(GuestType::Employee, 5);
        map.insert(GuestType::Plusone, 0);
        Self(map)
    }
}

impl GuestTypeSettings {
    /// Capacity for a type; types the backend omitted allow none.
    pub fn capacity(&self, guest_type: GuestType) -> u32 {
        self.0.get(&guest_type).copied().unwrap_or(0)
    }

    pub fn set_capacity(&mut self, guest_type: GuestType, max: u32) {
        self.0.insert(guest_type, max);
    }

    pub fn iter(&self) -> impl Iterator<Item = (GuestType, u32)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

/// Envelope used by the guest-type settings endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuestTypeSettingsEnvelope {
    #[serde(default)]
    pub settings: GuestTypeSettings,
}

/// Named volunteer slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Volunteer {
    #[serde(rename = "_id", alias = "id", default, skip_serializing)]
    pub id: Option<String>,
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub name: String,
}

impl Volunteer {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolunteerSettings {
    #[serde(default)]
    pub volunteers: Vec<Volunteer>,
}

impl VolunteerSettings {
    /// Every volunteer needs a non-blank name; names are sent trimmed.
    pub fn normalized(&self) -> Result<Self, validator::ValidationErrors> {
        let mut volunteers = Vec::with_capacity(self.volunteers.len());
        for volunteer in &self.volunteers {
            volunteer.validate()?;
            volunteers.push(Volunteer::named(volunteer.name.trim()));
        }
        Ok(Self { volunteers })
    }
}

/// Server-side feature switches exposed in the admin view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureFlag {
    Rsvp,
    Telegram,
    VolunteerSystem,
}

impl FeatureFlag {
    pub const ALL: [FeatureFlag; 3] = [
        FeatureFlag::Rsvp,
        FeatureFlag::Telegram,
        FeatureFlag::VolunteerSystem,
    ];

    /// Field name carrying the flag in status and toggle replies.
    pub fn wire_field(&self) -> &'static str {
        match self {
            FeatureFlag::Rsvp => "rsvpEnabled",
            FeatureFlag::Telegram => "telegramEnabled",
            FeatureFlag::VolunteerSystem => "volunteerSystemEnabled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeatureFlag::Rsvp => "rsvp",
            FeatureFlag::Telegram => "telegram",
            FeatureFlag::VolunteerSystem => "volunteer-system",
        }
    }
}

impl std::str::FromStr for FeatureFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rsvp" => Ok(FeatureFlag::Rsvp),
            "telegram" => Ok(FeatureFlag::Telegram),
            "volunteer-system" | "volunteers" | "volunteer" => Ok(FeatureFlag::VolunteerSystem),
            _ => Err(format!("Unknown feature: {}", s)),
        }
    }
}
