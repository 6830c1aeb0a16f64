//! Mail dispatch models.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::event::EventInformation;
use super::guest::GuestType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTemplate {
    #[default]
    Invitation,
    Reminder,
    Custom,
}

impl std::str::FromStr for MailTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "invitation" => Ok(MailTemplate::Invitation),
            "reminder" => Ok(MailTemplate::Reminder),
            "custom" => Ok(MailTemplate::Custom),
            _ => Err(format!("Unknown mail template: {}", s)),
        }
    }
}

/// Single free-form message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MailMessage {
    #[validate(email(message = "Invalid email format"))]
    pub to: String,
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub subject: String,
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub message: String,
}

/// Audience selection for bulk mail; `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailFilters {
    #[serde(default, with = "guest_type_or_all")]
    pub guest_type: Option<GuestType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub will_attend: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded: Option<bool>,
}

mod guest_type_or_all {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::GuestType;

    pub fn serialize<S: Serializer>(value: &Option<GuestType>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => s.serialize_str(t.as_str()),
            None => s.serialize_str("ALL"),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<GuestType>, D::Error> {
        let raw = String::deserialize(d)?;
        if raw.eq_ignore_ascii_case("all") {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(serde::de::Error::custom)
    }
}

/// Event facts interpolated into templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailCustomData {
    pub event_date: String,
    pub event_time: String,
    pub event_location: String,
}

impl From<&EventInformation> for MailCustomData {
    fn from(info: &EventInformation) -> Self {
        Self {
            event_date: info.event_date.clone(),
            event_time: info.event_time.clone(),
            event_location: info.event_location.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkMailRequest {
    pub template_type: MailTemplate,
    pub custom_data: MailCustomData,
    pub filters: MailFilters,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GuestMailRequest {
    #[validate(length(min = 1, message = "Select at least one guest"))]
    pub guest_ids: Vec<String>,
    pub template_type: MailTemplate,
    pub custom_data: MailCustomData,
}

/// Dispatch result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub total_sent: Option<u32>,
    #[serde(default)]
    pub total_failed: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters_serialize_as_all() {
        let json = serde_json::to_value(MailFilters::default()).unwrap();
        assert_eq!(json, serde_json::json!({"guestType": "ALL"}));
    }

    #[test]
    fn test_filters_roundtrip_specific_type() {
        let filters: MailFilters =
            serde_json::from_str(r#"{"guestType": "VIP", "willAttend": true}"#).unwrap();
        assert_eq!(filters.guest_type, Some(GuestType::Vip));
        assert_eq!(filters.will_attend, Some(true));
        assert_eq!(filters.responded, None);
    }

    #[test]
    fn test_guest_mail_requires_ids() {
        let request = GuestMailRequest {
            guest_ids: vec![],
            template_type: MailTemplate::Reminder,
            custom_data: MailCustomData::default(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_mail_message_validation() {
        let message = MailMessage {
            to: "guest@example.com".into(),
            subject: "Hello".into(),
            message: "See you".into(),
        };
        assert!(message.validate().is_ok());

        let bad = MailMessage {
            to: "nope".into(),
            ..message
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_template_serde() {
        assert_eq!(
            serde_json::to_string(&MailTemplate::Invitation).unwrap(),
            "\"invitation\""
        );
        assert_eq!("Reminder".parse::<MailTemplate>().unwrap(), MailTemplate::Reminder);
    }
}
