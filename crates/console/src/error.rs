use domain::models::Guest;
use domain::services::{messages, Locale};
use serde::{Deserialize, Serialize};
use shared::jwt::JwtError;
use thiserror::Error;

/// Error body the backend attaches to non-2xx replies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub message_key: Option<String>,
    #[serde(default)]
    pub guest: Option<Guest>,
}

impl ErrorBody {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Localised text: the message key when the catalogue knows it, then the
    /// raw message.
    pub fn localized(&self, locale: Locale) -> Option<String> {
        self.message_key
            .as_deref()
            .and_then(|key| messages::translate(locale, key))
            .map(str::to_string)
            .or_else(|| self.message.clone().filter(|m| !m.trim().is_empty()))
    }
}

#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Local validation failure; carries a catalogue key or a message.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized(ErrorBody),

    #[error("Not found")]
    NotFound(ErrorBody),

    #[error("Server error ({status})")]
    Server { status: u16, body: ErrorBody },

    #[error("Network error: {0}")]
    Network(String),

    /// Any other 4xx the backend refused.
    #[error("Rejected by backend ({status})")]
    Rejected { status: u16, body: ErrorBody },

    #[error("Session error: {0}")]
    Session(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl ConsoleError {
    /// Backend error body, when the error came from the backend.
    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            ConsoleError::Unauthorized(body)
            | ConsoleError::NotFound(body)
            | ConsoleError::Server { body, .. }
            | ConsoleError::Rejected { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ConsoleError::Unauthorized(_) => Some(401),
            ConsoleError::NotFound(_) => Some(404),
            ConsoleError::Server { status, .. } | ConsoleError::Rejected { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Text shown to the operator.
    pub fn user_message(&self, locale: Locale) -> String {
        if let Some(text) = self.body().and_then(|b| b.localized(locale)) {
            return text;
        }
        match self {
            ConsoleError::Validation(key) => messages::text(locale, key),
            ConsoleError::Unauthorized(_) => messages::text(locale, "unauthorizedError"),
            ConsoleError::NotFound(_) => messages::text(locale, "guestNotFound"),
            ConsoleError::Server { .. } => messages::text(locale, "serverError"),
            ConsoleError::Network(_) => messages::text(locale, "networkError"),
            ConsoleError::Session(_) => messages::text(locale, "session_expired"),
            ConsoleError::Rejected { .. } | ConsoleError::Storage(_) | ConsoleError::Decode(_) => {
                messages::text(locale, "error")
            }
        }
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ConsoleError::Decode(err.to_string())
        } else {
            ConsoleError::Network(err.to_string())
        }
    }
}

impl From<validator::ValidationErrors> for ConsoleError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{}: {}", field, e.code))
                })
            })
            .collect();

        let message = if messages.len() == 1 {
            messages[0].clone()
        } else {
            format!("{} validation errors", messages.len())
        };

        ConsoleError::Validation(message)
    }
}

impl From<JwtError> for ConsoleError {
    fn from(err: JwtError) -> Self {
        ConsoleError::Session(err.to_string())
    }
}

impl From<std::io::Error> for ConsoleError {
    fn from(err: std::io::Error) -> Self {
        ConsoleError::Storage(err.to_string())
    }
}
