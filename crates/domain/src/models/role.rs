//! Operator roles carried in session tokens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role granted to an operator account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Editor,
    CheckInEditor,
    ParticipantEditor,
    UserEditor,
    GuestEditor,
}

impl Role {
    /// Every role, in the order the user form lists them.
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Editor,
        Role::UserEditor,
        Role::GuestEditor,
        Role::ParticipantEditor,
        Role::CheckInEditor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Editor => "Editor",
            Role::CheckInEditor => "CheckInEditor",
            Role::ParticipantEditor => "ParticipantEditor",
            Role::UserEditor => "UserEditor",
            Role::GuestEditor => "GuestEditor",
        }
    }

    /// Parses raw role names from a token; unknown names are skipped.
    pub fn parse_all<S: AsRef<str>>(raw: &[S]) -> Vec<Role> {
        let mut roles = Vec::with_capacity(raw.len());
        for name in raw {
            match name.as_ref().parse::<Role>() {
                Ok(role) => {
                    if !roles.contains(&role) {
                        roles.push(role);
                    }
                }
                Err(_) => {
                    tracing::warn!(role = %name.as_ref(), "Ignoring unknown role in session token");
                }
            }
        }
        roles
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "checkineditor" => Ok(Role::CheckInEditor),
            "participanteditor" => Ok(Role::ParticipantEditor),
            "usereditor" => Ok(Role::UserEditor),
            "guesteditor" => Ok(Role::GuestEditor),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
