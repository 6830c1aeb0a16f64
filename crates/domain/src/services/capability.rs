//! Client-side routes and the role gate in front of them.

use std::fmt;

use crate::models::role::Role;

const CHECK_IN_ROLES: &[Role] = &[Role::Admin, Role::Editor, Role::CheckInEditor];
const PARTICIPANT_ROLES: &[Role] = &[Role::Admin, Role::Editor, Role::ParticipantEditor];
const USER_ROLES: &[Role] = &[Role::Admin, Role::UserEditor];
const SETTINGS_ROLES: &[Role] = &[Role::Admin, Role::Editor, Role::GuestEditor];
const ADMIN_ROLES: &[Role] = &[Role::Admin];

/// Known console route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    CheckIn,
    ManualCheckIn,
    Participants,
    Users,
    Settings,
    AdminSettings,
    Invitation(String),
    Rsvp(String),
    Confirmation,
    NotFound,
}

/// Who may reach a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Guests reach it without a session
    Public,
    /// Reachable with or without a session (login, not-found)
    Open,
    /// Needs a session holding at least one of these roles
    Roles(&'static [Role]),
}

/// Navbar order.
const MENU: [Route; 6] = [
    Route::CheckIn,
    Route::ManualCheckIn,
    Route::Participants,
    Route::Settings,
    Route::Users,
    Route::AdminSettings,
];

impl Route {
    /// Parses a path; `None` for anything that is not a console route.
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed
            .split('/')
            .skip(1)
            .filter(|s| !s.is_empty())
            .collect();

        if !path.starts_with('/') {
            return None;
        }

        match segments.as_slice() {
            [] => Some(Route::Home),
            ["login"] => Some(Route::Login),
            ["checkin"] => Some(Route::CheckIn),
            ["manual-checkin"] => Some(Route::ManualCheckIn),
            ["participants"] => Some(Route::Participants),
            ["users"] => Some(Route::Users),
            ["settings"] => Some(Route::Settings),
            ["admin-settings"] => Some(Route::AdminSettings),
            ["confirmation"] => Some(Route::Confirmation),
            ["not-found"] => Some(Route::NotFound),
            ["invitation", qr_id] => Some(Route::Invitation((*qr_id).to_string())),
            ["rsvp", qr_id] => Some(Route::Rsvp((*qr_id).to_string())),
            _ => None,
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Home | Route::Invitation(_) | Route::Rsvp(_) | Route::Confirmation => {
                Access::Public
            }
            Route::Login | Route::NotFound => Access::Open,
            Route::CheckIn | Route::ManualCheckIn => Access::Roles(CHECK_IN_ROLES),
            Route::Participants => Access::Roles(PARTICIPANT_ROLES),
            Route::Users => Access::Roles(USER_ROLES),
            Route::Settings => Access::Roles(SETTINGS_ROLES),
            Route::AdminSettings => Access::Roles(ADMIN_ROLES),
        }
    }

    /// Roles any of which grants access; empty for routes without a gate.
    pub fn required_roles(&self) -> &'static [Role] {
        match self.access() {
            Access::Roles(roles) => roles,
            Access::Public | Access::Open => &[],
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self.access(), Access::Public)
    }

    pub fn needs_session(&self) -> bool {
        matches!(self.access(), Access::Roles(_))
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::CheckIn => "/checkin".to_string(),
            Route::ManualCheckIn => "/manual-checkin".to_string(),
            Route::Participants => "/participants".to_string(),
            Route::Users => "/users".to_string(),
            Route::Settings => "/settings".to_string(),
            Route::AdminSettings => "/admin-settings".to_string(),
            Route::Invitation(qr) => format!("/invitation/{}", qr),
            Route::Rsvp(qr) => format!("/rsvp/{}", qr),
            Route::Confirmation => "/confirmation".to_string(),
            Route::NotFound => "/not-found".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// True when the held roles intersect the required set.
pub fn may_render(held: &[Role], required: &[Role]) -> bool {
    held.iter().any(|role| required.contains(role))
}

/// Menu entries the held roles may open, in navbar order.
pub fn accessible_menu(held: &[Role]) -> Vec<Route> {
    MENU.iter()
        .filter(|route| may_render(held, route.required_roles()))
        .cloned()
        .collect()
}
