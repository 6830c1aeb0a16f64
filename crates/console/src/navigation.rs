//! Route resolution in front of every view.
//!
//! The gate decides before any view data is requested: a route the session
//! may not render never reaches [`ViewSource::load`].

use std::sync::Arc;

use domain::services::{accessible_menu, may_render, Access, Route};
use tracing::{debug, info};

use crate::error::ConsoleError;
use crate::session::{Session, SessionGuard};
use crate::views::{ViewData, ViewSource};

/// Gate decision for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Render(Route),
    /// Private route without a session; show the login screen
    LoginRequired { requested: Route },
    /// Session lacks every role the route accepts
    Unauthorized(Route),
    NotFound,
}

pub fn resolve(path: &str, session: Option<&Session>) -> Screen {
    let route = match Route::parse(path) {
        None | Some(Route::NotFound) => return Screen::NotFound,
        Some(route) => route,
    };

    match route.access() {
        Access::Public | Access::Open => Screen::Render(route),
        Access::Roles(required) => match session {
            None => Screen::LoginRequired { requested: route },
            Some(session) if may_render(&session.roles, required) => Screen::Render(route),
            Some(_) => Screen::Unauthorized(route),
        },
    }
}

/// What a visit produced.
#[derive(Debug, Clone)]
pub enum Visit {
    Rendered { route: Route, data: ViewData },
    LoginRequired { requested: Route },
    Unauthorized(Route),
    NotFound,
}

pub struct Console {
    guard: Arc<SessionGuard>,
    views: Arc<dyn ViewSource>,
}

impl Console {
    pub fn new(guard: Arc<SessionGuard>, views: Arc<dyn ViewSource>) -> Self {
        Self { guard, views }
    }

    /// Navbar entries for the current session, in display order.
    pub fn menu(&self) -> Vec<Route> {
        accessible_menu(&self.guard.roles())
    }

    pub async fn visit(&self, path: &str) -> Result<Visit, ConsoleError> {
        let session = self.guard.current();
        if session.is_some() {
            self.guard.touch();
        }

        match resolve(path, session.as_ref()) {
            Screen::Render(route) => {
                debug!(route = %route, "Rendering route");
                let data = self.views.load(&route).await?;
                Ok(Visit::Rendered { route, data })
            }
            Screen::LoginRequired { requested } => {
                info!(route = %requested, "Login required");
                Ok(Visit::LoginRequired { requested })
            }
            Screen::Unauthorized(route) => {
                info!(route = %route, roles = ?self.guard.roles(), "Route refused for held roles");
                Ok(Visit::Unauthorized(route))
            }
            Screen::NotFound => {
                debug!(path, "Unknown route");
                Ok(Visit::NotFound)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::SessionConfig;
    use crate::session::test_support::mint_token;
    use crate::storage::MemoryTokenStore;
    use crate::session::RestoreOutcome;
    use async_trait::async_trait;
    use domain::models::Role;
    use std::sync::Mutex;

    const NOW: i64 = 1_700_000_000;

    #[derive(Default)]
    struct RecordingViews {
        loaded: Mutex<Vec<Route>>,
    }

    impl RecordingViews {
        fn loaded(&self) -> Vec<Route> {
            self.loaded.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ViewSource for RecordingViews {
        async fn load(&self, route: &Route) -> Result<ViewData, ConsoleError> {
            self.loaded.lock().unwrap().push(route.clone());
            Ok(match route {
                Route::Users => ViewData::Users(Vec::new()),
                Route::CheckIn => ViewData::CheckIn,
                _ => ViewData::NotFound,
            })
        }
    }

    fn session(roles: Vec<Role>) -> Session {
        Session {
            token: "t".to_string(),
            roles,
            expires_at: NOW + 3600,
        }
    }

    fn console_with_roles(roles: &[&str]) -> (Console, Arc<RecordingViews>) {
        let store = Arc::new(MemoryTokenStore::with_token(mint_token(NOW + 3600, roles)));
        let guard = Arc::new(SessionGuard::new(
            store,
            Arc::new(ManualClock::new(NOW)),
            SessionConfig::default(),
        ));
        assert!(matches!(guard.restore().unwrap(), RestoreOutcome::Restored(_)));
        let views = Arc::new(RecordingViews::default());
        (Console::new(guard, views.clone()), views)
    }

    #[test]
    fn test_resolve_unknown_path_is_not_found() {
        assert_eq!(resolve("/nope", None), Screen::NotFound);
        assert_eq!(resolve("/not-found", None), Screen::NotFound);
        assert_eq!(resolve("users", None), Screen::NotFound);
    }

    #[test]
    fn test_resolve_public_routes_without_session() {
        assert_eq!(resolve("/", None), Screen::Render(Route::Home));
        assert_eq!(
            resolve("/rsvp/QR-1", None),
            Screen::Render(Route::Rsvp("QR-1".to_string()))
        );
        assert_eq!(resolve("/login", None), Screen::Render(Route::Login));
    }

    #[test]
    fn test_resolve_private_route_without_session() {
        assert_eq!(
            resolve("/checkin", None),
            Screen::LoginRequired {
                requested: Route::CheckIn
            }
        );
    }

    #[test]
    fn test_resolve_role_gate() {
        let door = session(vec![Role::CheckInEditor]);
        assert_eq!(resolve("/checkin", Some(&door)), Screen::Render(Route::CheckIn));
        assert_eq!(resolve("/users", Some(&door)), Screen::Unauthorized(Route::Users));
        assert_eq!(
            resolve("/admin-settings", Some(&session(vec![Role::Editor]))),
            Screen::Unauthorized(Route::AdminSettings)
        );
        assert_eq!(
            resolve("/admin-settings", Some(&session(vec![Role::Admin]))),
            Screen::Render(Route::AdminSettings)
        );
    }

    #[tokio::test]
    async fn test_check_in_editor_never_loads_users() {
        let (console, views) = console_with_roles(&["CheckInEditor"]);

        let visit = console.visit("/users").await.unwrap();

        assert!(matches!(visit, Visit::Unauthorized(Route::Users)));
        assert!(views.loaded().is_empty());
    }

    #[tokio::test]
    async fn test_rendered_route_loads_view_data() {
        let (console, views) = console_with_roles(&["CheckInEditor"]);

        let visit = console.visit("/checkin").await.unwrap();

        assert!(matches!(
            visit,
            Visit::Rendered {
                route: Route::CheckIn,
                data: ViewData::CheckIn
            }
        ));
        assert_eq!(views.loaded(), vec![Route::CheckIn]);
    }

    #[tokio::test]
    async fn test_menu_follows_roles() {
        let (console, _) = console_with_roles(&["UserEditor"]);
        assert_eq!(console.menu(), vec![Route::Users]);
    }

    #[tokio::test]
    async fn test_visit_without_session_asks_for_login() {
        let guard = Arc::new(SessionGuard::new(
            Arc::new(MemoryTokenStore::new()),
            Arc::new(ManualClock::new(NOW)),
            SessionConfig::default(),
        ));
        let views = Arc::new(RecordingViews::default());
        let console = Console::new(guard, views.clone());

        let visit = console.visit("/participants").await.unwrap();

        assert!(matches!(
            visit,
            Visit::LoginRequired {
                requested: Route::Participants
            }
        ));
        assert!(views.loaded().is_empty());
    }
}
