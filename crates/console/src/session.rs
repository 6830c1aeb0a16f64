//! Operator session: token persistence, proactive refresh and the idle
//! countdown.
//!
//! [`SessionGuard`] is the only component that mutates session state. Every
//! other part of the console reads a [`SessionState`] snapshot or subscribes
//! to changes through a `watch` channel.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use domain::models::Role;
use serde::{Deserialize, Serialize};
use shared::jwt::{decode_claims, decode_unexpired};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::ConsoleError;
use crate::storage::TokenStore;

/// Token and roles returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginReply {
    pub token: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Backend calls the guard needs.
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<LoginReply, ConsoleError>;

    async fn refresh(&self, token: &str) -> Result<LoginReply, ConsoleError>;
}

#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub roles: Vec<Role>,
    /// Token expiry, Unix seconds
    pub expires_at: i64,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("roles", &self.roles)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    Expired,
    Unauthorized,
    IdleTimeout,
    RefreshFailed,
    Manual,
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogoutReason::Expired => "expired",
            LogoutReason::Unauthorized => "unauthorized",
            LogoutReason::IdleTimeout => "idle_timeout",
            LogoutReason::RefreshFailed => "refresh_failed",
            LogoutReason::Manual => "manual",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Active(Session),
    LoggedOut { reason: LogoutReason },
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Active(session) => Some(session),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    NoToken,
    Restored(Session),
    /// Stored token was expired or unreadable and has been cleared
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    NoSession,
    NotDue { seconds_left: i64 },
    Refreshed(Session),
}

pub struct SessionGuard {
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    state: watch::Sender<SessionState>,
    /// Idle deadline, Unix seconds
    deadline: AtomicI64,
}

impl SessionGuard {
    pub fn new(store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(SessionState::Anonymous);
        Self {
            store,
            clock,
            config,
            state,
            deadline: AtomicI64::new(0),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn now(&self) -> i64 {
        self.clock.now_unix()
    }

    /// Picks up a token persisted by an earlier run. Never calls the backend.
    pub fn restore(&self) -> Result<RestoreOutcome, ConsoleError> {
        let Some(token) = self.store.load()? else {
            return Ok(RestoreOutcome::NoToken);
        };

        match decode_unexpired(&token, self.now()) {
            Ok(claims) => {
                let session = Session {
                    roles: Role::parse_all(&claims.roles),
                    expires_at: claims.exp,
                    token,
                };
                self.deadline.store(claims.exp, Ordering::SeqCst);
                self.state.send_replace(SessionState::Active(session.clone()));
                info!(roles = ?session.roles, "Session restored");
                Ok(RestoreOutcome::Restored(session))
            }
            Err(e) => {
                warn!(error = %e, "Stored token rejected, clearing");
                self.store.clear()?;
                self.state.send_replace(SessionState::LoggedOut {
                    reason: LogoutReason::Expired,
                });
                Ok(RestoreOutcome::Expired)
            }
        }
    }

    pub async fn login(
        &self,
        api: &dyn SessionApi,
        username: &str,
        password: &str,
    ) -> Result<Session, ConsoleError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ConsoleError::Validation("empty_fields".to_string()));
        }
        if self.is_reserved(username) {
            warn!(username, "Login refused for reserved username");
            return Err(ConsoleError::Validation("invalid_credentials".to_string()));
        }

        self.store.clear()?;

        let reply = api.login(username, password).await.map_err(|e| match e {
            ConsoleError::Unauthorized(_) => {
                ConsoleError::Validation("invalid_credentials".to_string())
            }
            other => other,
        })?;

        let session = self.session_from(reply)?;
        self.store.save(&session.token)?;
        self.deadline.store(session.expires_at, Ordering::SeqCst);
        self.state.send_replace(SessionState::Active(session.clone()));

        info!(username, roles = ?session.roles, "Operator logged in");
        Ok(session)
    }

    /// Exchanges the token for a fresh one when it is about to expire.
    ///
    /// The idle deadline is left alone; only operator activity moves it.
    pub async fn refresh(&self, api: &dyn SessionApi) -> Result<RefreshOutcome, ConsoleError> {
        let Some(current) = self.current() else {
            return Ok(RefreshOutcome::NoSession);
        };

        let seconds_left = current.expires_at - self.now();
        if seconds_left >= self.config.refresh_threshold_secs {
            debug!(seconds_left, "Token refresh not due");
            return Ok(RefreshOutcome::NotDue { seconds_left });
        }

        let refreshed = match api.refresh(&current.token).await {
            Ok(reply) => self.session_from(reply),
            Err(e) => Err(e),
        };

        match refreshed {
            Ok(session) => {
                self.store.save(&session.token)?;
                let replaced = self.state.send_if_modified(|state| {
                    if matches!(state, SessionState::Active(_)) {
                        *state = SessionState::Active(session.clone());
                        true
                    } else {
                        false
                    }
                });
                if !replaced {
                    // ended while the request was in flight
                    self.store.clear()?;
                    return Ok(RefreshOutcome::NoSession);
                }
                info!(expires_at = session.expires_at, "Token refreshed");
                Ok(RefreshOutcome::Refreshed(session))
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                self.teardown(LogoutReason::RefreshFailed);
                Err(e)
            }
        }
    }

    /// Records operator activity.
    pub fn touch(&self) {
        if self.is_active() {
            let deadline = self.now() + self.config.idle_timeout_secs;
            self.deadline.store(deadline, Ordering::SeqCst);
        }
    }

    /// One countdown step. Returns the seconds left, or `None` without a
    /// session; ends the session once the deadline is reached.
    pub fn tick_countdown(&self) -> Option<i64> {
        if !self.is_active() {
            return None;
        }
        let left = self.deadline.load(Ordering::SeqCst) - self.now();
        if left <= 0 {
            self.teardown(LogoutReason::IdleTimeout);
            return Some(0);
        }
        Some(left)
    }

    /// Time left before the idle deadline as `mm:ss`.
    pub fn remaining(&self) -> Option<String> {
        if !self.is_active() {
            return None;
        }
        let left = (self.deadline.load(Ordering::SeqCst) - self.now()).max(0);
        Some(format!("{:02}:{:02}", left / 60, left % 60))
    }

    /// Ends the session. Only the first call after a session became active
    /// has any effect; returns whether this call ended it.
    pub fn teardown(&self, reason: LogoutReason) -> bool {
        let ended = self.state.send_if_modified(|state| {
            if matches!(state, SessionState::Active(_)) {
                *state = SessionState::LoggedOut { reason };
                true
            } else {
                false
            }
        });

        if ended {
            if let Err(e) = self.store.clear() {
                warn!(error = %e, "Failed to clear stored token");
            }
            info!(reason = %reason, "Session ended");
        }
        ended
    }

    pub fn logout(&self) -> Result<(), ConsoleError> {
        if !self.teardown(LogoutReason::Manual) {
            self.store.clear()?;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    pub fn is_active(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Active(_))
    }

    pub fn bearer(&self) -> Option<String> {
        self.state.borrow().session().map(|s| s.token.clone())
    }

    pub fn roles(&self) -> Vec<Role> {
        self.state
            .borrow()
            .session()
            .map(|s| s.roles.clone())
            .unwrap_or_default()
    }

    fn is_reserved(&self, username: &str) -> bool {
        self.config
            .reserved_usernames
            .iter()
            .any(|r| r.trim().eq_ignore_ascii_case(username))
    }

    fn session_from(&self, reply: LoginReply) -> Result<Session, ConsoleError> {
        let claims = decode_claims(&reply.token)?;
        if claims.is_expired(self.now()) {
            return Err(ConsoleError::Session("backend issued an expired token".into()));
        }
        let mut roles = Role::parse_all(&claims.roles);
        if roles.is_empty() {
            roles = Role::parse_all(&reply.roles);
        }
        Ok(Session {
            token: reply.token,
            roles,
            expires_at: claims.exp,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::mint_token;
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ErrorBody;
    use crate::storage::MemoryTokenStore;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    const NOW: i64 = 1_700_000_000;

    #[derive(Default)]
    struct FakeApi {
        login_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
        login_reply: Mutex<Option<Result<LoginReply, u16>>>,
        refresh_reply: Mutex<Option<Result<LoginReply, u16>>>,
    }

    fn reply_or_error(slot: &Mutex<Option<Result<LoginReply, u16>>>) -> Result<LoginReply, ConsoleError> {
        match slot.lock().unwrap().clone() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(401)) | None => Err(ConsoleError::Unauthorized(ErrorBody::default())),
            Some(Err(status)) => Err(ConsoleError::Server {
                status,
                body: ErrorBody::default(),
            }),
        }
    }

    #[async_trait]
    impl SessionApi for FakeApi {
        async fn login(&self, _: &str, _: &str) -> Result<LoginReply, ConsoleError> {
            self.login_calls.fetch_add(1, Ordering::SeqCst);
            reply_or_error(&self.login_reply)
        }

        async fn refresh(&self, _: &str) -> Result<LoginReply, ConsoleError> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            reply_or_error(&self.refresh_reply)
        }
    }

    fn guard_with(store: Arc<MemoryTokenStore>, clock: &ManualClock) -> SessionGuard {
        SessionGuard::new(store, Arc::new(clock.clone()), SessionConfig::default())
    }

    fn reply(exp: i64, roles: &[&str]) -> LoginReply {
        LoginReply {
            token: mint_token(exp, roles),
            roles: vec![],
        }
    }

    #[test]
    fn test_restore_without_token() {
        let clock = ManualClock::new(NOW);
        let guard = guard_with(Arc::new(MemoryTokenStore::new()), &clock);
        assert_eq!(guard.restore().unwrap(), RestoreOutcome::NoToken);
        assert_eq!(guard.snapshot(), SessionState::Anonymous);
    }

    #[test]
    fn test_restore_expired_token_clears_store() {
        let clock = ManualClock::new(NOW);
        let store = Arc::new(MemoryTokenStore::with_token(mint_token(NOW - 1, &["Admin"])));
        let guard = guard_with(store.clone(), &clock);

        assert_eq!(guard.restore().unwrap(), RestoreOutcome::Expired);
        assert_eq!(store.load().unwrap(), None);
        assert!(!guard.is_active());
    }

    #[test]
    fn test_restore_garbage_token_clears_store() {
        let clock = ManualClock::new(NOW);
        let store = Arc::new(MemoryTokenStore::with_token("not-a-token"));
        let guard = guard_with(store.clone(), &clock);

        assert_eq!(guard.restore().unwrap(), RestoreOutcome::Expired);
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_restore_valid_token() {
        let clock = ManualClock::new(NOW);
        let store = Arc::new(MemoryTokenStore::with_token(mint_token(
            NOW + 600,
            &["CheckInEditor", "Bogus"],
        )));
        let guard = guard_with(store, &clock);

        match guard.restore().unwrap() {
            RestoreOutcome::Restored(session) => {
                assert_eq!(session.roles, vec![Role::CheckInEditor]);
                assert_eq!(session.expires_at, NOW + 600);
            }
            other => panic!("Expected Restored, got {:?}", other),
        }
        assert_eq!(guard.remaining().as_deref(), Some("10:00"));
    }

    #[tokio::test]
    async fn test_login_rejects_reserved_username_without_backend() {
        let clock = ManualClock::new(NOW);
        let guard = guard_with(Arc::new(MemoryTokenStore::new()), &clock);
        let api = FakeApi::default();

        let err = guard.login(&api, " Admin ", "secret").await.unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(ref k) if k == "invalid_credentials"));
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_login_rejects_empty_fields() {
        let clock = ManualClock::new(NOW);
        let guard = guard_with(Arc::new(MemoryTokenStore::new()), &clock);
        let api = FakeApi::default();

        let err = guard.login(&api, "", "secret").await.unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(ref k) if k == "empty_fields"));
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_login_unauthorized_maps_to_invalid_credentials() {
        let clock = ManualClock::new(NOW);
        let guard = guard_with(Arc::new(MemoryTokenStore::new()), &clock);
        let api = FakeApi::default();
        *api.login_reply.lock().unwrap() = Some(Err(401));

        let err = guard.login(&api, "operator", "wrong").await.unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(ref k) if k == "invalid_credentials"));
        assert!(!guard.is_active());
    }

    #[tokio::test]
    async fn test_login_success_stores_token() {
        let clock = ManualClock::new(NOW);
        let store = Arc::new(MemoryTokenStore::new());
        let guard = guard_with(store.clone(), &clock);
        let api = FakeApi::default();
        *api.login_reply.lock().unwrap() = Some(Ok(reply(NOW + 3600, &["Admin"])));

        let session = guard.login(&api, "operator", "pw").await.unwrap();
        assert_eq!(session.roles, vec![Role::Admin]);
        assert_eq!(store.load().unwrap(), Some(session.token.clone()));
        assert_eq!(guard.bearer(), Some(session.token));
    }

    #[tokio::test]
    async fn test_login_falls_back_to_reply_roles() {
        let clock = ManualClock::new(NOW);
        let guard = guard_with(Arc::new(MemoryTokenStore::new()), &clock);
        let api = FakeApi::default();
        *api.login_reply.lock().unwrap() = Some(Ok(LoginReply {
            token: mint_token(NOW + 3600, &[]),
            roles: vec!["Editor".into()],
        }));

        let session = guard.login(&api, "operator", "pw").await.unwrap();
        assert_eq!(session.roles, vec![Role::Editor]);
    }

    #[tokio::test]
    async fn test_refresh_respects_threshold() {
        let clock = ManualClock::new(NOW);
        let store = Arc::new(MemoryTokenStore::with_token(mint_token(NOW + 301, &["Admin"])));
        let guard = guard_with(store, &clock);
        guard.restore().unwrap();
        let api = FakeApi::default();
        *api.refresh_reply.lock().unwrap() = Some(Ok(reply(NOW + 3600, &["Admin"])));

        let outcome = guard.refresh(&api).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::NotDue { seconds_left: 301 });
        assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 0);

        clock.advance(2);
        match guard.refresh(&api).await.unwrap() {
            RefreshOutcome::Refreshed(session) => assert_eq!(session.expires_at, NOW + 3600),
            other => panic!("Expected Refreshed, got {:?}", other),
        }
        assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_keeps_idle_deadline() {
        let clock = ManualClock::new(NOW);
        let store = Arc::new(MemoryTokenStore::with_token(mint_token(NOW + 100, &["Admin"])));
        let guard = guard_with(store, &clock);
        guard.restore().unwrap();
        let api = FakeApi::default();
        *api.refresh_reply.lock().unwrap() = Some(Ok(reply(NOW + 3600, &["Admin"])));

        guard.refresh(&api).await.unwrap();
        assert_eq!(guard.remaining().as_deref(), Some("01:40"));
    }

    #[tokio::test]
    async fn test_refresh_failure_tears_down() {
        let clock = ManualClock::new(NOW);
        let store = Arc::new(MemoryTokenStore::with_token(mint_token(NOW + 10, &["Admin"])));
        let guard = guard_with(store.clone(), &clock);
        guard.restore().unwrap();
        let api = FakeApi::default();
        *api.refresh_reply.lock().unwrap() = Some(Err(500));

        assert!(guard.refresh(&api).await.is_err());
        assert_eq!(
            guard.snapshot(),
            SessionState::LoggedOut {
                reason: LogoutReason::RefreshFailed
            }
        );
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_countdown_and_touch() {
        let clock = ManualClock::new(NOW);
        let store = Arc::new(MemoryTokenStore::with_token(mint_token(NOW + 5, &["Admin"])));
        let guard = guard_with(store, &clock);
        guard.restore().unwrap();

        assert_eq!(guard.tick_countdown(), Some(5));

        clock.advance(4);
        guard.touch();
        assert_eq!(guard.tick_countdown(), Some(3600));
        assert_eq!(guard.remaining().as_deref(), Some("60:00"));

        clock.advance(3600);
        assert_eq!(guard.tick_countdown(), Some(0));
        assert_eq!(
            guard.snapshot(),
            SessionState::LoggedOut {
                reason: LogoutReason::IdleTimeout
            }
        );
        assert_eq!(guard.tick_countdown(), None);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let clock = ManualClock::new(NOW);
        let store = Arc::new(MemoryTokenStore::with_token(mint_token(NOW + 600, &["Admin"])));
        let guard = guard_with(store, &clock);
        guard.restore().unwrap();
        let mut rx = guard.subscribe();
        rx.borrow_and_update();

        assert!(guard.teardown(LogoutReason::Unauthorized));
        assert!(!guard.teardown(LogoutReason::Manual));
        assert!(!guard.teardown(LogoutReason::IdleTimeout));

        assert!(rx.has_changed().unwrap());
        assert_eq!(
            *rx.borrow_and_update(),
            SessionState::LoggedOut {
                reason: LogoutReason::Unauthorized
            }
        );
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_logout_without_session_clears_store() {
        let clock = ManualClock::new(NOW);
        let store = Arc::new(MemoryTokenStore::with_token("stale"));
        let guard = guard_with(store.clone(), &clock);
        guard.logout().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_session_debug_hides_token() {
        let session = Session {
            token: "secret-token".into(),
            roles: vec![Role::Admin],
            expires_at: 1,
        };
        assert!(!format!("{:?}", session).contains("secret-token"));
    }
}
