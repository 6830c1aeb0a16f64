//! Integration tests for sign-in, restore and refresh against a stub backend.

mod common;

use std::sync::Arc;

use common::{mint_token, now, TestConsole};
use domain::models::Role;
use domain::services::Route;
use event_console::error::ConsoleError;
use event_console::navigation::{Console, Visit};
use event_console::session::{LogoutReason, RefreshOutcome, RestoreOutcome, SessionState};
use event_console::storage::{MemoryTokenStore, TokenStore};
use event_console::views::BackendViews;
use serde_json::json;

// ============================================================================
// Restore
// ============================================================================

#[tokio::test]
async fn test_expired_stored_token_redirects_to_login_without_backend_call() {
    let store = Arc::new(MemoryTokenStore::with_token(mint_token(now() - 60, &["Admin"])));
    let console = TestConsole::build(store.clone()).await;

    let outcome = console.guard.restore().unwrap();

    assert_eq!(outcome, RestoreOutcome::Expired);
    assert_eq!(store.load().unwrap(), None);
    assert_eq!(
        console.guard.snapshot(),
        SessionState::LoggedOut {
            reason: LogoutReason::Expired
        }
    );

    let nav = Console::new(
        console.guard.clone(),
        Arc::new(BackendViews::new(console.backend.clone())),
    );
    let visit = nav.visit("/checkin").await.unwrap();
    assert!(matches!(
        visit,
        Visit::LoginRequired {
            requested: Route::CheckIn
        }
    ));
    assert!(console.stub.hits().is_empty());
}

#[tokio::test]
async fn test_valid_stored_token_restores_roles() {
    let console = TestConsole::signed_in(&["CheckInEditor", "GuestEditor"]).await;

    assert_eq!(
        console.guard.roles(),
        vec![Role::CheckInEditor, Role::GuestEditor]
    );
    assert!(console.stub.hits().is_empty());
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_stores_token_and_activates_session() {
    let console = TestConsole::anonymous().await;
    let token = mint_token(now() + 3600, &["Editor"]);
    console.stub.on(
        "POST",
        "/api/admin/login",
        200,
        json!({ "token": token, "roles": ["Editor"] }),
    );

    let session = console
        .guard
        .login(console.backend.as_ref(), " kapi ", "parola")
        .await
        .unwrap();

    assert_eq!(session.roles, vec![Role::Editor]);
    assert_eq!(console.store.load().unwrap(), Some(token));
    assert!(console.guard.is_active());

    let hits = console.stub.hits_for("POST", "/api/admin/login");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].json(), json!({ "username": "kapi", "password": "parola" }));
    assert_eq!(hits[0].bearer, None);
    assert_eq!(hits[0].accept_language.as_deref(), Some("en"));
}

#[tokio::test]
async fn test_login_with_reserved_username_never_reaches_backend() {
    let console = TestConsole::anonymous().await;

    let err = console
        .guard
        .login(console.backend.as_ref(), "ADMIN", "whatever")
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::Validation(ref key) if key == "invalid_credentials"));
    assert!(console.stub.hits().is_empty());
    assert!(!console.guard.is_active());
}

#[tokio::test]
async fn test_login_rejected_credentials() {
    let console = TestConsole::anonymous().await;
    console.stub.on(
        "POST",
        "/api/admin/login",
        401,
        json!({ "message": "Invalid credentials" }),
    );

    let err = console
        .guard
        .login(console.backend.as_ref(), "kapi", "wrong")
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::Validation(ref key) if key == "invalid_credentials"));
    assert_eq!(console.guard.snapshot(), SessionState::Anonymous);
    assert_eq!(console.store.load().unwrap(), None);
}

#[tokio::test]
async fn test_login_with_empty_fields() {
    let console = TestConsole::anonymous().await;

    let err = console
        .guard
        .login(console.backend.as_ref(), "kapi", "")
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::Validation(ref key) if key == "empty_fields"));
    assert!(console.stub.hits().is_empty());
}

// ============================================================================
// Refresh
// ============================================================================

#[tokio::test]
async fn test_refresh_near_expiry_sends_current_token() {
    let old = mint_token(now() + 120, &["Admin"]);
    let console = TestConsole::build(Arc::new(MemoryTokenStore::with_token(old.clone()))).await;
    console.guard.restore().unwrap();

    let fresh = mint_token(now() + 3600, &["Admin"]);
    console.stub.on(
        "POST",
        "/api/admin/refresh",
        200,
        json!({ "token": fresh }),
    );

    let outcome = console.guard.refresh(console.backend.as_ref()).await.unwrap();

    assert!(matches!(outcome, RefreshOutcome::Refreshed(_)));
    assert_eq!(console.guard.bearer(), Some(fresh.clone()));
    assert_eq!(console.store.load().unwrap(), Some(fresh));

    let hits = console.stub.hits_for("POST", "/api/admin/refresh");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].bearer, Some(old));
}

#[tokio::test]
async fn test_refresh_not_due_makes_no_request() {
    let console = TestConsole::signed_in(&["Admin"]).await;

    let outcome = console.guard.refresh(console.backend.as_ref()).await.unwrap();

    assert!(matches!(outcome, RefreshOutcome::NotDue { .. }));
    assert!(console.stub.hits().is_empty());
}

#[tokio::test]
async fn test_failed_refresh_ends_session() {
    let console = TestConsole::build(Arc::new(MemoryTokenStore::with_token(mint_token(
        now() + 60,
        &["Admin"],
    ))))
    .await;
    console.guard.restore().unwrap();
    console.stub.on(
        "POST",
        "/api/admin/refresh",
        401,
        json!({ "message": "Token expired" }),
    );

    assert!(console.guard.refresh(console.backend.as_ref()).await.is_err());

    assert_eq!(
        console.guard.snapshot(),
        SessionState::LoggedOut {
            reason: LogoutReason::RefreshFailed
        }
    );
    assert_eq!(console.store.load().unwrap(), None);
}
