//! Common test utilities for integration tests.
//!
//! Stands up an axum stub of the event backend on an ephemeral port. Tests
//! register canned replies per method and path, then inspect the requests
//! the console actually sent.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use event_console::backend::HttpBackend;
use event_console::clock::ManualClock;
use event_console::config::Config;
use event_console::session::SessionGuard;
use event_console::storage::MemoryTokenStore;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

/// A request the stub received.
#[derive(Debug, Clone)]
pub struct Hit {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub bearer: Option<String>,
    pub accept_language: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl Hit {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone)]
struct Canned {
    status: StatusCode,
    body: Value,
}

#[derive(Default)]
struct StubState {
    hits: Mutex<Vec<Hit>>,
    replies: Mutex<HashMap<(String, String), VecDeque<Canned>>>,
}

pub struct StubBackend {
    pub base_url: String,
    state: Arc<StubState>,
    task: JoinHandle<()>,
}

impl StubBackend {
    pub async fn start() -> Self {
        let state = Arc::new(StubState::default());
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            task,
        }
    }

    /// Queues a reply; the last queued reply for a route keeps answering.
    pub fn on(&self, method: &str, path: &str, status: u16, body: Value) {
        self.state
            .replies
            .lock()
            .unwrap()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back(Canned {
                status: StatusCode::from_u16(status).unwrap(),
                body,
            });
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.state.hits.lock().unwrap().clone()
    }

    pub fn hits_for(&self, method: &str, path: &str) -> Vec<Hit> {
        self.hits()
            .into_iter()
            .filter(|h| h.method == method && h.path == path)
            .collect()
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let hit = Hit {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        bearer: text(header::AUTHORIZATION)
            .and_then(|v| v.strip_prefix("Bearer ").map(str::to_string)),
        accept_language: text(header::ACCEPT_LANGUAGE),
        content_type: text(header::CONTENT_TYPE),
        body,
    };
    let key = (hit.method.clone(), hit.path.clone());
    state.hits.lock().unwrap().push(hit);

    let canned = {
        let mut replies = state.replies.lock().unwrap();
        match replies.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        }
    };

    match canned {
        Some(canned) => (canned.status, Json(canned.body)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "no stub for route" })),
        )
            .into_response(),
    }
}

/// Current Unix time; tokens are minted relative to it.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Mints an HS256 session token the way the backend does.
pub fn mint_token(exp: i64, roles: &[&str]) -> String {
    encode(
        &Header::default(),
        &json!({ "sub": "operator", "exp": exp, "iat": now(), "roles": roles }),
        &EncodingKey::from_secret(b"integration-secret"),
    )
    .unwrap()
}

/// Console wired to a stub backend.
pub struct TestConsole {
    pub stub: StubBackend,
    pub config: Config,
    pub clock: ManualClock,
    pub store: Arc<MemoryTokenStore>,
    pub guard: Arc<SessionGuard>,
    pub backend: Arc<HttpBackend>,
}

impl TestConsole {
    /// Console with an empty token store.
    pub async fn anonymous() -> Self {
        Self::build(Arc::new(MemoryTokenStore::new())).await
    }

    /// Console with a restored session holding the given roles.
    pub async fn signed_in(roles: &[&str]) -> Self {
        let store = Arc::new(MemoryTokenStore::with_token(mint_token(now() + 3600, roles)));
        let console = Self::build(store).await;
        console.guard.restore().unwrap();
        assert!(console.guard.is_active());
        console
    }

    pub async fn build(store: Arc<MemoryTokenStore>) -> Self {
        let stub = StubBackend::start().await;
        let config = Config::load_for_test(&[("backend.base_url", stub.base_url.as_str())]).unwrap();
        let clock = ManualClock::new(now());
        let guard = Arc::new(SessionGuard::new(
            store.clone(),
            Arc::new(clock.clone()),
            config.session.clone(),
        ));
        let backend = Arc::new(HttpBackend::new(&config, guard.clone()).unwrap());

        Self {
            stub,
            config,
            clock,
            store,
            guard,
            backend,
        }
    }
}

/// Guest record as the backend serializes it.
pub fn guest_json(id: &str, qr_id: &str, guest_type: &str) -> Value {
    json!({
        "_id": id,
        "qrId": qr_id,
        "firstName": "Deniz",
        "lastName": "Kaya",
        "email": format!("{}@example.com", qr_id.to_lowercase()),
        "guestType": guest_type,
        "willAttend": true,
        "responded": true,
        "isCheckedIn": false,
        "guests": []
    })
}
