//! HTTP client for the event backend.
//!
//! Every call carries the operator locale as `Accept-Language`; operator
//! calls also carry the session token. Non-2xx replies are mapped onto
//! [`ConsoleError`] with the backend error body preserved, and a 401 on an
//! operator call ends the session.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use domain::models::{CheckInReply, CheckInRequest, ImportReport, RetryReport, RetryRequest, RetryRow};
use domain::services::Locale;
use reqwest::header::ACCEPT_LANGUAGE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::checkin::CheckInApi;
use crate::config::Config;
use crate::error::{ConsoleError, ErrorBody};
use crate::import::{ImportApi, SpreadsheetUpload};
use crate::session::{LoginReply, LogoutReason, SessionApi, SessionGuard};
use crate::telemetry;

/// Who a request is made on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    /// Public endpoints and login; a 401 leaves the session alone
    Anonymous,
    /// Bearer token attached; a 401 ends the session
    Operator,
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    locale: Locale,
    guard: Arc<SessionGuard>,
}

impl HttpBackend {
    pub fn new(config: &Config, guard: Arc<SessionGuard>) -> Result<Self, ConsoleError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConsoleError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            locale: config.locale(),
            guard,
        })
    }

    pub fn guard(&self) -> &Arc<SessionGuard> {
        &self.guard
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    fn request(&self, method: Method, path: &str, auth: Auth) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header(ACCEPT_LANGUAGE, self.locale.tag());

        match (auth, self.guard.bearer()) {
            (Auth::Operator, Some(token)) => builder.bearer_auth(token),
            _ => builder,
        }
    }

    async fn execute(
        &self,
        method: Method,
        endpoint: &'static str,
        builder: RequestBuilder,
        auth: Auth,
    ) -> Result<Response, ConsoleError> {
        let start = Instant::now();

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                telemetry::record_backend_request(&method, endpoint, 0, start.elapsed());
                warn!(endpoint, error = %e, "Backend unreachable");
                return Err(ConsoleError::Network(e.to_string()));
            }
        };

        let status = response.status();
        telemetry::record_backend_request(&method, endpoint, status.as_u16(), start.elapsed());

        if status.is_success() {
            debug!(endpoint, status = status.as_u16(), "Backend request succeeded");
            return Ok(response);
        }

        let body = read_error_body(response).await;
        warn!(
            endpoint,
            status = status.as_u16(),
            message = body.message.as_deref().unwrap_or_default(),
            "Backend request failed"
        );

        if status == StatusCode::UNAUTHORIZED && auth == Auth::Operator {
            self.guard.teardown(LogoutReason::Unauthorized);
        }

        Err(status_error(status, body))
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        query: &[(&str, String)],
        auth: Auth,
    ) -> Result<T, ConsoleError> {
        let builder = self.request(Method::GET, path, auth).query(query);
        let response = self.execute(Method::GET, endpoint, builder, auth).await?;
        decode_body(response).await
    }

    pub(crate) async fn send_json<B, T>(
        &self,
        method: Method,
        endpoint: &'static str,
        path: &str,
        body: &B,
        auth: Auth,
    ) -> Result<T, ConsoleError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(method.clone(), path, auth).json(body);
        let response = self.execute(method, endpoint, builder, auth).await?;
        decode_body(response).await
    }

    /// Request whose reply body is ignored.
    pub(crate) async fn send_empty(
        &self,
        method: Method,
        endpoint: &'static str,
        path: &str,
        auth: Auth,
    ) -> Result<(), ConsoleError> {
        let builder = self.request(method.clone(), path, auth);
        self.execute(method, endpoint, builder, auth).await?;
        Ok(())
    }
}

/// Maps a non-2xx status onto the error taxonomy.
pub fn status_error(status: StatusCode, body: ErrorBody) -> ConsoleError {
    match status.as_u16() {
        401 => ConsoleError::Unauthorized(body),
        404 => ConsoleError::NotFound(body),
        s if s >= 500 => ConsoleError::Server { status: s, body },
        s => ConsoleError::Rejected { status: s, body },
    }
}

/// Error bodies are usually JSON; anything else becomes the message.
pub fn parse_error_body(raw: &str) -> ErrorBody {
    let raw = raw.trim();
    if raw.is_empty() {
        return ErrorBody::default();
    }
    serde_json::from_str(raw).unwrap_or_else(|_| ErrorBody::with_message(raw))
}

async fn read_error_body(response: Response) -> ErrorBody {
    match response.text().await {
        Ok(raw) => parse_error_body(&raw),
        Err(e) => {
            debug!(error = %e, "Failed to read error body");
            ErrorBody::default()
        }
    }
}

async fn decode_body<T: DeserializeOwned>(response: Response) -> Result<T, ConsoleError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ConsoleError::Network(e.to_string()))?;
    let parsed = if bytes.is_empty() {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_slice(&bytes)
    };
    parsed.map_err(|e| ConsoleError::Decode(e.to_string()))
}

#[async_trait]
impl SessionApi for HttpBackend {
    async fn login(&self, username: &str, password: &str) -> Result<LoginReply, ConsoleError> {
        self.send_json(
            Method::POST,
            "login",
            "/api/admin/login",
            &json!({ "username": username, "password": password }),
            Auth::Anonymous,
        )
        .await
    }

    async fn refresh(&self, token: &str) -> Result<LoginReply, ConsoleError> {
        // The guard decides what a failed refresh means for the session.
        let builder = self
            .request(Method::POST, "/api/admin/refresh", Auth::Anonymous)
            .bearer_auth(token)
            .json(&json!({}));
        let response = self
            .execute(Method::POST, "refresh", builder, Auth::Anonymous)
            .await?;
        decode_body(response).await
    }
}

#[async_trait]
impl CheckInApi for HttpBackend {
    async fn check_in(&self, qr_id: &str) -> Result<CheckInReply, ConsoleError> {
        let request = CheckInRequest {
            qr_id: qr_id.to_string(),
        };
        self.send_json(
            Method::POST,
            "checkin",
            "/api/admin/checkin",
            &request,
            Auth::Operator,
        )
        .await
    }
}

#[async_trait]
impl ImportApi for HttpBackend {
    async fn upload_guests(
        &self,
        upload: SpreadsheetUpload,
        delete_existing: bool,
    ) -> Result<ImportReport, ConsoleError> {
        let mut part = Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(mime) = upload.mime.as_deref() {
            part = part
                .mime_str(mime)
                .map_err(|_| ConsoleError::Validation("invalidFileType".to_string()))?;
        }
        let form = Form::new()
            .part("file", part)
            .text("deleteExisting", delete_existing.to_string());

        let builder = self
            .request(Method::POST, "/api/admin/guests/upload", Auth::Operator)
            .multipart(form);
        let response = self
            .execute(Method::POST, "guests.upload", builder, Auth::Operator)
            .await?;
        decode_body(response).await
    }

    async fn retry_rows(&self, rows: Vec<RetryRow>) -> Result<RetryReport, ConsoleError> {
        self.send_json(
            Method::POST,
            "guests.upload.retry",
            "/api/admin/guests/upload/retry",
            &RetryRequest { rows },
            Auth::Operator,
        )
        .await
    }
}
