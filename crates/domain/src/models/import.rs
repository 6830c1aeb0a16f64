//! Bulk guest import models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column role a backend validation error points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    QrId,
    Email,
    FirstName,
    LastName,
    GuestType,
}

impl FieldKind {
    /// Resolution order used when mapping headers to roles.
    pub const ALL: [FieldKind; 5] = [
        FieldKind::QrId,
        FieldKind::Email,
        FieldKind::FirstName,
        FieldKind::LastName,
        FieldKind::GuestType,
    ];

    /// Header name assumed when no column classifies to this role.
    pub fn fallback_header(&self) -> &'static str {
        match self {
            FieldKind::QrId => "qrId",
            FieldKind::Email => "E-mail",
            FieldKind::FirstName => "First Name",
            FieldKind::LastName => "Last Name",
            FieldKind::GuestType => "Guest Type",
        }
    }
}

/// One failed source row reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRowResult {
    /// 1-based row number in the uploaded sheet
    pub row: u32,
    /// Cell values keyed by the sheet's own header text, in column order
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub error_fields: Vec<FieldKind>,
}

impl ImportRowResult {
    /// Cell text as displayed: missing or falsy cells read as empty.
    pub fn cell_text(&self, header: &str) -> String {
        self.data.get(header).map(value_text).unwrap_or_default()
    }

    pub fn headers(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }
}

/// Renders a JSON cell the way the sheet shows it; null, false, zero and
/// empty strings all become empty.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "true".to_string(),
        Value::Number(n) => {
            if n.as_f64().is_some_and(|f| f == 0.0) {
                String::new()
            } else {
                n.to_string()
            }
        }
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Corrected row submitted on retry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryRow {
    pub row: u32,
    pub qr_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub guest_type: String,
}

impl RetryRow {
    pub fn field(&self, kind: FieldKind) -> &str {
        match kind {
            FieldKind::QrId => &self.qr_id,
            FieldKind::Email => &self.email,
            FieldKind::FirstName => &self.first_name,
            FieldKind::LastName => &self.last_name,
            FieldKind::GuestType => &self.guest_type,
        }
    }

    pub fn set_field(&mut self, kind: FieldKind, value: String) {
        match kind {
            FieldKind::QrId => self.qr_id = value,
            FieldKind::Email => self.email = value,
            FieldKind::FirstName => self.first_name = value,
            FieldKind::LastName => self.last_name = value,
            FieldKind::GuestType => self.guest_type = value,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryRequest {
    pub rows: Vec<RetryRow>,
}

/// Response to an upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<ImportRowResult>,
}

/// Reference to a row that was imported on retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRef {
    pub row: u32,
}

/// Response to a retry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryReport {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<ImportRowResult>,
    #[serde(default)]
    pub successful_rows: Vec<RowRef>,
}

impl RetryReport {
    pub fn succeeded(&self, row: u32) -> bool {
        self.successful_rows.iter().any(|r| r.row == row)
    }

    pub fn failure_for(&self, row: u32) -> Option<&ImportRowResult> {
        self.errors.iter().find(|r| r.row == row)
    }
}
