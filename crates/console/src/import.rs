//! Bulk guest import with a row-level correction loop.
//!
//! A spreadsheet upload may partially fail. Failed rows are kept in a map
//! keyed by their source row number, which is the only identity that
//! survives retries. The operator overrides cells locally, and
//! [`ImportWorkflow::retry`] resubmits only the rows that were edited.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use domain::models::{value_text, ImportReport, ImportRowResult, RetryReport, RetryRow};
use domain::services::{highlighted_headers, translate_error, HeaderMapping, Locale};
use serde_json::{Map, Value};
use shared::validation::{spreadsheet_mime_for, validate_spreadsheet_upload};
use tracing::{info, warn};

use crate::error::ConsoleError;
use crate::telemetry;

/// Spreadsheet file ready to be sent.
#[derive(Debug, Clone)]
pub struct SpreadsheetUpload {
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl SpreadsheetUpload {
    pub fn new(file_name: impl Into<String>, mime: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime,
            bytes,
        }
    }

    /// Reads a file, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self, ConsoleError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        let mime = spreadsheet_mime_for(&file_name).map(str::to_string);
        Ok(Self::new(file_name, mime, bytes))
    }

    fn validate(&self) -> Result<(), ConsoleError> {
        if self.file_name.trim().is_empty() {
            return Err(ConsoleError::Validation("noFileSelected".to_string()));
        }
        validate_spreadsheet_upload(&self.file_name, self.mime.as_deref())
            .map_err(|_| ConsoleError::Validation("invalidFileType".to_string()))
    }
}

#[async_trait]
pub trait ImportApi: Send + Sync {
    async fn upload_guests(
        &self,
        upload: SpreadsheetUpload,
        delete_existing: bool,
    ) -> Result<ImportReport, ConsoleError>;

    async fn retry_rows(&self, rows: Vec<RetryRow>) -> Result<RetryReport, ConsoleError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    Idle,
    Uploading,
    Clean,
    HasFailures,
    Retrying,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadSummary {
    pub message: Option<String>,
    pub failed_rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    /// No row has been edited
    NothingToRetry,
    Retried {
        message: Option<String>,
        recovered: usize,
        remaining: usize,
    },
}

#[derive(Debug, Clone)]
struct PendingRow {
    result: ImportRowResult,
    overrides: Map<String, Value>,
}

pub struct ImportWorkflow {
    api: Arc<dyn ImportApi>,
    locale: Locale,
    phase: ImportPhase,
    rows: BTreeMap<u32, PendingRow>,
    headers: Vec<String>,
}

impl ImportWorkflow {
    pub fn new(api: Arc<dyn ImportApi>, locale: Locale) -> Self {
        Self {
            api,
            locale,
            phase: ImportPhase::Idle,
            rows: BTreeMap::new(),
            headers: Vec::new(),
        }
    }

    pub fn phase(&self) -> ImportPhase {
        self.phase
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Pending rows in row order.
    pub fn rows(&self) -> impl Iterator<Item = &ImportRowResult> {
        self.rows.values().map(|p| &p.result)
    }

    pub fn row_numbers(&self) -> Vec<u32> {
        self.rows.keys().copied().collect()
    }

    pub fn overrides(&self, row: u32) -> Option<&Map<String, Value>> {
        self.rows
            .get(&row)
            .map(|p| &p.overrides)
            .filter(|o| !o.is_empty())
    }

    /// Rows carrying at least one local edit.
    pub fn edited_rows(&self) -> Vec<u32> {
        self.rows
            .iter()
            .filter(|(_, p)| !p.overrides.is_empty())
            .map(|(row, _)| *row)
            .collect()
    }

    /// Value shown in a cell: the local edit, else what was uploaded.
    pub fn display_value(&self, row: u32, header: &str) -> Option<String> {
        let pending = self.rows.get(&row)?;
        Some(match pending.overrides.get(header) {
            Some(value) => value_text(value),
            None => pending.result.cell_text(header),
        })
    }

    /// Columns to highlight for a row.
    pub fn invalid_headers(&self, row: u32) -> Vec<&str> {
        match self.rows.get(&row) {
            Some(pending) => highlighted_headers(&self.headers, &pending.result.error_fields),
            None => Vec::new(),
        }
    }

    /// A row's errors in the operator's locale.
    pub fn translated_errors(&self, row: u32) -> Vec<String> {
        self.rows
            .get(&row)
            .map(|p| {
                p.result
                    .errors
                    .iter()
                    .map(|e| translate_error(e, self.locale))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn upload(
        &mut self,
        file: Option<SpreadsheetUpload>,
        delete_existing: bool,
    ) -> Result<UploadSummary, ConsoleError> {
        let file = file.ok_or_else(|| ConsoleError::Validation("noFileSelected".to_string()))?;
        file.validate()?;

        let file_name = file.file_name.clone();
        self.phase = ImportPhase::Uploading;
        self.rows.clear();
        self.headers.clear();

        let report = match self.api.upload_guests(file, delete_existing).await {
            Ok(report) => report,
            Err(e) => {
                warn!(file = %file_name, error = %e, "Guest upload failed");
                self.phase = ImportPhase::Idle;
                return Err(e);
            }
        };

        let failed_rows = report.errors.len();
        telemetry::record_import_rows("failed", failed_rows);

        if let Some(first) = report.errors.first() {
            self.headers = first.headers();
        }
        for result in report.errors {
            self.rows.insert(
                result.row,
                PendingRow {
                    result,
                    overrides: Map::new(),
                },
            );
        }

        self.phase = if self.rows.is_empty() {
            ImportPhase::Clean
        } else {
            ImportPhase::HasFailures
        };

        info!(
            file = %file_name,
            delete_existing,
            failed_rows,
            "Guest upload processed"
        );

        Ok(UploadSummary {
            message: report.message,
            failed_rows,
        })
    }

    /// Overrides one cell of a pending row, addressed by row number.
    ///
    /// The header must name a column of the table or of the row itself;
    /// it is matched exactly, then ignoring case.
    pub fn edit_cell(&mut self, row: u32, header: &str, value: &str) -> Result<(), ConsoleError> {
        if self.phase != ImportPhase::HasFailures {
            return Err(ConsoleError::Validation(
                "No failed rows are awaiting correction".to_string(),
            ));
        }
        let pending = self
            .rows
            .get_mut(&row)
            .ok_or_else(|| ConsoleError::Validation(format!("Row {} is not pending", row)))?;
        let column = resolve_column(&self.headers, &pending.result, header).ok_or_else(|| {
            warn!(row, header, "Edit refused for unknown column");
            ConsoleError::Validation("unknownColumn".to_string())
        })?;
        pending
            .overrides
            .insert(column, Value::String(value.to_string()));
        Ok(())
    }

    /// Column shown at `index` in the correction table.
    pub fn column_at(&self, index: usize) -> Option<&str> {
        self.headers.get(index).map(String::as_str)
    }

    /// Overrides one cell addressed by its position in the correction table.
    pub fn edit_cell_at(&mut self, index: usize, header: &str, value: &str) -> Result<(), ConsoleError> {
        let row = self
            .rows
            .keys()
            .nth(index)
            .copied()
            .ok_or_else(|| ConsoleError::Validation(format!("No pending row at index {}", index)))?;
        self.edit_cell(row, header, value)
    }

    pub async fn retry(&mut self) -> Result<RetryOutcome, ConsoleError> {
        if self.phase != ImportPhase::HasFailures {
            return Ok(RetryOutcome::NothingToRetry);
        }

        let mapping = HeaderMapping::resolve(&self.headers);
        let batch: Vec<RetryRow> = self
            .rows
            .values()
            .filter(|p| !p.overrides.is_empty())
            .map(|p| mapping.retry_row(&p.result, &p.overrides))
            .collect();

        if batch.is_empty() {
            return Ok(RetryOutcome::NothingToRetry);
        }

        let submitted = batch.len();
        self.phase = ImportPhase::Retrying;
        let report = match self.api.retry_rows(batch).await {
            Ok(report) => report,
            Err(e) => {
                warn!(rows = submitted, error = %e, "Import retry failed");
                self.phase = ImportPhase::HasFailures;
                return Err(e);
            }
        };

        let before = self.rows.len();
        self.reconcile(&mapping, &report);
        let recovered = before - self.rows.len();

        telemetry::record_import_rows("retried", submitted);
        telemetry::record_import_rows("recovered", recovered);
        info!(
            submitted,
            recovered,
            remaining = self.rows.len(),
            "Import retry reconciled"
        );

        Ok(RetryOutcome::Retried {
            message: report.message,
            recovered,
            remaining: self.rows.len(),
        })
    }

    /// Drops every pending row and local edit.
    pub fn ignore(&mut self) {
        self.rows.clear();
        self.headers.clear();
        self.phase = ImportPhase::Idle;
    }

    fn reconcile(&mut self, mapping: &HeaderMapping, report: &RetryReport) {
        let previous = std::mem::take(&mut self.rows);

        for (row, pending) in previous {
            if report.succeeded(row) {
                continue;
            }
            let carried = match report.failure_for(row) {
                Some(failure) => {
                    let retried = mapping.retry_row(&pending.result, &pending.overrides);
                    PendingRow {
                        result: ImportRowResult {
                            row,
                            data: mapping.merged_data(&retried),
                            errors: failure.errors.clone(),
                            error_fields: failure.error_fields.clone(),
                        },
                        overrides: pending.overrides,
                    }
                }
                None => pending,
            };
            self.rows.insert(row, carried);
        }

        match self.rows.values().next() {
            Some(first) => {
                self.headers = first.result.headers();
                self.phase = ImportPhase::HasFailures;
            }
            None => {
                self.headers.clear();
                self.phase = ImportPhase::Clean;
            }
        }
    }
}

fn resolve_column(headers: &[String], row: &ImportRowResult, header: &str) -> Option<String> {
    let wanted = header.trim();
    if wanted.is_empty() {
        return None;
    }
    let known: Vec<String> = headers
        .iter()
        .cloned()
        .chain(row.headers().into_iter().filter(|h| !headers.contains(h)))
        .collect();
    known
        .iter()
        .find(|h| h.as_str() == wanted)
        .or_else(|| known.iter().find(|h| h.to_lowercase() == wanted.to_lowercase()))
        .cloned()
}
