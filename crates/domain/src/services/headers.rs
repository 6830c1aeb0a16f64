//! Spreadsheet header classification.
//!
//! Guest sheets arrive with headers in Turkish, English or French. Each
//! header is normalised (see [`shared::text::normalize_key`]) and run
//! through an ordered rule table; the first matching rule decides the
//! column's role.

use serde_json::{Map, Value};

use crate::models::import::{value_text, FieldKind, ImportRowResult, RetryRow};
use shared::text::normalize_key;

enum Matcher {
    Contains(&'static [&'static str]),
    Exact(&'static [&'static str]),
}

struct HeaderRule {
    kind: FieldKind,
    matchers: &'static [Matcher],
}

/// Order matters: "soyadı" must not reach the first-name rule and
/// "prénom" must not reach the last-name rule through "nom".
static RULES: &[HeaderRule] = &[
    HeaderRule {
        kind: FieldKind::QrId,
        matchers: &[Matcher::Contains(&["qr"])],
    },
    HeaderRule {
        kind: FieldKind::Email,
        matchers: &[Matcher::Contains(&["email", "eposta", "courriel"])],
    },
    // tr
    HeaderRule {
        kind: FieldKind::LastName,
        matchers: &[Matcher::Contains(&["soy"])],
    },
    // fr
    HeaderRule {
        kind: FieldKind::FirstName,
        matchers: &[Matcher::Contains(&["prenom"])],
    },
    HeaderRule {
        kind: FieldKind::FirstName,
        matchers: &[
            Matcher::Contains(&["first", "isim"]),
            Matcher::Exact(&["ad", "adi"]),
        ],
    },
    HeaderRule {
        kind: FieldKind::LastName,
        matchers: &[Matcher::Contains(&["last", "nom"])],
    },
    HeaderRule {
        kind: FieldKind::GuestType,
        matchers: &[Matcher::Contains(&["guest", "misafir", "type"])],
    },
];

impl Matcher {
    fn matches(&self, key: &str) -> bool {
        match self {
            Matcher::Contains(needles) => needles.iter().any(|n| key.contains(n)),
            Matcher::Exact(words) => words.iter().any(|w| key == *w),
        }
    }
}

/// Role of a raw header, if any rule recognises it.
pub fn classify_header(raw: &str) -> Option<FieldKind> {
    let key = normalize_key(raw);
    if key.is_empty() {
        return None;
    }
    RULES
        .iter()
        .find(|rule| rule.matchers.iter().any(|m| m.matches(&key)))
        .map(|rule| rule.kind)
}

/// Headers that should be highlighted for a row's error fields.
pub fn highlighted_headers<'a>(headers: &'a [String], error_fields: &[FieldKind]) -> Vec<&'a str> {
    headers
        .iter()
        .filter(|h| classify_header(h).is_some_and(|kind| error_fields.contains(&kind)))
        .map(String::as_str)
        .collect()
}

/// Column chosen for each role of a failed-row table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMapping {
    pub qr_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub guest_type: String,
}

impl HeaderMapping {
    /// Picks, per role, the first header classified to it, falling back to
    /// the canonical English header names.
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
        let pick = |kind: FieldKind| -> String {
            headers
                .iter()
                .map(|h| h.as_ref())
                .find(|h| classify_header(h) == Some(kind))
                .unwrap_or(kind.fallback_header())
                .to_string()
        };

        Self {
            qr_id: pick(FieldKind::QrId),
            email: pick(FieldKind::Email),
            first_name: pick(FieldKind::FirstName),
            last_name: pick(FieldKind::LastName),
            guest_type: pick(FieldKind::GuestType),
        }
    }

    pub fn header_for(&self, kind: FieldKind) -> &str {
        match kind {
            FieldKind::QrId => &self.qr_id,
            FieldKind::Email => &self.email,
            FieldKind::FirstName => &self.first_name,
            FieldKind::LastName => &self.last_name,
            FieldKind::GuestType => &self.guest_type,
        }
    }

    /// Builds the corrected row: override, else original cell, else empty;
    /// every value trimmed.
    pub fn retry_row(&self, result: &ImportRowResult, overrides: &Map<String, Value>) -> RetryRow {
        let mut row = RetryRow {
            row: result.row,
            ..Default::default()
        };
        for kind in FieldKind::ALL {
            let header = self.header_for(kind);
            let value = match overrides.get(header) {
                Some(v) => value_text(v),
                None => result.cell_text(header),
            };
            row.set_field(kind, value);
        }
        row
    }

    /// Cell data of a row that failed again: only the mapped columns, in
    /// role order, carrying the corrected values.
    pub fn merged_data(&self, retry: &RetryRow) -> Map<String, Value> {
        let mut data = Map::new();
        for kind in FieldKind::ALL {
            data.insert(
                self.header_for(kind).to_string(),
                Value::String(retry.field(kind).to_string()),
            );
        }
        data
    }
}
