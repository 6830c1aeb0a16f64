//! Common validation utilities.

use validator::ValidationError;

/// Spreadsheet extensions accepted by the guest import.
pub const SPREADSHEET_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// MIME types accepted by the guest import.
pub const SPREADSHEET_MIME_TYPES: [&str; 2] = [
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
];

/// Maximum length of a guest identifier.
const MAX_QR_ID_LENGTH: usize = 128;

/// Validates that a value is not empty once trimmed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be empty".into());
        return Err(err);
    }
    Ok(())
}

/// Validates a scanned or typed guest identifier.
pub fn validate_qr_id(qr_id: &str) -> Result<(), ValidationError> {
    let trimmed = qr_id.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("qr_id_empty");
        err.message = Some("Guest identifier must not be empty".into());
        return Err(err);
    }
    if trimmed.len() > MAX_QR_ID_LENGTH {
        let mut err = ValidationError::new("qr_id_length");
        err.message = Some("Guest identifier cannot exceed 128 characters".into());
        return Err(err);
    }
    if trimmed.chars().any(char::is_control) {
        let mut err = ValidationError::new("qr_id_format");
        err.message = Some("Guest identifier contains control characters".into());
        return Err(err);
    }
    Ok(())
}

/// Validates a spreadsheet upload by extension and, when known, MIME type.
pub fn validate_spreadsheet_upload(
    file_name: &str,
    mime: Option<&str>,
) -> Result<(), ValidationError> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if !SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
        let mut err = ValidationError::new("invalid_file_type");
        err.message = Some("Only .xlsx and .xls files are accepted".into());
        return Err(err);
    }

    if let Some(mime) = mime {
        if !SPREADSHEET_MIME_TYPES.contains(&mime) {
            let mut err = ValidationError::new("invalid_file_type");
            err.message = Some(format!("Unsupported MIME type: {}", mime).into());
            return Err(err);
        }
    }

    Ok(())
}

/// Guesses the spreadsheet MIME type from a file name.
pub fn spreadsheet_mime_for(file_name: &str) -> Option<&'static str> {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".xlsx") {
        Some(SPREADSHEET_MIME_TYPES[0])
    } else if lower.ends_with(".xls") {
        Some(SPREADSHEET_MIME_TYPES[1])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("x").is_ok());
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("").is_err());
    }

    #[test]
    fn test_validate_qr_id() {
        assert!(validate_qr_id("a1b2c3").is_ok());
        assert!(validate_qr_id("  a1b2c3\n").is_ok());
        assert!(validate_qr_id("  ").is_err());
        assert!(validate_qr_id(&"x".repeat(129)).is_err());
        assert!(validate_qr_id("ab\u{7}cd").is_err());
    }

    #[test]
    fn test_qr_id_error_code() {
        let err = validate_qr_id("").unwrap_err();
        assert_eq!(err.code, "qr_id_empty");
    }

    #[test]
    fn test_spreadsheet_extensions() {
        assert!(validate_spreadsheet_upload("guests.xlsx", None).is_ok());
        assert!(validate_spreadsheet_upload("GUESTS.XLS", None).is_ok());
        assert!(validate_spreadsheet_upload("guests.csv", None).is_err());
        assert!(validate_spreadsheet_upload("guests", None).is_err());
    }

    #[test]
    fn test_spreadsheet_mime() {
        assert!(validate_spreadsheet_upload(
            "guests.xlsx",
            Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
        )
        .is_ok());
        assert!(validate_spreadsheet_upload("guests.xls", Some("application/vnd.ms-excel")).is_ok());
        assert!(validate_spreadsheet_upload("guests.xlsx", Some("text/csv")).is_err());
    }

    #[test]
    fn test_spreadsheet_mime_for() {
        assert_eq!(spreadsheet_mime_for("a.xls"), Some("application/vnd.ms-excel"));
        assert_eq!(
            spreadsheet_mime_for("a.XLSX"),
            Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
        );
        assert_eq!(spreadsheet_mime_for("a.pdf"), None);
    }
}
