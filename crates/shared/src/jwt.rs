//! Session token claim decoding.
//!
//! The backend mints HS256 tokens whose payload carries `exp` and `roles`.
//! The console never holds the signing secret, so it only reads the claims
//! to learn the expiry and the granted roles; the backend remains the
//! authority on signature validity.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to decode token: {0}")]
    DecodingError(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,
}

/// Claims read from a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id or username), when the backend includes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Raw role names granted to the holder
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Claims {
    /// Seconds until expiry; negative once expired.
    pub fn seconds_left(&self, now: i64) -> i64 {
        self.exp - now
    }

    /// A token is expired once `exp` is not strictly in the future.
    pub fn is_expired(&self, now: i64) -> bool {
        self.exp <= now
    }
}

/// Decodes the claims of a token without checking its signature or expiry.
pub fn decode_claims(token: &str) -> Result<Claims, JwtError> {
    let token = token.trim();
    if token.is_empty() || token.split('.').count() != 3 {
        return Err(JwtError::InvalidToken);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let token_data =
        decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidToken => JwtError::InvalidToken,
                _ => JwtError::DecodingError(e.to_string()),
            }
        })?;

    Ok(token_data.claims)
}

/// Decodes the claims and rejects tokens that are already expired at `now`.
pub fn decode_unexpired(token: &str, now: i64) -> Result<Claims, JwtError> {
    let claims = decode_claims(token)?;
    if claims.is_expired(now) {
        return Err(JwtError::TokenExpired);
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const NOW: i64 = 1_700_000_000;

    fn make_token(exp: i64, roles: &[&str]) -> String {
        let claims = Claims {
            sub: Some("operator".to_string()),
            exp,
            iat: Some(NOW - 60),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"backend_only_secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_claims_reads_exp_and_roles() {
        let token = make_token(NOW + 600, &["Admin", "Editor"]);
        let claims = decode_claims(&token).unwrap();

        assert_eq!(claims.exp, NOW + 600);
        assert_eq!(claims.roles, vec!["Admin", "Editor"]);
        assert_eq!(claims.sub.as_deref(), Some("operator"));
    }

    #[test]
    fn test_decode_claims_ignores_signature_secret() {
        let claims = Claims {
            sub: None,
            exp: NOW + 10,
            iat: None,
            roles: vec![],
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"some other secret"),
        )
        .unwrap();

        assert_eq!(decode_claims(&token).unwrap().exp, NOW + 10);
    }

    #[test]
    fn test_decode_claims_tolerates_expired_tokens() {
        let token = make_token(NOW - 1, &[]);
        let claims = decode_claims(&token).unwrap();
        assert!(claims.is_expired(NOW));
    }

    #[test]
    fn test_decode_unexpired_rejects_expired() {
        let token = make_token(NOW - 1, &["Admin"]);
        assert!(matches!(
            decode_unexpired(&token, NOW),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn test_decode_unexpired_exp_equal_to_now_is_expired() {
        let token = make_token(NOW, &["Admin"]);
        assert!(matches!(
            decode_unexpired(&token, NOW),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn test_missing_roles_defaults_to_empty() {
        #[derive(Serialize)]
        struct Bare {
            exp: i64,
        }
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Bare { exp: NOW + 5 },
            &EncodingKey::from_secret(b"k"),
        )
        .unwrap();

        let claims = decode_claims(&token).unwrap();
        assert!(claims.roles.is_empty());
    }

    #[test]
    fn test_malformed_token() {
        assert!(matches!(decode_claims("not_a_jwt"), Err(JwtError::InvalidToken)));
        assert!(matches!(decode_claims(""), Err(JwtError::InvalidToken)));
        assert!(decode_claims("invalid.token.here").is_err());
    }

    #[test]
    fn test_seconds_left() {
        let claims = Claims {
            sub: None,
            exp: NOW + 299,
            iat: None,
            roles: vec![],
        };
        assert_eq!(claims.seconds_left(NOW), 299);
        assert_eq!(claims.seconds_left(NOW + 300), -1);
    }
}
