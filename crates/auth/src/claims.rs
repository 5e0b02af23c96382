use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Lifetime of every issued identity token, in seconds (one day).
pub const TOKEN_TTL: i64 = 24 * 60 * 60;

/// Identity claims carried by a token.
///
/// The payload is whatever identity object the caller presented at issuance
/// (`extra` keeps every field other than `email`), stamped with `iat`/`exp`
/// as Unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub email: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// Issued-at timestamp (Unix seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix seconds).
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("token signature does not verify")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("identity payload must be an object with a non-empty email")]
    MissingEmail,
}

impl IdentityClaims {
    /// Build claims from an arbitrary identity payload.
    ///
    /// Caller-supplied `iat`/`exp` are discarded; the token always expires
    /// exactly [`TOKEN_TTL`] after `now`.
    pub fn from_identity(identity: Value, now: DateTime<Utc>) -> Result<Self, TokenValidationError> {
        let Value::Object(mut fields) = identity else {
            return Err(TokenValidationError::MissingEmail);
        };

        let email = match fields.remove("email") {
            Some(Value::String(email)) if !email.trim().is_empty() => email,
            _ => return Err(TokenValidationError::MissingEmail),
        };

        fields.remove("iat");
        fields.remove("exp");

        Ok(Self {
            email,
            extra: fields,
            iat: now.timestamp(),
            exp: now.timestamp() + TOKEN_TTL,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Deterministically validate the time window of decoded claims.
///
/// Signature verification happens in [`crate::token`]; this only checks
/// `iat`/`exp` against `now`.
pub fn validate_claims(claims: &IdentityClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn identity_payload_is_preserved_and_expiry_is_one_day() {
        let now = at(1_700_000_000);
        let claims = IdentityClaims::from_identity(
            json!({ "email": "a@x.com", "name": "Ann", "exp": 1, "iat": 1 }),
            now,
        )
        .unwrap();

        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.extra.get("name"), Some(&json!("Ann")));
        assert!(!claims.extra.contains_key("exp"));
        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[test]
    fn identity_without_email_is_rejected() {
        let now = at(1_700_000_000);
        assert_eq!(
            IdentityClaims::from_identity(json!({ "name": "Ann" }), now),
            Err(TokenValidationError::MissingEmail)
        );
        assert_eq!(
            IdentityClaims::from_identity(json!({ "email": "  " }), now),
            Err(TokenValidationError::MissingEmail)
        );
        assert_eq!(
            IdentityClaims::from_identity(json!("a@x.com"), now),
            Err(TokenValidationError::MissingEmail)
        );
    }

    #[test]
    fn time_window_checks() {
        let claims = IdentityClaims::from_identity(json!({ "email": "a@x.com" }), at(1_000)).unwrap();

        assert_eq!(validate_claims(&claims, at(1_000)), Ok(()));
        assert_eq!(validate_claims(&claims, at(1_000 + 86_399)), Ok(()));
        assert_eq!(validate_claims(&claims, at(1_000 + 86_400)), Err(TokenValidationError::Expired));
        assert_eq!(validate_claims(&claims, at(999)), Err(TokenValidationError::NotYetValid));

        let inverted = IdentityClaims { exp: claims.iat, ..claims };
        assert_eq!(validate_claims(&inverted, at(1_000)), Err(TokenValidationError::InvalidTimeWindow));
    }
}
