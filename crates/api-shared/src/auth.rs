//! Bearer-token verification.
//!
//! Tokens are two base64url (unpadded) segments joined by a dot:
//!
//! ```text
//! base64url(claims_json) "." base64url(HMAC-SHA256(secret, first_segment))
//! ```
//!
//! with claims `{ "sub": <32-hex user id>, "role": "patient"|"therapist"|"admin", "exp": <unix secs> }`.
//! Credential issuance for end users happens elsewhere; [`TokenVerifier::issue`] exists for the
//! operator CLI and tests.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use mindcare_core::{CoreError, Identity, RecordId, Role};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid token claims: {0}")]
    InvalidClaims(String),
    #[error("token secret must be at least {} bytes", TokenVerifier::MIN_SECRET_BYTES)]
    WeakSecret,
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::WeakSecret => CoreError::InvalidInput(err.to_string()),
            _ => CoreError::Unauthenticated,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
}

/// Verifies (and, for operators, issues) HMAC-signed bearer tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: Vec<u8>,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl TokenVerifier {
    pub const MIN_SECRET_BYTES: usize = 32;

    /// # Errors
    ///
    /// Returns [`AuthError::WeakSecret`] if the secret is shorter than
    /// [`MIN_SECRET_BYTES`](Self::MIN_SECRET_BYTES).
    pub fn new(secret: impl Into<Vec<u8>>) -> AuthResult<Self> {
        let secret = secret.into();
        if secret.len() < Self::MIN_SECRET_BYTES {
            return Err(AuthError::WeakSecret);
        }
        Ok(Self { secret })
    }

    fn mac(&self) -> AuthResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret).map_err(|_| AuthError::WeakSecret)
    }

    /// Issue a token for `identity` valid for `ttl`.
    pub fn issue(&self, identity: &Identity, ttl: Duration) -> AuthResult<String> {
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::InvalidClaims("token lifetime out of range".into()))?;
        self.issue_at(identity, expires_at)
    }

    pub fn issue_at(&self, identity: &Identity, expires_at: DateTime<Utc>) -> AuthResult<String> {
        let claims = TokenClaims {
            sub: identity.id.to_string(),
            role: identity.role.as_str().to_string(),
            exp: expires_at.timestamp(),
        };
        let json =
            serde_json::to_vec(&claims).map_err(|e| AuthError::InvalidClaims(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    /// Verify a token and return the identity it names.
    pub fn verify(&self, token: &str) -> AuthResult<Identity> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Identity> {
        let (payload, signature) = token.trim().split_once('.').ok_or(AuthError::Malformed)?;
        if payload.is_empty() || signature.contains('.') {
            return Err(AuthError::Malformed);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::BadSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::Malformed)?;
        let claims: TokenClaims =
            serde_json::from_slice(&json).map_err(|e| AuthError::InvalidClaims(e.to_string()))?;

        if claims.exp <= now.timestamp() {
            return Err(AuthError::Expired);
        }

        let id = RecordId::parse(&claims.sub)
            .map_err(|e| AuthError::InvalidClaims(e.to_string()))?;
        let role =
            Role::parse(&claims.role).map_err(|e| AuthError::InvalidClaims(e.to_string()))?;
        Ok(Identity::new(id, role))
    }

    /// Verify the value of an `Authorization` header.
    pub fn verify_bearer(&self, header: Option<&str>) -> AuthResult<Identity> {
        let header = header.ok_or(AuthError::MissingToken)?;
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or(AuthError::MissingToken)?;
        self.verify(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(SECRET).unwrap()
    }

    fn therapist() -> Identity {
        Identity::new(RecordId::new(), Role::Therapist)
    }

    #[test]
    fn issued_tokens_verify() {
        let identity = therapist();
        let token = verifier().issue(&identity, Duration::hours(1)).unwrap();
        assert_eq!(verifier().verify(&token).unwrap(), identity);
        assert_eq!(
            verifier()
                .verify_bearer(Some(&format!("Bearer {token}")))
                .unwrap(),
            identity
        );
    }

    #[test]
    fn short_secrets_are_rejected() {
        assert_eq!(
            TokenVerifier::new(b"short".to_vec()).unwrap_err(),
            AuthError::WeakSecret
        );
    }

    #[test]
    fn expired_tokens_fail() {
        let now = Utc::now();
        let token = verifier()
            .issue_at(&therapist(), now - Duration::seconds(1))
            .unwrap();
        assert_eq!(verifier().verify_at(&token, now), Err(AuthError::Expired));
    }

    #[test]
    fn tampered_payload_fails_signature() {
        let token = verifier().issue(&therapist(), Duration::hours(1)).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let forged_claims = TokenClaims {
            sub: RecordId::new().to_string(),
            role: "admin".into(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let forged = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap()),
            signature
        );
        assert_eq!(verifier().verify(&forged), Err(AuthError::BadSignature));
    }

    #[test]
    fn other_secret_fails_signature() {
        let other = TokenVerifier::new(b"ffffffffffffffffffffffffffffffff".to_vec()).unwrap();
        let token = other.issue(&therapist(), Duration::hours(1)).unwrap();
        assert_eq!(verifier().verify(&token), Err(AuthError::BadSignature));
    }

    #[test]
    fn malformed_inputs() {
        let v = verifier();
        assert_eq!(v.verify("no-dot-here"), Err(AuthError::Malformed));
        assert_eq!(v.verify("a.b.c"), Err(AuthError::Malformed));
        assert_eq!(v.verify_bearer(None), Err(AuthError::MissingToken));
        assert_eq!(
            v.verify_bearer(Some("Basic abc")),
            Err(AuthError::MissingToken)
        );
    }

    #[test]
    fn out_of_range_lifetimes_are_rejected() {
        assert!(matches!(
            verifier().issue(&therapist(), Duration::MAX),
            Err(AuthError::InvalidClaims(_))
        ));
    }

    #[test]
    fn auth_errors_map_to_unauthenticated() {
        assert!(matches!(
            CoreError::from(AuthError::Expired),
            CoreError::Unauthenticated
        ));
    }
}
