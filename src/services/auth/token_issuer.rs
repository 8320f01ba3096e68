use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::claims::Claim;
use super::error::{AuthError, AuthResult};
use super::options::TokenOptions;

/// Signed payload of a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct TokenPayload {
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub claims: Vec<Claim>,
}

/// A freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    pub fn expires_in_seconds(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_seconds().max(0) as u64
    }
}

/// HS256 compact-JWT issuer.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct TokenIssuer {
    issuer: String,
    audience: String,
    lifetime: chrono::Duration,
    encoding_key: EncodingKey,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl TokenIssuer {
    pub fn new(options: &TokenOptions) -> AuthResult<Self> {
        if options.signing_key.as_bytes().is_empty() {
            return Err(AuthError::Configuration(
                "signing key must not be empty".to_string(),
            ));
        }
        if options.lifetime <= chrono::Duration::zero() {
            return Err(AuthError::Configuration(
                "token lifetime must be positive".to_string(),
            ));
        }

        Ok(Self {
            issuer: options.issuer.clone(),
            audience: options.audience.clone(),
            lifetime: options.lifetime,
            encoding_key: EncodingKey::from_secret(options.signing_key.as_bytes()),
        })
    }

    pub fn lifetime(&self) -> chrono::Duration {
        self.lifetime
    }

    pub fn issue(&self, claims: &[Claim]) -> AuthResult<IssuedToken> {
        self.issue_at(claims, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, claims: &[Claim], now: DateTime<Utc>) -> AuthResult<IssuedToken> {
        let expires_at = now.checked_add_signed(self.lifetime).ok_or_else(|| {
            AuthError::Configuration("token lifetime overflows the clock".to_string())
        })?;
        let payload = TokenPayload {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            claims: claims.to_vec(),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());

        let token = jsonwebtoken::encode(&header, &payload, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign token");
            AuthError::Configuration(format!("token signing failed: {e}"))
        })?;

        debug!(
            claims = payload.claims.len(),
            expires_at = %expires_at,
            "issued bearer token"
        );

        Ok(IssuedToken { token, expires_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::keys::SigningKey;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn options() -> TokenOptions {
        TokenOptions {
            issuer: "app".to_string(),
            audience: "clients".to_string(),
            signing_key: SigningKey::new(b"0123456789abcdef0123456789abcdef".to_vec()).unwrap(),
            lifetime: chrono::Duration::hours(1),
            clock_skew: chrono::Duration::seconds(60),
        }
    }

    #[test]
    fn token_has_three_base64url_segments() {
        let issuer = TokenIssuer::new(&options()).unwrap();
        let issued = issuer.issue(&[Claim::new("email", "a@b.com")]).unwrap();

        let segments: Vec<&str> = issued.token.split('.').collect();
        assert_eq!(segments.len(), 3);
        for s in &segments {
            assert!(URL_SAFE_NO_PAD.decode(s).is_ok());
        }

        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segments[0]).unwrap()).unwrap();
        assert_eq!(header["alg"], "HS256");
        assert_eq!(header["typ"], "JWT");
    }

    #[test]
    fn expiry_is_now_plus_lifetime() {
        let issuer = TokenIssuer::new(&options()).unwrap();
        let now = Utc::now();
        let issued = issuer.issue_at(&[], now).unwrap();
        assert_eq!(issued.expires_at, now + chrono::Duration::hours(1));
        assert_eq!(issued.expires_in_seconds(now), 3600);
    }

    #[test]
    fn non_positive_lifetime_is_rejected() {
        let mut opts = options();
        opts.lifetime = chrono::Duration::zero();
        assert!(matches!(
            TokenIssuer::new(&opts),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn expiry_past_the_clock_is_a_configuration_error() {
        let issuer = TokenIssuer::new(&options()).unwrap();
        let result = issuer.issue_at(&[], DateTime::<Utc>::MAX_UTC);
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }
}
