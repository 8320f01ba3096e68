use std::collections::HashSet;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use tracing::debug;

use super::error::{AuthError, AuthResult};
use super::options::TokenOptions;
use super::principal::{Principal, Scheme};
use super::token_issuer::TokenPayload;

/// HS256 bearer-token verifier.
///
/// Checks, in order: structure, signature, issuer, audience, expiry (+ clock skew).
/// Any failure yields an error and never a partial principal.
#[derive(Clone)]
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    clock_skew: chrono::Duration,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("TokenValidator")
            .field("validation", &self.validation)
            .field("clock_skew", &self.clock_skew)
            .finish()
    }
}

impl TokenValidator {
    pub fn new(options: &TokenOptions) -> AuthResult<Self> {
        if options.signing_key.as_bytes().is_empty() {
            return Err(AuthError::Configuration(
                "signing key must not be empty".to_string(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[options.issuer.as_str()]);
        validation.set_audience(&[options.audience.as_str()]);
        // Expiry is checked after iss/aud, against a caller-supplied clock.
        validation.validate_exp = false;
        validation.required_spec_claims =
            HashSet::from(["exp", "iss", "aud"].map(str::to_string));

        Ok(Self {
            decoding_key: DecodingKey::from_secret(options.signing_key.as_bytes()),
            validation,
            clock_skew: options.clock_skew,
        })
    }

    pub fn validate(&self, token: &str) -> AuthResult<Principal> {
        self.validate_at(token, Utc::now())
    }

    /// Validate as if the current time were `now`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Principal> {
        let token = token.trim();
        if !is_well_formed(token) {
            debug!(kind = AuthError::MalformedToken.kind(), "bearer token rejected");
            return Err(AuthError::MalformedToken);
        }

        let data = jsonwebtoken::decode::<TokenPayload>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                let mapped = map_jwt_error(e.kind());
                debug!(error = %e, kind = mapped.kind(), "bearer token rejected");
                mapped
            })?;

        let payload = data.claims;
        let deadline = payload
            .exp
            .saturating_add(self.clock_skew.num_seconds());
        if now.timestamp() > deadline {
            debug!(exp = payload.exp, now = now.timestamp(), "bearer token expired");
            return Err(AuthError::ExpiredToken);
        }

        Ok(Principal::new(payload.claims, Scheme::Token))
    }
}

/// Three base64url segments; header and payload decode to JSON objects.
fn is_well_formed(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    let [header, payload, signature] = segments.as_slice() else {
        return false;
    };
    let is_json_object = |segment: &str| {
        URL_SAFE_NO_PAD
            .decode(segment)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok())
            .is_some_and(|value| value.is_object())
    };
    is_json_object(header)
        && is_json_object(payload)
        && !signature.is_empty()
        && URL_SAFE_NO_PAD.decode(signature).is_ok()
}

fn map_jwt_error(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::InvalidAudience => AuthError::InvalidAudience,
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::MalformedToken,
    }
}
