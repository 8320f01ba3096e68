/*
 * Responsibility
 * - Mint encrypted session cookies (ChaCha20-Poly1305, random nonce per cookie)
 * - Cookie directives (HttpOnly, Path, Secure, SameSite=Lax) and Set-Cookie rendering
 * - Sliding expiry: expires_at = now + min(window, remaining absolute lifetime)
 */
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::claims::Claim;
use super::error::{AuthError, AuthResult};
use super::keys::EncryptionKey;
use super::options::SessionOptions;

const NONCE_LEN: usize = 12;
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Logical (decrypted) content of a session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct SessionPayload {
    pub claims: Vec<Claim>,
    /// When this cookie value was minted (login or last renewal).
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Fixed at login; renewals never move it.
    pub absolute_expires_at: DateTime<Utc>,
}

/// How the client must store the cookie, and where to send unauthenticated browsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieDirectives {
    pub name: String,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
    pub login_redirect_path: String,
}

/// An issued (or renewed) session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub value: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub absolute_expires_at: DateTime<Utc>,
    pub directives: CookieDirectives,
}

impl SessionCookie {
    /// `Set-Cookie` header value.
    pub fn to_set_cookie(&self) -> String {
        let max_age = (self.expires_at - self.issued_at).num_seconds().max(0);
        let mut parts = vec![
            format!("{}={}", self.directives.name, self.value),
            format!("Path={}", self.directives.path),
            format!("Max-Age={max_age}"),
            format!("Expires={}", self.expires_at.format(HTTP_DATE)),
        ];
        push_flags(&mut parts, &self.directives);
        parts.join("; ")
    }
}

/// `Set-Cookie` header value that removes the session cookie (sign-out).
pub fn clear_cookie(directives: &CookieDirectives) -> String {
    let mut parts = vec![
        format!("{}=", directives.name),
        format!("Path={}", directives.path),
        "Max-Age=0".to_string(),
        format!(
            "Expires={}",
            DateTime::<Utc>::UNIX_EPOCH.format(HTTP_DATE)
        ),
    ];
    push_flags(&mut parts, directives);
    parts.join("; ")
}

fn push_flags(parts: &mut Vec<String>, directives: &CookieDirectives) {
    if directives.secure {
        parts.push("Secure".to_string());
    }
    if directives.http_only {
        parts.push("HttpOnly".to_string());
    }
    parts.push("SameSite=Lax".to_string());
}

#[derive(Clone)]
pub struct SessionIssuer {
    key: EncryptionKey,
    sliding_window: Duration,
    absolute_lifetime: Duration,
    directives: CookieDirectives,
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("sliding_window", &self.sliding_window)
            .field("absolute_lifetime", &self.absolute_lifetime)
            .field("directives", &self.directives)
            .finish()
    }
}

impl SessionIssuer {
    pub fn new(options: &SessionOptions) -> AuthResult<Self> {
        if options.sliding_window <= Duration::zero() {
            return Err(AuthError::Configuration(
                "session sliding window must be positive".to_string(),
            ));
        }
        if options.absolute_lifetime <= Duration::zero() {
            return Err(AuthError::Configuration(
                "session absolute lifetime must be positive".to_string(),
            ));
        }
        if options.cookie_name.trim().is_empty() {
            return Err(AuthError::Configuration(
                "session cookie name must not be empty".to_string(),
            ));
        }

        Ok(Self {
            key: options.encryption_key.clone(),
            sliding_window: options.sliding_window,
            absolute_lifetime: options.absolute_lifetime,
            directives: CookieDirectives {
                name: options.cookie_name.clone(),
                path: options.cookie_path.clone(),
                http_only: true,
                secure: options.secure,
                login_redirect_path: options.login_path.clone(),
            },
        })
    }

    pub fn directives(&self) -> &CookieDirectives {
        &self.directives
    }

    pub fn sliding_window(&self) -> Duration {
        self.sliding_window
    }

    pub fn issue(&self, claims: &[Claim]) -> AuthResult<SessionCookie> {
        self.issue_at(claims, Utc::now())
    }

    /// Start a new session as if the current time were `now`.
    pub fn issue_at(&self, claims: &[Claim], now: DateTime<Utc>) -> AuthResult<SessionCookie> {
        let absolute_expires_at = now
            .checked_add_signed(self.absolute_lifetime)
            .ok_or_else(|| {
                AuthError::Configuration("session absolute lifetime overflows the clock".to_string())
            })?;
        let cookie = self.mint(claims.to_vec(), now, absolute_expires_at)?;
        debug!(
            claims = claims.len(),
            expires_at = %cookie.expires_at,
            absolute_expires_at = %cookie.absolute_expires_at,
            "issued session cookie"
        );
        Ok(cookie)
    }

    /// Seal a payload minted at `now`, never past `absolute_expires_at`.
    pub(super) fn mint(
        &self,
        claims: Vec<Claim>,
        now: DateTime<Utc>,
        absolute_expires_at: DateTime<Utc>,
    ) -> AuthResult<SessionCookie> {
        let expires_at = now
            .checked_add_signed(self.sliding_window)
            .map_or(absolute_expires_at, |t| std::cmp::min(t, absolute_expires_at));
        let payload = SessionPayload {
            claims,
            issued_at: now,
            expires_at,
            absolute_expires_at,
        };
        let value = self.seal(&payload)?;

        Ok(SessionCookie {
            value,
            issued_at: now,
            expires_at,
            absolute_expires_at,
            directives: self.directives.clone(),
        })
    }

    fn seal(&self, payload: &SessionPayload) -> AuthResult<String> {
        let plaintext = serde_json::to_vec(payload).map_err(|e| {
            error!(error = %e, "failed to serialize session payload");
            AuthError::Configuration(format!("session serialization failed: {e}"))
        })?;

        let cipher = ChaCha20Poly1305::new(Key::from_slice(self.key.as_bytes()));
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher.encrypt(nonce, plaintext.as_slice()).map_err(|_| {
            error!("session encryption failed");
            AuthError::Configuration("session encryption failed".to_string())
        })?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(blob))
    }

    /// Decrypt and parse a cookie value. Any failure is `InvalidSession`.
    pub(super) fn open(&self, value: &str) -> AuthResult<SessionPayload> {
        let blob = URL_SAFE_NO_PAD
            .decode(value.trim())
            .map_err(|_| AuthError::InvalidSession)?;
        if blob.len() <= NONCE_LEN {
            return Err(AuthError::InvalidSession);
        }

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(self.key.as_bytes()));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| AuthError::InvalidSession)?;

        let payload: SessionPayload =
            serde_json::from_slice(&plaintext).map_err(|_| AuthError::InvalidSession)?;
        if payload.expires_at > payload.absolute_expires_at || payload.issued_at > payload.expires_at
        {
            return Err(AuthError::InvalidSession);
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SessionOptions {
        let mut opts = SessionOptions::with_key(EncryptionKey::from_bytes([42u8; 32]));
        opts.sliding_window = Duration::minutes(20);
        opts.absolute_lifetime = Duration::hours(8);
        opts
    }

    #[test]
    fn expiry_is_sliding_window_when_absolute_is_far() {
        let issuer = SessionIssuer::new(&options()).unwrap();
        let now = Utc::now();
        let cookie = issuer.issue_at(&[Claim::new("name", "uponia")], now).unwrap();
        assert_eq!(cookie.expires_at, now + Duration::minutes(20));
        assert_eq!(cookie.absolute_expires_at, now + Duration::hours(8));
        assert!(cookie.directives.http_only);
        assert_eq!(cookie.directives.login_redirect_path, "/login");
    }

    #[test]
    fn expiry_is_capped_by_absolute_lifetime() {
        let mut opts = options();
        opts.absolute_lifetime = Duration::minutes(5);
        let issuer = SessionIssuer::new(&opts).unwrap();
        let now = Utc::now();
        let cookie = issuer.issue_at(&[], now).unwrap();
        assert_eq!(cookie.expires_at, now + Duration::minutes(5));
    }

    #[test]
    fn sealed_payload_opens_with_same_key() {
        let issuer = SessionIssuer::new(&options()).unwrap();
        let claims = vec![Claim::new("email", "a@b.com"), Claim::new("role", "x")];
        let cookie = issuer.issue(&claims).unwrap();
        let payload = issuer.open(&cookie.value).unwrap();
        assert_eq!(payload.claims, claims);
        assert_eq!(payload.expires_at, cookie.expires_at);
    }

    #[test]
    fn two_cookies_for_same_claims_differ() {
        let issuer = SessionIssuer::new(&options()).unwrap();
        let now = Utc::now();
        let a = issuer.issue_at(&[], now).unwrap();
        let b = issuer.issue_at(&[], now).unwrap();
        assert_ne!(a.value, b.value);
    }

    #[test]
    fn set_cookie_has_directives() {
        let issuer = SessionIssuer::new(&options()).unwrap();
        let cookie = issuer.issue(&[]).unwrap();
        let header = cookie.to_set_cookie();
        assert!(header.starts_with(&format!("auth_session={}", cookie.value)));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Max-Age=1200"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Secure"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.contains("GMT"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let issuer = SessionIssuer::new(&options()).unwrap();
        let header = clear_cookie(issuer.directives());
        assert!(header.starts_with("auth_session=;"));
        assert!(header.contains("Max-Age=0"));
        assert!(header.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
    }

    #[test]
    fn absolute_cap_past_the_clock_is_a_configuration_error() {
        let issuer = SessionIssuer::new(&options()).unwrap();
        let result = issuer.issue_at(&[], DateTime::<Utc>::MAX_UTC);
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }

    #[test]
    fn zero_window_is_a_configuration_error() {
        let mut opts = options();
        opts.sliding_window = Duration::zero();
        assert!(matches!(
            SessionIssuer::new(&opts),
            Err(AuthError::Configuration(_))
        ));
    }
}
