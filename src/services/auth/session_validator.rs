use chrono::{DateTime, Utc};
use tracing::debug;

use super::error::{AuthError, AuthResult};
use super::options::SessionOptions;
use super::principal::{Principal, Scheme};
use super::session_issuer::{SessionCookie, SessionIssuer};

/// Outcome of a successful session validation.
///
/// `renewed` is a directive: the caller attaches it to the response only when the
/// request completes normally.
#[derive(Debug, Clone)]
pub struct SessionValidation {
    pub principal: Principal,
    pub renewed: Option<SessionCookie>,
}

#[derive(Debug, Clone)]
pub struct SessionValidator {
    issuer: SessionIssuer,
}

impl SessionValidator {
    pub fn new(options: &SessionOptions) -> AuthResult<Self> {
        Ok(Self {
            issuer: SessionIssuer::new(options)?,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.issuer.directives().name
    }

    pub fn validate(&self, cookie_value: &str) -> AuthResult<SessionValidation> {
        self.validate_at(cookie_value, Utc::now())
    }

    /// Validate as if the current time were `now`.
    ///
    /// Renews once more than half the sliding window has elapsed since the cookie
    /// was minted; the renewed expiry never passes the absolute cap fixed at login.
    pub fn validate_at(
        &self,
        cookie_value: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<SessionValidation> {
        let payload = self.issuer.open(cookie_value).inspect_err(|_| {
            debug!("session cookie could not be opened");
        })?;

        if now > payload.expires_at {
            debug!(expires_at = %payload.expires_at, now = %now, "session expired");
            return Err(AuthError::ExpiredSession);
        }

        let window = self.issuer.sliding_window();
        let elapsed = now - payload.issued_at;
        let renewed = if elapsed > window / 2 {
            let candidate = now
                .checked_add_signed(window)
                .map_or(payload.absolute_expires_at, |t| {
                    std::cmp::min(t, payload.absolute_expires_at)
                });
            if candidate > payload.expires_at {
                let cookie =
                    self.issuer
                        .mint(payload.claims.clone(), now, payload.absolute_expires_at)?;
                debug!(expires_at = %cookie.expires_at, "session renewed");
                Some(cookie)
            } else {
                None
            }
        } else {
            None
        };

        Ok(SessionValidation {
            principal: Principal::new(payload.claims, Scheme::Cookie),
            renewed,
        })
    }
}
