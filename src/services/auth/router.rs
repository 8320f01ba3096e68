/*
 * Responsibility
 * - Per-request scheme selection: bearer header first, else session cookie, else anonymous
 * - Exactly one validation path runs per request (claims never mix across schemes)
 * - Per-operation requirement check -> allow / 401 / redirect-to-login
 *
 * Notes
 * - Error kinds are logged here and then dropped; callers only see authenticated or anonymous
 */
use axum::http::{HeaderMap, header};
use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use super::error::AuthError;
use super::principal::{Principal, Scheme};
use super::session_issuer::SessionCookie;
use super::session_validator::SessionValidator;
use super::token_validator::TokenValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// A validator for the given scheme is running.
    Authenticating(Scheme),
    Authenticated(Scheme),
    /// The scheme's credential was present but failed validation.
    Rejected(Scheme),
}

/// Which schemes an operation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeRequirement {
    Token,
    Cookie,
    Either,
}

impl SchemeRequirement {
    fn accepts(self, scheme: Scheme) -> bool {
        match (self, scheme) {
            (_, Scheme::Anonymous) => false,
            (Self::Either, _) => true,
            (Self::Token, s) => s == Scheme::Token,
            (Self::Cookie, s) => s == Scheme::Cookie,
        }
    }
}

/// Capability check attached to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthRequirement {
    pub requires_auth: bool,
    pub scheme: SchemeRequirement,
}

impl AuthRequirement {
    pub const ANONYMOUS: Self = Self {
        requires_auth: false,
        scheme: SchemeRequirement::Either,
    };

    pub const fn token() -> Self {
        Self {
            requires_auth: true,
            scheme: SchemeRequirement::Token,
        }
    }

    pub const fn cookie() -> Self {
        Self {
            requires_auth: true,
            scheme: SchemeRequirement::Cookie,
        }
    }

    pub const fn either() -> Self {
        Self {
            requires_auth: true,
            scheme: SchemeRequirement::Either,
        }
    }
}

/// Result of `authenticate` for one request.
#[derive(Debug, Clone)]
pub struct Authentication {
    pub state: AuthState,
    pub principal: Principal,
    /// Refreshed session cookie; apply only if the request completes normally.
    pub renewal: Option<SessionCookie>,
}

impl Authentication {
    pub fn anonymous(state: AuthState) -> Self {
        Self {
            state,
            principal: Principal::anonymous(),
            renewal: None,
        }
    }

    /// True when the bearer path was taken for this request.
    pub fn used_bearer(&self) -> bool {
        matches!(
            self.state,
            AuthState::Authenticated(Scheme::Token) | AuthState::Rejected(Scheme::Token)
        )
    }
}

/// Why a protected operation refused the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    /// Bare 401 (token scheme).
    Unauthorized,
    /// 302 to the login page (cookie scheme).
    RedirectToLogin { location: String },
}

enum Credential<'a> {
    /// Raw bytes after `Bearer `; may not be valid UTF-8.
    Bearer(&'a [u8]),
    Session(&'a str),
    Absent,
}

#[derive(Debug, Clone)]
pub struct AuthenticationRouter {
    tokens: TokenValidator,
    sessions: SessionValidator,
    login_path: String,
}

impl AuthenticationRouter {
    pub fn new(tokens: TokenValidator, sessions: SessionValidator, login_path: String) -> Self {
        Self {
            tokens,
            sessions,
            login_path,
        }
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Authentication {
        self.authenticate_at(headers, Utc::now())
    }

    pub fn authenticate_at(&self, headers: &HeaderMap, now: DateTime<Utc>) -> Authentication {
        match extract_credential(headers, self.sessions.cookie_name()) {
            Credential::Bearer(raw) => {
                trace!(state = ?AuthState::Authenticating(Scheme::Token), "validating bearer token");
                let validated = std::str::from_utf8(raw)
                    .map_err(|_| AuthError::MalformedToken)
                    .and_then(|token| self.tokens.validate_at(token, now));
                match validated {
                    Ok(principal) => Authentication {
                        state: AuthState::Authenticated(Scheme::Token),
                        principal,
                        renewal: None,
                    },
                    Err(err) => {
                        debug!(kind = err.kind(), "bearer authentication rejected");
                        Authentication::anonymous(AuthState::Rejected(Scheme::Token))
                    }
                }
            }
            Credential::Session(value) => {
                trace!(state = ?AuthState::Authenticating(Scheme::Cookie), "validating session cookie");
                match self.sessions.validate_at(value, now) {
                    Ok(v) => Authentication {
                        state: AuthState::Authenticated(Scheme::Cookie),
                        principal: v.principal,
                        renewal: v.renewed,
                    },
                    Err(err) => {
                        debug!(kind = err.kind(), "session authentication rejected");
                        Authentication::anonymous(AuthState::Rejected(Scheme::Cookie))
                    }
                }
            }
            Credential::Absent => Authentication::anonymous(AuthState::Unauthenticated),
        }
    }

    /// Evaluate `requirement` for a request whose original path+query is `return_url`.
    pub fn authorize(
        &self,
        auth: &Authentication,
        requirement: AuthRequirement,
        return_url: &str,
    ) -> Result<(), Challenge> {
        if !requirement.requires_auth {
            return Ok(());
        }

        if let AuthState::Authenticated(scheme) = auth.state
            && requirement.scheme.accepts(scheme)
        {
            return Ok(());
        }

        if requirement.scheme == SchemeRequirement::Token || auth.used_bearer() {
            return Err(Challenge::Unauthorized);
        }

        Err(Challenge::RedirectToLogin {
            location: login_location(&self.login_path, return_url),
        })
    }
}

fn extract_credential<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Credential<'a> {
    if let Some(token) = bearer_token(headers) {
        return Credential::Bearer(token);
    }
    match session_cookie(headers, cookie_name) {
        Some(value) => Credential::Session(value),
        None => Credential::Absent,
    }
}

/// Presence is decided on the raw header bytes so an undecodable token still
/// takes the bearer path.
fn bearer_token(headers: &HeaderMap) -> Option<&[u8]> {
    let value = headers.get(header::AUTHORIZATION)?.as_bytes().trim_ascii();
    let (scheme, token) = match value.iter().position(|b| *b == b' ') {
        Some(i) => (&value[..i], &value[i + 1..]),
        None => (value, &[][..]),
    };
    scheme
        .eq_ignore_ascii_case(b"bearer")
        .then(|| token.trim_ascii())
}

fn session_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, v)| *k == name && !v.is_empty())
        .map(|(_, v)| v)
}

fn login_location(login_path: &str, return_url: &str) -> String {
    if return_url.is_empty() || return_url == "/" {
        return login_path.to_string();
    }
    let encoded: String = url::form_urlencoded::byte_serialize(return_url.as_bytes()).collect();
    format!("{login_path}?ReturnUrl={encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::claims::Claim;
    use crate::services::auth::keys::{EncryptionKey, SigningKey};
    use crate::services::auth::options::{SessionOptions, TokenOptions};
    use crate::services::auth::session_issuer::SessionIssuer;
    use crate::services::auth::token_issuer::TokenIssuer;
    use axum::http::HeaderValue;
    use chrono::Duration;

    struct Fixture {
        tokens: TokenIssuer,
        sessions: SessionIssuer,
        router: AuthenticationRouter,
    }

    fn fixture() -> Fixture {
        let token_opts = TokenOptions {
            issuer: "app".to_string(),
            audience: "clients".to_string(),
            signing_key: SigningKey::new(b"router-test-secret".to_vec()).unwrap(),
            lifetime: Duration::hours(1),
            clock_skew: Duration::seconds(60),
        };
        let session_opts = SessionOptions::with_key(EncryptionKey::from_bytes([5u8; 32]));

        Fixture {
            tokens: TokenIssuer::new(&token_opts).unwrap(),
            sessions: SessionIssuer::new(&session_opts).unwrap(),
            router: AuthenticationRouter::new(
                TokenValidator::new(&token_opts).unwrap(),
                SessionValidator::new(&session_opts).unwrap(),
                "/login".to_string(),
            ),
        }
    }

    fn headers(bearer: Option<&str>, cookie: Option<&str>) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(t) = bearer {
            h.insert(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {t}")).unwrap(),
            );
        }
        if let Some(c) = cookie {
            h.insert(
                header::COOKIE,
                HeaderValue::from_str(&format!("theme=dark; auth_session={c}")).unwrap(),
            );
        }
        h
    }

    #[test]
    fn no_credentials_is_unauthenticated() {
        let f = fixture();
        let auth = f.router.authenticate(&HeaderMap::new());
        assert_eq!(auth.state, AuthState::Unauthenticated);
        assert!(!auth.principal.is_authenticated());
    }

    #[test]
    fn bearer_token_authenticates_with_token_scheme() {
        let f = fixture();
        let token = f.tokens.issue(&[Claim::new("name", "uponia")]).unwrap().token;
        let auth = f.router.authenticate(&headers(Some(&token), None));
        assert_eq!(auth.state, AuthState::Authenticated(Scheme::Token));
        assert_eq!(auth.principal.name(), Some("uponia"));
    }

    #[test]
    fn session_cookie_authenticates_with_cookie_scheme() {
        let f = fixture();
        let cookie = f.sessions.issue(&[Claim::new("name", "uponia")]).unwrap();
        let auth = f.router.authenticate(&headers(None, Some(&cookie.value)));
        assert_eq!(auth.state, AuthState::Authenticated(Scheme::Cookie));
        assert_eq!(auth.principal.scheme(), Scheme::Cookie);
    }

    #[test]
    fn expired_bearer_never_falls_back_to_cookie() {
        let f = fixture();
        let stale = f
            .tokens
            .issue_at(&[Claim::new("name", "a")], Utc::now() - Duration::hours(3))
            .unwrap()
            .token;
        let cookie = f.sessions.issue(&[Claim::new("name", "b")]).unwrap();

        let auth = f
            .router
            .authenticate(&headers(Some(&stale), Some(&cookie.value)));
        assert_eq!(auth.state, AuthState::Rejected(Scheme::Token));
        assert!(!auth.principal.is_authenticated());
        assert!(auth.renewal.is_none());
    }

    #[test]
    fn valid_bearer_wins_over_cookie() {
        let f = fixture();
        let token = f.tokens.issue(&[Claim::new("name", "api")]).unwrap().token;
        let cookie = f.sessions.issue(&[Claim::new("name", "browser")]).unwrap();
        let auth = f
            .router
            .authenticate(&headers(Some(&token), Some(&cookie.value)));
        assert_eq!(auth.principal.name(), Some("api"));
        assert_eq!(auth.principal.claims().len(), 1);
    }

    #[test]
    fn non_bearer_authorization_falls_through_to_cookie() {
        let f = fixture();
        let cookie = f.sessions.issue(&[Claim::new("name", "b")]).unwrap();
        let mut h = headers(None, Some(&cookie.value));
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        let auth = f.router.authenticate(&h);
        assert_eq!(auth.state, AuthState::Authenticated(Scheme::Cookie));
    }

    #[test]
    fn undecodable_bearer_never_falls_back_to_cookie() {
        let f = fixture();
        let cookie = f.sessions.issue(&[Claim::new("name", "b")]).unwrap();
        let mut h = headers(None, Some(&cookie.value));
        h.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap(),
        );

        let auth = f.router.authenticate(&h);
        assert_eq!(auth.state, AuthState::Rejected(Scheme::Token));
        assert!(!auth.principal.is_authenticated());
        assert!(auth.renewal.is_none());
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let f = fixture();
        let token = f.tokens.issue(&[Claim::new("name", "api")]).unwrap().token;
        let mut h = HeaderMap::new();
        h.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("bEaReR {token}")).unwrap(),
        );
        let auth = f.router.authenticate(&h);
        assert_eq!(auth.state, AuthState::Authenticated(Scheme::Token));
    }

    #[test]
    fn session_renewal_is_surfaced() {
        let f = fixture();
        let login = Utc::now();
        let cookie = f.sessions.issue_at(&[], login).unwrap();
        let auth = f
            .router
            .authenticate_at(&headers(None, Some(&cookie.value)), login + Duration::seconds(9));
        assert!(auth.renewal.is_some());
    }

    #[test]
    fn tampered_cookie_is_rejected() {
        let f = fixture();
        let auth = f.router.authenticate(&headers(None, Some("bm90LWEtc2Vzc2lvbg")));
        assert_eq!(auth.state, AuthState::Rejected(Scheme::Cookie));
    }

    #[test]
    fn authorize_outcomes() {
        let f = fixture();
        let token = f.tokens.issue(&[]).unwrap().token;
        let cookie = f.sessions.issue(&[]).unwrap();

        let anon = f.router.authenticate(&HeaderMap::new());
        let by_token = f.router.authenticate(&headers(Some(&token), None));
        let by_cookie = f.router.authenticate(&headers(None, Some(&cookie.value)));
        let rejected_token = f.router.authenticate(&headers(Some("x.y.z"), None));
        let rejected_cookie = f.router.authenticate(&headers(None, Some("bm90LWEtc2Vzc2lvbg")));
        let expired_cookie = {
            let stale = f
                .sessions
                .issue_at(&[], Utc::now() - Duration::hours(1))
                .unwrap();
            f.router.authenticate(&headers(None, Some(&stale.value)))
        };
        assert_eq!(expired_cookie.state, AuthState::Rejected(Scheme::Cookie));

        let r = &f.router;
        assert_eq!(r.authorize(&anon, AuthRequirement::ANONYMOUS, "/"), Ok(()));
        assert_eq!(r.authorize(&by_token, AuthRequirement::token(), "/api/private"), Ok(()));
        assert_eq!(r.authorize(&by_cookie, AuthRequirement::cookie(), "/private"), Ok(()));
        assert_eq!(r.authorize(&by_cookie, AuthRequirement::either(), "/private"), Ok(()));

        assert_eq!(
            r.authorize(&anon, AuthRequirement::token(), "/api/private"),
            Err(Challenge::Unauthorized)
        );
        assert_eq!(
            r.authorize(&anon, AuthRequirement::cookie(), "/private?tab=1"),
            Err(Challenge::RedirectToLogin {
                location: "/login?ReturnUrl=%2Fprivate%3Ftab%3D1".to_string()
            })
        );
        for rejected in [&rejected_cookie, &expired_cookie] {
            assert_eq!(
                r.authorize(rejected, AuthRequirement::cookie(), "/private"),
                Err(Challenge::RedirectToLogin {
                    location: "/login?ReturnUrl=%2Fprivate".to_string()
                })
            );
            assert_eq!(
                r.authorize(rejected, AuthRequirement::token(), "/api/private"),
                Err(Challenge::Unauthorized)
            );
        }
        assert_eq!(
            r.authorize(&rejected_token, AuthRequirement::either(), "/private"),
            Err(Challenge::Unauthorized)
        );
        assert_eq!(
            r.authorize(&by_token, AuthRequirement::cookie(), "/private"),
            Err(Challenge::Unauthorized)
        );
        assert!(matches!(
            r.authorize(&by_cookie, AuthRequirement::token(), "/api/private"),
            Err(Challenge::Unauthorized)
        ));
    }
}
