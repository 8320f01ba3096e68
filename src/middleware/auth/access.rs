//! Per-request authentication -> `Authentication` in request extensions.
//!
//! - Runs the AuthenticationRouter once for every request (bearer first, then cookie).
//! - Never rejects by itself: protected routes add `guard::require` on top.
//! - A renewed session cookie is attached only when the handler finished with a
//!   2xx/3xx response. If the request future is dropped (client went away),
//!   nothing is attached.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderValue, Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::state::AppState;

/// Apply authentication to every route of `router`.
///
/// ```ignore
/// let app = middleware::auth::access::apply(api::routes(&state), state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth = state.auth.authenticate(req.headers());

    tracing::debug!(state = ?auth.state, "request authenticated");

    let renewal = auth.renewal.clone();

    // middleware -> guard / extractor
    req.extensions_mut().insert(auth);

    let mut response = next.run(req).await;

    let Some(cookie) = renewal else {
        return response;
    };

    let status = response.status();
    if !(status.is_success() || status.is_redirection()) {
        tracing::debug!(%status, "skipping session renewal for unsuccessful response");
        return response;
    }

    // Login/logout handlers manage the cookie themselves.
    let prefix = format!("{}=", cookie.directives.name);
    let handler_set_cookie = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&prefix));
    if handler_set_cookie {
        return response;
    }

    match HeaderValue::from_str(&cookie.to_set_cookie()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
            tracing::debug!(expires_at = %cookie.expires_at, "session cookie renewed");
        }
        Err(err) => {
            tracing::warn!(error = %err, "renewed session cookie is not a valid header value");
        }
    }

    response
}
