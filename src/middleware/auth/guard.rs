//! Per-route requirement check (`AuthRequirement`) -> handler, 401, or redirect to login.
//!
//! Must sit inside `access::apply`, which puts `Authentication` into the extensions.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{OriginalUri, State},
    http::{Request, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::services::auth::{
    AuthRequirement, AuthState, Authentication, AuthenticationRouter, Challenge,
};
use crate::state::AppState;

#[derive(Clone)]
struct Guard {
    auth: Arc<AuthenticationRouter>,
    requirement: AuthRequirement,
}

/// Protect every route of `router` with `requirement`.
pub fn require(
    router: Router<AppState>,
    state: &AppState,
    requirement: AuthRequirement,
) -> Router<AppState> {
    let guard = Guard {
        auth: state.auth.clone(),
        requirement,
    };
    router.route_layer(middleware::from_fn_with_state(guard, guard_middleware))
}

async fn guard_middleware(
    State(guard): State<Guard>,
    OriginalUri(original_uri): OriginalUri,
    req: Request<Body>,
    next: Next,
) -> Response {
    let return_url = original_uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let decision = match req.extensions().get::<Authentication>() {
        Some(auth) => guard.auth.authorize(auth, guard.requirement, return_url),
        None => {
            tracing::warn!("guard reached without authentication middleware");
            let anonymous = Authentication::anonymous(AuthState::Unauthenticated);
            guard.auth.authorize(&anonymous, guard.requirement, return_url)
        }
    };

    match decision {
        Ok(()) => next.run(req).await,
        Err(Challenge::Unauthorized) => AppError::Unauthorized.into_response(),
        Err(Challenge::RedirectToLogin { location }) => {
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
    }
}
