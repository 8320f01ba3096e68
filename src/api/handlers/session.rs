/*
 * Responsibility
 * - GET /login: minimal sign-in form (redirect target for cookie-protected pages)
 * - POST /login: credentials (form) -> session cookie -> redirect to ReturnUrl
 * - GET /private: cookie-protected sample page
 * - /logout: clear the session cookie
 */
use axum::{
    Form,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};

use crate::{
    api::{
        dto::login::{LoginRequest, ReturnUrlQuery},
        extractors::CurrentPrincipal,
    },
    error::AppError,
    services::auth::clear_cookie,
    state::AppState,
};

const LOGIN_FORM: &str = r#"<!doctype html>
<title>Sign in</title>
<form method="post">
  <input name="username" placeholder="username" autocomplete="username">
  <input name="password" type="password" placeholder="password" autocomplete="current-password">
  <button type="submit">Sign in</button>
</form>
"#;

pub async fn login_form() -> Html<&'static str> {
    Html(LOGIN_FORM)
}

pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<ReturnUrlQuery>,
    Form(req): Form<LoginRequest>,
) -> Result<Response, AppError> {
    req.validate()
        .map_err(|msg| AppError::InvalidRequest(msg.to_string()))?;

    let cookie = state
        .login
        .login_with_session(&req.username, &req.password)
        .await?;

    let set_cookie = HeaderValue::from_str(&cookie.to_set_cookie()).map_err(|e| {
        tracing::error!(error = %e, "session cookie is not a valid header value");
        AppError::Internal
    })?;
    let location = HeaderValue::from_str(query.local_target()).map_err(|_| {
        AppError::InvalidRequest("invalid ReturnUrl".to_string())
    })?;

    let mut response = StatusCode::FOUND.into_response();
    response.headers_mut().insert(header::LOCATION, location);
    response.headers_mut().append(header::SET_COOKIE, set_cookie);
    Ok(response)
}

pub async fn private_page(CurrentPrincipal(principal): CurrentPrincipal) -> Html<String> {
    let name = principal.name().unwrap_or("unknown");
    Html(format!("This is a private area. Welcome {name}"))
}

pub async fn logout(State(state): State<AppState>) -> Result<Response, AppError> {
    let cleared = clear_cookie(state.login.sessions().directives());
    let cleared = HeaderValue::from_str(&cleared).map_err(|_| AppError::Internal)?;

    let mut response = "done".into_response();
    response.headers_mut().append(header::SET_COOKIE, cleared);
    Ok(response)
}
