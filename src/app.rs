/*
 * Responsibility
 * - Config -> dependencies -> Router
 * - Middleware (auth, request id, tracing, limits)
 * - axum::serve()
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware;
use crate::services::auth::build_auth_services;
use crate::services::identity::{IdentityStore, InMemoryIdentityStore};
use crate::state::AppState;

fn init_tracing() {
    // RUST_LOG wins; e.g. RUST_LOG=info,dual_auth=debug,tower_http=debug
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development: fail fast. Production: default hook, keep serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("failed to load configuration")?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting in {:?} mode on {} (issuer={}, audience={})",
        config.app_env,
        config.addr,
        config.auth_issuer,
        config.auth_audience
    );

    let identities = seed_identities(&config)?;
    let state = build_state(&config, identities)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn seed_identities(config: &Config) -> Result<Arc<dyn IdentityStore>> {
    let store = InMemoryIdentityStore::new();
    for user in &config.seed_users {
        let roles: Vec<&str> = user.roles.iter().map(String::as_str).collect();
        store
            .insert(&user.username, &user.email, &user.password, &roles)
            .with_context(|| format!("failed to seed user {}", user.username))?;
    }
    if config.seed_users.is_empty() {
        tracing::warn!("no DEV_USERS configured; every login will be rejected");
    }
    Ok(Arc::new(store))
}

/// Build process-level services once; key material is read-only from here on.
pub fn build_state(config: &Config, identities: Arc<dyn IdentityStore>) -> Result<AppState> {
    let (login, auth) =
        build_auth_services(config, identities).context("invalid authentication configuration")?;
    Ok(AppState::new(login, auth))
}

pub fn build_router(state: AppState) -> Router {
    let routes = api::routes(&state);
    let routes = middleware::auth::access::apply(routes, state.clone());
    middleware::http::apply(routes.with_state(state))
}
