//! # erc7231-api — Axum API Services
//!
//! HTTP front end for the identity registry, built on Axum/Tower/Tokio.
//!
//! ## API Surface
//!
//! | Prefix                                 | Module                  | Domain                 |
//! |----------------------------------------|-------------------------|------------------------|
//! | `/v1/tokens`, `/v1/tokens/*/owner`     | [`routes::tokens`]      | Token ledger           |
//! | `/v1/tokens/*/identities-root`         | [`routes::identities`]  | Root commitment        |
//! | `/v1/tokens/*/verify`                  | [`routes::identities`]  | Binding verification   |
//! | `/v1/claims/digest`                    | [`routes::claims`]      | Canonical digests      |
//! | `/v1/events`                           | [`routes::events`]      | Audit log              |
//! | `/health/*`, `/metrics`                | this module             | Operations             |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers; delegates to `erc7231-registry`.
//! - All errors map to structured HTTP responses via `AppError`.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::{AppConfig, AppState};

use crate::auth::AuthConfig;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes and `/metrics` are mounted outside the auth middleware so
/// they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics_on = state.config.metrics_enabled;

    let mut api = Router::new()
        .merge(routes::tokens::router())
        .merge(routes::identities::router())
        .merge(routes::claims::router())
        .merge(routes::events::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(from_fn(auth::auth_middleware));

    if metrics_on {
        api = api.layer(from_fn(middleware::metrics::metrics_middleware));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on && state.prometheus.is_some() {
        unauthenticated =
            unauthenticated.route("/metrics", axum::routing::get(prometheus_metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus text exposition.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.prometheus {
        Some(handle) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — the registry is in memory, so ready once serving.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    tracing::trace!(tokens = state.ledger.len(), "readiness check");
    (StatusCode::OK, "ready")
}
