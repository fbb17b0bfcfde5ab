//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("Bearer token. Set via AUTH_TOKEN env var."))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI spec for the service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ERC-7231 Identity Binding API",
        version = "0.1.0",
        description = "Binds ordered identity claims to tokens by committing a root hash per token, and verifies signed claims against the committed root.\n\nAuthentication: optional Bearer token on `/v1/*`. Health probes are unauthenticated.",
        license(name = "AGPL-3.0-or-later")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        crate::routes::tokens::mint_token,
        crate::routes::tokens::get_owner,
        crate::routes::identities::set_identities_root,
        crate::routes::identities::get_identities_root,
        crate::routes::identities::verify_binding,
        crate::routes::claims::digest_claims,
        crate::routes::events::list_events,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::tokens::MintRequest,
        crate::routes::tokens::TokenOwnerResponse,
        crate::routes::identities::SetRootRequest,
        crate::routes::identities::RootResponse,
        crate::routes::identities::VerifyRequest,
        crate::routes::identities::VerifyResponse,
        crate::routes::claims::ClaimBody,
        crate::routes::claims::DigestRequest,
        crate::routes::claims::DigestResponse,
        crate::routes::events::EventResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "tokens", description = "Token minting and ownership"),
        (name = "identities", description = "Identities root commitment and verification"),
        (name = "claims", description = "Claim canonicalization and digests"),
        (name = "events", description = "Registry audit log"),
    )
)]
pub struct ApiDoc;

/// Router serving `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
