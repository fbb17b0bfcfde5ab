//! # Claim Routes
//!
//! - `POST /v1/claims/digest` — Canonical bytes, root, and message digest
//!   of a claim sequence under the service's configuration
//!
//! Lets a holder compute exactly what to sign without reimplementing the
//! canonical encoding.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use erc7231_core::{ClaimEncoding, DigestAlgorithm, Hash256, IdentityClaim};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Assemble the claims router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/claims/digest", post(digest_claims))
}

/// Wire form of one identity claim.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClaimBody {
    /// Namespaced user identifier.
    #[serde(rename = "userID")]
    pub user_id: String,
    /// Where the claim can be checked.
    #[serde(rename = "verifierUri1", alias = "verifierURI")]
    pub verifier_uri: String,
    /// Free-form annotation. Required, as in `IdentityClaim`.
    pub memo: String,
}

impl From<ClaimBody> for IdentityClaim {
    fn from(body: ClaimBody) -> Self {
        IdentityClaim::new(body.user_id, body.verifier_uri, body.memo)
    }
}

/// Request to digest a claim sequence.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DigestRequest {
    /// Claims in binding order.
    pub claims: Vec<ClaimBody>,
}

/// Digest of a claim sequence.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DigestResponse {
    /// Canonical serialization that was hashed.
    pub canonical: String,
    /// Root hash to commit.
    #[schema(value_type = String)]
    pub digest: Hash256,
    /// EIP-191 message digest of the root; the value a holder signs.
    #[schema(value_type = String)]
    pub message_digest: Hash256,
    /// Encoding used.
    #[schema(value_type = String)]
    pub encoding: ClaimEncoding,
    /// Digest algorithm used.
    #[schema(value_type = String)]
    pub algorithm: DigestAlgorithm,
}

/// Compute the canonical bytes, root, and message digest of claims.
#[utoipa::path(
    post,
    path = "/v1/claims/digest",
    request_body = DigestRequest,
    responses(
        (status = 200, description = "Claim digest", body = DigestResponse),
        (status = 422, description = "Malformed request", body = crate::error::ErrorBody),
    ),
    tag = "claims"
)]
pub async fn digest_claims(
    State(state): State<AppState>,
    body: Result<Json<DigestRequest>, JsonRejection>,
) -> Result<Json<DigestResponse>, AppError> {
    let req = extract_json(body)?;
    let config = state.registry.config();
    let claims: Vec<IdentityClaim> = req.claims.into_iter().map(Into::into).collect();

    let canonical = config
        .encoding
        .canonicalize(&claims)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let root = erc7231_core::digest(&canonical, config.algorithm);

    Ok(Json(DigestResponse {
        canonical: canonical.as_str().to_string(),
        digest: root,
        message_digest: state.registry.message_for(&root),
        encoding: config.encoding,
        algorithm: config.algorithm,
    }))
}
