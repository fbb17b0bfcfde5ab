//! # Identities Root Routes
//!
//! Commitment and verification of a token's identities root.
//!
//! - `PUT  /v1/tokens/{token_id}/identities-root` — Commit a root
//! - `GET  /v1/tokens/{token_id}/identities-root` — Read the committed root
//! - `POST /v1/tokens/{token_id}/verify`          — Verify a binding
//!
//! A write carries no caller field. The caller is the address recovered
//! from `signature` over `set_root_digest(token_id, nonce, root)`, so only a
//! key that controls the token can commit a root. `nonce` must equal the
//! token's current write nonce (0 before the first write, then reported by
//! the GET), which makes every
//! write authorization single-use. The binding signature given to
//! verifiers is over a different digest and cannot be used to write.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use erc7231_core::{Address, Hash256, IdentityClaim, TokenId};
use erc7231_crypto::RecoverableSignature;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, parse_path, Validate};
use crate::routes::claims::ClaimBody;
use crate::state::AppState;

/// Assemble the identities-root router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/tokens/{token_id}/identities-root",
            get(get_identities_root).put(set_identities_root),
        )
        .route("/v1/tokens/{token_id}/verify", post(verify_binding))
}

/// Request to commit an identities root.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetRootRequest {
    /// The root hash, 0x-hex.
    #[schema(value_type = String)]
    pub root: Hash256,
    /// The token's current write nonce.
    pub nonce: u64,
    /// 65-byte `r || s || v` signature over the write digest of
    /// `(token_id, nonce, root)`.
    #[schema(value_type = String)]
    pub signature: RecoverableSignature,
}

/// A token's committed root.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RootResponse {
    /// Token id as a decimal string.
    #[schema(value_type = String)]
    pub token_id: TokenId,
    /// The committed root.
    #[schema(value_type = String)]
    pub root: Hash256,
    /// Nonce the next write must be authorized for.
    pub nonce: u64,
}

/// Request to verify a binding.
///
/// Exactly one of `user_ids` or `claims` must be present. With `claims` the
/// service also recomputes the root from the claim records.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyRequest {
    /// Address claiming control of the token.
    #[schema(value_type = String)]
    pub claimant: Address,
    /// User ids of the claims, in order.
    #[serde(default)]
    pub user_ids: Option<Vec<String>>,
    /// Full claim records, in order.
    #[serde(default)]
    pub claims: Option<Vec<ClaimBody>>,
    /// Root the claimant asserts is committed.
    #[schema(value_type = String)]
    pub root: Hash256,
    /// Claimant's signature over the message digest of `root`.
    #[schema(value_type = String)]
    pub signature: RecoverableSignature,
}

impl Validate for VerifyRequest {
    fn validate(&self) -> Result<(), String> {
        match (&self.user_ids, &self.claims) {
            (Some(_), Some(_)) => Err("supply either user_ids or claims, not both".into()),
            (None, None) => Err("one of user_ids or claims is required".into()),
            _ => Ok(()),
        }
    }
}

/// Verification outcome.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyResponse {
    /// Whether the binding holds.
    pub valid: bool,
}

/// Commit an identities root for a token.
#[utoipa::path(
    put,
    path = "/v1/tokens/{token_id}/identities-root",
    params(
        ("token_id" = String, Path, description = "Token id, decimal or 0x-hex")
    ),
    request_body = SetRootRequest,
    responses(
        (status = 200, description = "Root committed", body = RootResponse),
        (status = 403, description = "Signer does not control the token", body = crate::error::ErrorBody),
        (status = 409, description = "Nonce is not the current write nonce", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed request or signature", body = crate::error::ErrorBody),
    ),
    tag = "identities"
)]
pub async fn set_identities_root(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    body: Result<Json<SetRootRequest>, JsonRejection>,
) -> Result<Json<RootResponse>, AppError> {
    let token_id: TokenId = parse_path("token_id", &raw)?;
    let req = extract_json(body)?;

    let caller = state.registry.set_identities_root_signed(
        &token_id,
        req.root,
        req.nonce,
        &req.signature,
    )?;
    tracing::info!(%token_id, %caller, nonce = req.nonce, "identities root committed");
    Ok(Json(RootResponse {
        token_id,
        root: req.root,
        nonce: state.registry.write_nonce(&token_id),
    }))
}

/// Read a token's committed identities root.
#[utoipa::path(
    get,
    path = "/v1/tokens/{token_id}/identities-root",
    params(
        ("token_id" = String, Path, description = "Token id, decimal or 0x-hex")
    ),
    responses(
        (status = 200, description = "Committed root", body = RootResponse),
        (status = 404, description = "No root committed", body = crate::error::ErrorBody),
    ),
    tag = "identities"
)]
pub async fn get_identities_root(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<RootResponse>, AppError> {
    let token_id: TokenId = parse_path("token_id", &raw)?;
    let root = state
        .registry
        .get_identities_root(&token_id)
        .ok_or_else(|| AppError::NotFound(format!("no identities root for token {token_id}")))?;
    Ok(Json(RootResponse {
        token_id,
        root,
        nonce: state.registry.write_nonce(&token_id),
    }))
}

/// Verify that a claimant's signed claims are bound to a token.
///
/// Always answers 200 with `valid: false` when the binding does not hold;
/// the reason is not disclosed.
#[utoipa::path(
    post,
    path = "/v1/tokens/{token_id}/verify",
    params(
        ("token_id" = String, Path, description = "Token id, decimal or 0x-hex")
    ),
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verification outcome", body = VerifyResponse),
        (status = 422, description = "Malformed request", body = crate::error::ErrorBody),
    ),
    tag = "identities"
)]
pub async fn verify_binding(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, AppError> {
    let token_id: TokenId = parse_path("token_id", &raw)?;
    let req = extract_validated_json(body)?;

    let valid = match (req.user_ids, req.claims) {
        (Some(ids), _) => state.registry.verify_identities_binding(
            &token_id,
            &req.claimant,
            &ids,
            &req.root,
            &req.signature,
        ),
        (None, Some(claims)) => {
            let claims: Vec<IdentityClaim> = claims.into_iter().map(Into::into).collect();
            state.registry.verify_claims_binding(
                &token_id,
                &req.claimant,
                &claims,
                &req.root,
                &req.signature,
            )
        }
        (None, None) => false,
    };
    Ok(Json(VerifyResponse { valid }))
}
