//! # Token Routes
//!
//! Minting and ownership lookups on the in-process token ledger.
//!
//! - `POST /v1/tokens`                  — Mint the token for an owner
//! - `GET  /v1/tokens/{token_id}/owner` — Owner of a token

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use erc7231_core::{Address, TokenId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_json, parse_path};
use crate::state::AppState;

/// Assemble the token router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/tokens", post(mint_token))
        .route("/v1/tokens/{token_id}/owner", get(get_owner))
}

/// Request to mint a token.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MintRequest {
    /// Owner address, 0x-hex.
    #[schema(value_type = String, example = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")]
    pub owner: Address,
}

/// A token and its owner.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenOwnerResponse {
    /// Token id as a decimal string.
    #[schema(value_type = String)]
    pub token_id: TokenId,
    /// EIP-55 checksummed owner address.
    #[schema(value_type = String)]
    pub owner: Address,
}

/// Mint the token for `owner`. The id is derived from the owner address.
#[utoipa::path(
    post,
    path = "/v1/tokens",
    request_body = MintRequest,
    responses(
        (status = 201, description = "Token minted", body = TokenOwnerResponse),
        (status = 409, description = "Owner already holds a token", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed request", body = crate::error::ErrorBody),
    ),
    tag = "tokens"
)]
pub async fn mint_token(
    State(state): State<AppState>,
    body: Result<Json<MintRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenOwnerResponse>), AppError> {
    let req = extract_json(body)?;
    let token_id = state.ledger.mint(req.owner)?;
    tracing::info!(%token_id, owner = %req.owner, "token minted");
    Ok((
        StatusCode::CREATED,
        Json(TokenOwnerResponse {
            token_id,
            owner: req.owner,
        }),
    ))
}

/// Look up the owner of a token.
#[utoipa::path(
    get,
    path = "/v1/tokens/{token_id}/owner",
    params(
        ("token_id" = String, Path, description = "Token id, decimal or 0x-hex")
    ),
    responses(
        (status = 200, description = "Token owner", body = TokenOwnerResponse),
        (status = 404, description = "Token not minted", body = crate::error::ErrorBody),
    ),
    tag = "tokens"
)]
pub async fn get_owner(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<TokenOwnerResponse>, AppError> {
    let token_id: TokenId = parse_path("token_id", &raw)?;
    let owner = state
        .ledger
        .owner_of(&token_id)
        .ok_or_else(|| AppError::NotFound(format!("token {token_id} not minted")))?;
    Ok(Json(TokenOwnerResponse { token_id, owner }))
}
