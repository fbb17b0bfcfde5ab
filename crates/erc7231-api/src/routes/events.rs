//! # Audit Log Routes
//!
//! - `GET /v1/events?token_id=` — Recorded `SetIdentitiesRoot` events, in
//!   emission order, optionally filtered to one token

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use erc7231_core::{Hash256, TokenId};
use erc7231_registry::{AuditEntry, RegistryEvent};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::extractors::{extract_query, parse_path};
use crate::state::AppState;

/// Assemble the audit log router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/events", get(list_events))
}

/// Query parameters for event listing.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventsQuery {
    /// Only events for this token (decimal or 0x-hex).
    pub token_id: Option<String>,
}

/// One audit log entry.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    /// Position in the log, from 1.
    pub sequence: u64,
    /// When the event was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Event name.
    pub event: String,
    /// The token.
    #[schema(value_type = String)]
    pub token_id: TokenId,
    /// The root set by this event.
    #[schema(value_type = String)]
    pub root: Hash256,
}

impl From<AuditEntry> for EventResponse {
    fn from(entry: AuditEntry) -> Self {
        match entry.event {
            RegistryEvent::SetIdentitiesRoot { token_id, root } => Self {
                sequence: entry.sequence,
                recorded_at: entry.recorded_at,
                event: "SetIdentitiesRoot".to_string(),
                token_id,
                root,
            },
        }
    }
}

/// List recorded registry events.
#[utoipa::path(
    get,
    path = "/v1/events",
    params(EventsQuery),
    responses(
        (status = 200, description = "Audit log entries", body = Vec<EventResponse>),
        (status = 422, description = "Malformed token id", body = crate::error::ErrorBody),
    ),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    query: Result<Query<EventsQuery>, QueryRejection>,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let query = extract_query(query)?;
    let entries = match query.token_id {
        Some(raw) => {
            let token_id: TokenId = parse_path("token_id", &raw)?;
            state.audit_log.entries_for(&token_id)
        }
        None => state.audit_log.entries(),
    };
    Ok(Json(entries.into_iter().map(EventResponse::from).collect()))
}
