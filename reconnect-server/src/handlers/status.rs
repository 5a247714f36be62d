//! Administrative status transition handler
//!
//! Explicit status changes (notably author cancellation) through the same
//! lifecycle graph as the event-driven path: status never regresses,
//! terminal states absorb, and completing requires both signatures.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::WriteGuard;
use reconnect_core::AgreementStatus;

use super::agreements::AgreementResponse;

/// Request body for a status transition.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StatusRequest {
    /// Target status: `pending`, `signed`, `completed` or `cancelled`
    #[schema(example = "cancelled")]
    pub status: String,
}

/// Transition an agreement's status
///
/// Cancellation is author-only and only from an open status. Completing
/// requires both signatures to be present and seals the integrity tag.
#[utoipa::path(
    put,
    path = "/agreements/{id}/status",
    tag = "Agreements",
    params(("id" = String, Path, description = "Agreement ID")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Status changed", body = AgreementResponse),
        (status = 400, description = "Unknown status value"),
        (status = 403, description = "Caller may not perform this transition"),
        (status = 404, description = "Unknown agreement ID"),
        (status = 409, description = "Transition not allowed from the current status"),
    )
)]
pub async fn status_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<AgreementResponse>, ApiError> {
    let target: AgreementStatus = request
        .status
        .parse()
        .map_err(|e: String| ApiError::validation(e))?;

    let mut agreement = state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("agreement {id} not found")))?;

    let observed_status = agreement.status;
    agreement.set_status(&auth.user, target, Utc::now())?;

    let stored = state
        .store
        .update_guarded(agreement, observed_status, WriteGuard::StatusOnly)
        .await?;

    tracing::info!(
        agreement_id = %stored.id,
        actor = %auth.user.id,
        status = %stored.status,
        "status transition applied"
    );
    Ok(Json(stored.into()))
}
