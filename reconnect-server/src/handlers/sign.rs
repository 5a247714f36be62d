//! Signing handler
//!
//! Applies a party's one-time signature and advances the lifecycle. The
//! transition into `completed` is a compare-and-set against the storage
//! layer: both the status observed at read time and the emptiness of the
//! signature slot are preconditions, so a racing second writer fails with
//! a conflict instead of overwriting sealed state.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::validate_signature;
use reconnect_core::Party;

use super::agreements::{AgreementResponse, SignatureInput};
use crate::store::WriteGuard;

/// Request body for signing an agreement.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub signature: SignatureInput,
    /// Signing instant; defaults to the server's receive time
    #[schema(value_type = Option<String>, example = "2026-03-01T12:00:00Z")]
    pub signed_at: Option<DateTime<Utc>>,
}

/// Sign an agreement
///
/// The caller must be a participant whose signature is still absent. When
/// the second signature lands the agreement completes and its integrity
/// tag is sealed.
#[utoipa::path(
    put,
    path = "/agreements/{id}/sign",
    tag = "Agreements",
    params(("id" = String, Path, description = "Agreement ID")),
    request_body = SignRequest,
    responses(
        (status = 200, description = "Signature applied", body = AgreementResponse),
        (status = 400, description = "Missing or invalid signature"),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Unknown agreement ID"),
        (status = 409, description = "Already signed, or the agreement moved on"),
    )
)]
pub async fn sign_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SignRequest>,
) -> Result<Json<AgreementResponse>, ApiError> {
    validate_signature(&request.signature)?;

    let mut agreement = state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("agreement {id} not found")))?;

    let party = agreement
        .party_of(auth.user.id)
        .ok_or_else(|| ApiError::forbidden("not a participant of this agreement"))?;

    let observed_status = agreement.status;
    let signed_at = request.signed_at.unwrap_or_else(Utc::now);
    agreement.sign(&auth.user, request.signature.into_signature(signed_at))?;

    let guard = match party {
        Party::Author => WriteGuard::AuthorUnsigned,
        Party::Partner => WriteGuard::PartnerUnsigned,
    };
    let stored = state
        .store
        .update_guarded(agreement, observed_status, guard)
        .await?;

    tracing::info!(
        agreement_id = %stored.id,
        signer = %auth.user.id,
        status = %stored.status,
        "signature applied"
    );
    Ok(Json(stored.into()))
}
