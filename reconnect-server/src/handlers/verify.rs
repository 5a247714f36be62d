//! Verification handlers
//!
//! Answers "is this agreement authentic?" for any holder of an agreement ID
//! or a decoded QR payload. The stored record is fetched and its integrity
//! tag recomputed from the currently stored fields; the four outcomes
//! (`NOT_FOUND`, `INCOMPLETE`, `HASH_MISMATCH`, valid) are distinguishable
//! so callers can tell absence from tampering.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use reconnect_core::{verify, Agreement, VerificationOutcome, VerificationPayload};

use super::agreements::AgreementResponse;

/// Response for verification requests.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// Whether the agreement is authentic
    #[schema(example = true)]
    pub valid: bool,
    /// Failure kind when not valid: `NOT_FOUND`, `INCOMPLETE` or
    /// `HASH_MISMATCH`
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "HASH_MISMATCH")]
    pub reason: Option<&'static str>,
    /// The verified agreement, attached on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement: Option<AgreementResponse>,
}

impl VerifyResponse {
    fn not_found() -> Self {
        Self {
            valid: false,
            reason: Some("NOT_FOUND"),
            agreement: None,
        }
    }

    fn from_outcome(outcome: VerificationOutcome, agreement: Agreement) -> Self {
        match outcome {
            VerificationOutcome::Valid => Self {
                valid: true,
                reason: None,
                agreement: Some(agreement.into()),
            },
            VerificationOutcome::Incomplete => Self {
                valid: false,
                reason: Some("INCOMPLETE"),
                agreement: None,
            },
            VerificationOutcome::HashMismatch { .. } => Self {
                valid: false,
                reason: Some("HASH_MISMATCH"),
                agreement: None,
            },
        }
    }
}

/// Verify an agreement by ID
///
/// Recomputes the integrity tag from the currently stored fields and
/// compares it to the sealed one. Public: any holder of the ID may verify.
#[utoipa::path(
    get,
    path = "/agreements/{id}/verify",
    tag = "Verification",
    params(("id" = String, Path, description = "Agreement ID")),
    responses(
        (status = 200, description = "Verification completed", body = VerifyResponse),
    )
)]
pub async fn verify_agreement_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let Some(agreement) = state.store.find_by_id(id).await? else {
        return Ok(Json(VerifyResponse::not_found()));
    };

    let outcome = verify::check(&agreement);
    Ok(Json(VerifyResponse::from_outcome(outcome, agreement)))
}

/// Verify a decoded QR payload
///
/// Accepts the JSON payload decoded from a document's QR code, checks the
/// stored record it names, and additionally compares the payload's embedded
/// tag against the sealed one to catch hand-edited payloads.
#[utoipa::path(
    post,
    path = "/verify",
    tag = "Verification",
    request_body(content_type = "application/json", description = "QR verification payload"),
    responses(
        (status = 200, description = "Verification completed", body = VerifyResponse),
        (status = 400, description = "Payload is not well-formed"),
    )
)]
pub async fn verify_payload_handler(
    State(state): State<AppState>,
    Json(raw): Json<serde_json::Value>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let payload = VerificationPayload::decode(&raw.to_string())?;

    let id: Uuid = payload
        .agreement_id
        .parse()
        .map_err(|_| ApiError::validation("agreementId is not a UUID"))?;

    let Some(agreement) = state.store.find_by_id(id).await? else {
        return Ok(Json(VerifyResponse::not_found()));
    };

    let outcome = verify::check_payload(&agreement, &payload);
    Ok(Json(VerifyResponse::from_outcome(outcome, agreement)))
}
