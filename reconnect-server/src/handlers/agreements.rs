//! Agreement CRUD handlers
//!
//! Creation plus the two read endpoints, and the response DTOs shared by
//! the other agreement handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{
    validate_signature, validate_text, MAX_BODY_CHARS, MAX_TITLE_CHARS,
};
use reconnect_core::{Agreement, CreateAgreement, Signature};

/// A signature as submitted over the wire.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInput {
    /// Base64-encoded PNG of the captured ink
    pub image: String,
    /// Capture-event hash produced at accept time
    #[schema(example = "1a2b3c4d")]
    pub hash: String,
    /// Capture instant; defaults to the server's receive time
    pub signed_at: Option<DateTime<Utc>>,
}

impl SignatureInput {
    pub fn into_signature(self, fallback: DateTime<Utc>) -> Signature {
        Signature {
            image: self.image,
            hash: self.hash,
            signed_at: self.signed_at.unwrap_or(fallback),
        }
    }
}

/// A stored signature in API responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignatureView {
    /// Base64-encoded PNG
    pub image: String,
    #[schema(example = "1a2b3c4d")]
    pub hash: String,
    #[schema(value_type = String, example = "2026-03-01T12:00:00Z")]
    pub signed_at: DateTime<Utc>,
}

impl From<Signature> for SignatureView {
    fn from(signature: Signature) -> Self {
        Self {
            image: signature.image,
            hash: signature.hash,
            signed_at: signature.signed_at,
        }
    }
}

/// Agreement response DTO for API responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgreementResponse {
    #[schema(value_type = String, example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(value_type = String)]
    pub couple_id: Uuid,
    #[schema(value_type = String)]
    pub author_id: Uuid,
    #[schema(value_type = String)]
    pub partner_id: Uuid,
    pub author_name: String,
    pub partner_name: String,
    pub title: String,
    pub content: String,
    pub condition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_signature: Option<SignatureView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_signature: Option<SignatureView>,
    /// `pending`, `signed`, `completed` or `cancelled`
    #[schema(example = "pending")]
    pub status: String,
    /// Sealed integrity tag; present exactly when status is `completed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub sealed_at: Option<DateTime<Utc>>,
    /// Which party still needs to sign, while the agreement is open
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "partner")]
    pub awaiting: Option<String>,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl From<Agreement> for AgreementResponse {
    fn from(agreement: Agreement) -> Self {
        let awaiting = agreement.awaiting().map(|p| p.to_string());
        Self {
            id: agreement.id,
            couple_id: agreement.couple_id,
            author_id: agreement.author_id,
            partner_id: agreement.partner_id,
            author_name: agreement.author_name,
            partner_name: agreement.partner_name,
            title: agreement.title,
            content: agreement.content,
            condition: agreement.condition,
            author_signature: agreement.author_signature.map(SignatureView::from),
            partner_signature: agreement.partner_signature.map(SignatureView::from),
            status: agreement.status.to_string(),
            agreement_hash: agreement.agreement_hash,
            sealed_at: agreement.sealed_at,
            awaiting,
            created_at: agreement.created_at,
            updated_at: agreement.updated_at,
        }
    }
}

/// Request body for creating an agreement.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgreementRequest {
    #[schema(example = "Weekly check-in")]
    pub title: String,
    #[schema(example = "Share feelings every Sunday")]
    pub content: String,
    /// What happens if the promise is not kept
    #[schema(example = "Write an apology note")]
    pub condition: String,
    /// Must name the caller's linked partner
    #[schema(value_type = String)]
    pub partner_id: Uuid,
    pub author_signature: SignatureInput,
    /// Defaults to the caller's couple
    #[schema(value_type = Option<String>)]
    pub couple_id: Option<Uuid>,
}

/// Create an agreement
///
/// The author supplies the text fields together with their own signature;
/// the record starts in `pending`, awaiting the partner's signature.
#[utoipa::path(
    post,
    path = "/agreements",
    tag = "Agreements",
    request_body = CreateAgreementRequest,
    responses(
        (status = 201, description = "Agreement created", body = AgreementResponse),
        (status = 400, description = "Missing or invalid field/signature"),
        (status = 401, description = "Missing identity context"),
    )
)]
pub async fn create_agreement_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(request): Json<CreateAgreementRequest>,
) -> Result<(StatusCode, Json<AgreementResponse>), ApiError> {
    validate_text("title", &request.title, MAX_TITLE_CHARS)?;
    validate_text("content", &request.content, MAX_BODY_CHARS)?;
    validate_text("condition", &request.condition, MAX_BODY_CHARS)?;
    validate_signature(&request.author_signature)?;

    if request.partner_id != auth.partner.id {
        return Err(ApiError::validation(
            "partnerId does not match the caller's linked partner",
        ));
    }

    let now = Utc::now();
    let agreement = Agreement::create(
        CreateAgreement {
            title: request.title,
            content: request.content,
            condition: request.condition,
            author: auth.user.clone(),
            partner: auth.partner,
            couple_id: request.couple_id.unwrap_or(auth.couple_id),
            author_signature: request.author_signature.into_signature(now),
        },
        now,
    )?;

    let stored = state.store.create(agreement).await?;
    tracing::info!(agreement_id = %stored.id, author_id = %auth.user.id, "agreement created");

    Ok((StatusCode::CREATED, Json(stored.into())))
}

/// List the caller's agreements
///
/// Returns every agreement where the caller is author or partner, newest
/// first.
#[utoipa::path(
    get,
    path = "/agreements/my",
    tag = "Agreements",
    responses(
        (status = 200, description = "Agreements for the caller", body = [AgreementResponse]),
        (status = 401, description = "Missing identity context"),
    )
)]
pub async fn list_my_agreements_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Vec<AgreementResponse>>, ApiError> {
    let agreements = state.store.list_for_user(auth.user.id).await?;
    Ok(Json(
        agreements.into_iter().map(AgreementResponse::from).collect(),
    ))
}

/// Fetch a single agreement
///
/// Only the two participants may read an agreement.
#[utoipa::path(
    get,
    path = "/agreements/{id}",
    tag = "Agreements",
    params(("id" = String, Path, description = "Agreement ID")),
    responses(
        (status = 200, description = "The agreement", body = AgreementResponse),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Unknown agreement ID"),
    )
)]
pub async fn get_agreement_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AgreementResponse>, ApiError> {
    let agreement = state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("agreement {id} not found")))?;

    if agreement.party_of(auth.user.id).is_none() {
        return Err(ApiError::forbidden("not a participant of this agreement"));
    }

    Ok(Json(agreement.into()))
}
