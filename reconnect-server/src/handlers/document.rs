//! Document issuance handler
//!
//! Renders the printable PDF artifact for an agreement. The QR verification
//! block is embedded only when the agreement is completed; rendering fails
//! atomically, so no partial file is ever served.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;
use reconnect_core::render_document;

/// Issue the PDF document for an agreement
///
/// Only participants may export. The response is the PDF named
/// `reconnect_<yyyyMMddHHmmss>_<coupleId>.pdf`.
#[utoipa::path(
    get,
    path = "/agreements/{id}/document",
    tag = "Documents",
    params(("id" = String, Path, description = "Agreement ID")),
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf"),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Unknown agreement ID"),
        (status = 500, description = "Rendering failed; no file produced"),
    )
)]
pub async fn document_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let agreement = state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("agreement {id} not found")))?;

    if agreement.party_of(auth.user.id).is_none() {
        return Err(ApiError::forbidden("not a participant of this agreement"));
    }

    let fonts = state
        .fonts
        .as_ref()
        .ok_or_else(|| ApiError::Render("no usable document font configured".into()))?;

    let rendered = render_document(
        &agreement,
        &state.config.verification_base_url,
        Utc::now(),
        fonts,
    )?;

    tracing::info!(
        agreement_id = %agreement.id,
        file = %rendered.file_name,
        bytes = rendered.pdf.len(),
        "document issued"
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", rendered.file_name),
            ),
        ],
        rendered.pdf,
    )
        .into_response())
}
