//! Request identity module
//!
//! Authentication and the couple relationship live outside this service;
//! an upstream gateway authenticates the user and injects the resolved
//! identity as request headers. The [`AuthenticatedUser`] extractor reads
//! them once per request so handlers receive explicit identities instead of
//! consulting ambient state.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;
use reconnect_core::Actor;

/// Gateway-injected identity headers.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const PARTNER_ID_HEADER: &str = "x-partner-id";
pub const PARTNER_NAME_HEADER: &str = "x-partner-name";
pub const COUPLE_ID_HEADER: &str = "x-couple-id";

/// The authenticated caller plus their linked partner and couple.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: Actor,
    pub partner: Actor,
    pub couple_id: Uuid,
}

fn header_string(parts: &Parts, name: &'static str) -> Result<String, ApiError> {
    let value = parts
        .headers
        .get(name)
        .ok_or_else(|| ApiError::unauthorized(format!("missing {name} header")))?;
    let value = value
        .to_str()
        .map_err(|_| ApiError::unauthorized(format!("invalid {name} header")))?;
    if value.is_empty() {
        return Err(ApiError::unauthorized(format!("empty {name} header")));
    }
    Ok(value.to_string())
}

fn header_uuid(parts: &Parts, name: &'static str) -> Result<Uuid, ApiError> {
    header_string(parts, name)?
        .parse()
        .map_err(|_| ApiError::unauthorized(format!("{name} is not a UUID")))
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let user = Actor::new(
            header_uuid(parts, USER_ID_HEADER)?,
            header_string(parts, USER_NAME_HEADER)?,
        );
        let partner = Actor::new(
            header_uuid(parts, PARTNER_ID_HEADER)?,
            header_string(parts, PARTNER_NAME_HEADER)?,
        );
        let couple_id = header_uuid(parts, COUPLE_ID_HEADER)?;

        if user.id == partner.id {
            return Err(ApiError::unauthorized(
                "identity headers name the same user twice",
            ));
        }

        Ok(Self {
            user,
            partner,
            couple_id,
        })
    }
}
