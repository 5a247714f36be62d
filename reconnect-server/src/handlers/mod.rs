//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod agreements;
pub mod document;
pub mod health;
pub mod sign;
pub mod status;
pub mod verify;

pub use crate::state::AppState;
pub use agreements::{
    create_agreement_handler, get_agreement_handler, list_my_agreements_handler,
    AgreementResponse, CreateAgreementRequest, SignatureInput, SignatureView,
};
pub use document::document_handler;
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use sign::{sign_handler, SignRequest};
pub use status::{status_handler, StatusRequest};
pub use verify::{verify_agreement_handler, verify_payload_handler, VerifyResponse};
