//! Reconnect Server Library - REST API components for couple agreements
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;

pub use auth::AuthenticatedUser;
pub use config::Config;
pub use error::ApiError;
pub use handlers::{
    AgreementResponse, CreateAgreementRequest, SignRequest, SignatureInput, SignatureView,
    StatusRequest, VerifyResponse,
};
pub use openapi::ApiDoc;
pub use routes::{create_router, create_router_with_config};
pub use state::AppState;
pub use store::{
    AgreementStore, MemoryAgreementStore, PostgresAgreementStore, StoreError, WriteGuard,
};
