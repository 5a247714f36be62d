use thiserror::Error;

use crate::agreement::{AgreementStatus, Party};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid transition: cannot {action} an agreement in status {from}")]
    InvalidTransition {
        from: AgreementStatus,
        action: &'static str,
    },

    #[error("{party} has already signed; signatures are write-once")]
    AlreadySigned { party: Party },

    #[error("actor {0} is not a participant of this agreement")]
    NotParticipant(uuid::Uuid),

    #[error("only the author may {action} this agreement")]
    NotAuthor { action: &'static str },

    #[error("cannot complete: {party} has not signed yet")]
    MissingSignature { party: Party },

    #[error("author and partner must be different parties")]
    SameParty,

    #[error("agreement is already sealed")]
    AlreadySealed,

    #[error("completed agreement is missing its seal")]
    SealMissing,

    #[error("malformed verification payload: {0}")]
    MalformedPayload(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[cfg(feature = "render")]
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Rendering failures, kept separate so the export path can surface them
/// as a distinct category (failed export, no partial file).
#[cfg(feature = "render")]
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("no usable font found: {0}")]
    FontUnavailable(String),

    #[error("failed to decode embedded image: {0}")]
    ImageDecode(String),

    #[error("failed to encode image: {0}")]
    ImageEncode(String),

    #[error("QR encoding failed: {0}")]
    Qr(String),

    #[error("PDF assembly failed: {0}")]
    Pdf(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
