//! Agreement storage module
//!
//! Provides persistence for agreement records behind one trait:
//! - **PostgreSQL** (production): conditional updates enforce the lifecycle
//!   preconditions at the storage layer.
//! - **In-memory** (development/tests): used when `DATABASE_URL` is not set;
//!   records are lost on restart.
//!
//! Signature fields are write-once at this layer too: an update that would
//! overwrite a present signature loses the compare-and-set and surfaces as
//! a conflict, never as an overwrite.

mod memory;
mod postgres;

pub use memory::MemoryAgreementStore;
pub use postgres::PostgresAgreementStore;

use async_trait::async_trait;
use uuid::Uuid;

use reconnect_core::{Agreement, AgreementStatus};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("agreement {0} not found")]
    NotFound(Uuid),

    /// The record's status advanced past the caller's expected precondition,
    /// or a write-once field already holds a value.
    #[error("concurrent update: {0}")]
    Conflict(String),

    #[error("database connection error: {0}")]
    Connection(String),

    #[error("database migration error: {0}")]
    Migration(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

/// Additional precondition for a guarded update, beyond the expected status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteGuard {
    /// Status check only (cancellation, administrative transitions).
    StatusOnly,
    /// The author's signature slot must still be empty.
    AuthorUnsigned,
    /// The partner's signature slot must still be empty.
    PartnerUnsigned,
}

/// Agreement storage backend.
#[async_trait]
pub trait AgreementStore: Send + Sync {
    /// Persist a freshly created agreement.
    async fn create(&self, agreement: Agreement) -> Result<Agreement, StoreError>;

    /// Fetch a single agreement.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Agreement>, StoreError>;

    /// All agreements where `user_id` is author or partner, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Agreement>, StoreError>;

    /// Persist `updated` iff the stored record still has `expected_status`
    /// and satisfies `guard`. The losing writer of a race observes
    /// [`StoreError::Conflict`]; sealed state is never overwritten.
    async fn update_guarded(
        &self,
        updated: Agreement,
        expected_status: AgreementStatus,
        guard: WriteGuard,
    ) -> Result<Agreement, StoreError>;
}
