//! PostgreSQL implementation of the agreement store.
//!
//! Lifecycle preconditions are enforced in SQL: guarded updates are
//! conditional on the current status (and, for signing, on the signature
//! column still being NULL), so the losing writer of a race gets zero rows
//! back and a conflict, never an overwrite of sealed state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use reconnect_core::{Agreement, AgreementStatus, Signature};

use super::{AgreementStore, StoreError, WriteGuard};

/// PostgreSQL-backed agreement store.
#[derive(Clone)]
pub struct PostgresAgreementStore {
    pool: PgPool,
}

/// Row type for database queries.
#[derive(FromRow)]
struct AgreementRow {
    id: Uuid,
    couple_id: Uuid,
    author_id: Uuid,
    partner_id: Uuid,
    author_name: String,
    partner_name: String,
    title: String,
    content: String,
    condition: String,
    author_signature: Option<serde_json::Value>,
    partner_signature: Option<serde_json::Value>,
    status: String,
    agreement_hash: Option<String>,
    sealed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn signature_from_json(
    value: Option<serde_json::Value>,
    column: &str,
) -> Result<Option<Signature>, StoreError> {
    value
        .map(|v| serde_json::from_value(v))
        .transpose()
        .map_err(|e| StoreError::Corrupt(format!("{column}: {e}")))
}

fn signature_to_json(
    signature: &Option<Signature>,
    column: &str,
) -> Result<Option<serde_json::Value>, StoreError> {
    signature
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| StoreError::Corrupt(format!("{column}: {e}")))
}

impl TryFrom<AgreementRow> for Agreement {
    type Error = StoreError;

    fn try_from(row: AgreementRow) -> Result<Self, StoreError> {
        let status: AgreementStatus = row
            .status
            .parse()
            .map_err(|e: String| StoreError::Corrupt(e))?;
        Ok(Self {
            id: row.id,
            couple_id: row.couple_id,
            author_id: row.author_id,
            partner_id: row.partner_id,
            author_name: row.author_name,
            partner_name: row.partner_name,
            title: row.title,
            content: row.content,
            condition: row.condition,
            author_signature: signature_from_json(row.author_signature, "author_signature")?,
            partner_signature: signature_from_json(row.partner_signature, "partner_signature")?,
            status,
            agreement_hash: row.agreement_hash,
            sealed_at: row.sealed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl PostgresAgreementStore {
    /// Connect with the given database URL and pool bounds.
    ///
    /// Runs migrations automatically on connection.
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        tracing::info!("agreement store connected and migrations applied");

        Ok(Self { pool })
    }

    /// Create a store from an existing pool (for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgreementStore for PostgresAgreementStore {
    async fn create(&self, agreement: Agreement) -> Result<Agreement, StoreError> {
        let row = sqlx::query_as::<_, AgreementRow>(
            r#"
            INSERT INTO agreements (
                id, couple_id, author_id, partner_id, author_name, partner_name,
                title, content, condition, author_signature, partner_signature,
                status, agreement_hash, sealed_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(agreement.id)
        .bind(agreement.couple_id)
        .bind(agreement.author_id)
        .bind(agreement.partner_id)
        .bind(&agreement.author_name)
        .bind(&agreement.partner_name)
        .bind(&agreement.title)
        .bind(&agreement.content)
        .bind(&agreement.condition)
        .bind(signature_to_json(&agreement.author_signature, "author_signature")?)
        .bind(signature_to_json(&agreement.partner_signature, "partner_signature")?)
        .bind(agreement.status.as_str())
        .bind(&agreement.agreement_hash)
        .bind(agreement.sealed_at)
        .bind(agreement.created_at)
        .bind(agreement.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        tracing::debug!(agreement_id = %agreement.id, "agreement stored");
        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Agreement>, StoreError> {
        sqlx::query_as::<_, AgreementRow>(
            r#"
            SELECT * FROM agreements WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?
        .map(Agreement::try_from)
        .transpose()
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Agreement>, StoreError> {
        let rows = sqlx::query_as::<_, AgreementRow>(
            r#"
            SELECT * FROM agreements
            WHERE author_id = $1 OR partner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        rows.into_iter().map(Agreement::try_from).collect()
    }

    async fn update_guarded(
        &self,
        updated: Agreement,
        expected_status: AgreementStatus,
        guard: WriteGuard,
    ) -> Result<Agreement, StoreError> {
        let guard_clause = match guard {
            WriteGuard::StatusOnly => "",
            WriteGuard::AuthorUnsigned => "AND author_signature IS NULL",
            WriteGuard::PartnerUnsigned => "AND partner_signature IS NULL",
        };
        let query = format!(
            r#"
            UPDATE agreements SET
                author_signature = $3,
                partner_signature = $4,
                status = $5,
                agreement_hash = $6,
                sealed_at = $7,
                updated_at = $8
            WHERE id = $1 AND status = $2 {guard_clause}
            RETURNING *
            "#
        );

        let row = sqlx::query_as::<_, AgreementRow>(&query)
            .bind(updated.id)
            .bind(expected_status.as_str())
            .bind(signature_to_json(&updated.author_signature, "author_signature")?)
            .bind(signature_to_json(&updated.partner_signature, "partner_signature")?)
            .bind(updated.status.as_str())
            .bind(&updated.agreement_hash)
            .bind(updated.sealed_at)
            .bind(updated.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        match row {
            Some(row) => row.try_into(),
            // Zero rows: either the record is gone, or the precondition no
            // longer holds. Distinguish for the caller.
            None => match self.find_by_id(updated.id).await? {
                Some(current) => Err(StoreError::Conflict(format!(
                    "agreement {} is {}, expected {}",
                    updated.id, current.status, expected_status
                ))),
                None => Err(StoreError::NotFound(updated.id)),
            },
        }
    }
}
