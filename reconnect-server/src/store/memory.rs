//! In-memory agreement store.
//!
//! Development fallback used when `DATABASE_URL` is not set, and the
//! backend integration tests run against. Mirrors the PostgreSQL store's
//! guarded-update semantics under a per-entry lock.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use reconnect_core::{Agreement, AgreementStatus};

use super::{AgreementStore, StoreError, WriteGuard};

/// DashMap-backed store; the entry lock makes each guarded update atomic.
#[derive(Default)]
pub struct MemoryAgreementStore {
    agreements: DashMap<Uuid, Agreement>,
}

impl MemoryAgreementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a record bypassing every guard. Exists so tests can model
    /// storage-level tampering; nothing in the serving path calls this.
    pub fn overwrite_unchecked(&self, agreement: Agreement) {
        self.agreements.insert(agreement.id, agreement);
    }
}

#[async_trait]
impl AgreementStore for MemoryAgreementStore {
    async fn create(&self, agreement: Agreement) -> Result<Agreement, StoreError> {
        self.agreements.insert(agreement.id, agreement.clone());
        tracing::debug!(agreement_id = %agreement.id, "agreement stored (memory)");
        Ok(agreement)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Agreement>, StoreError> {
        Ok(self.agreements.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Agreement>, StoreError> {
        let mut matches: Vec<Agreement> = self
            .agreements
            .iter()
            .filter(|entry| entry.author_id == user_id || entry.partner_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    async fn update_guarded(
        &self,
        updated: Agreement,
        expected_status: AgreementStatus,
        guard: WriteGuard,
    ) -> Result<Agreement, StoreError> {
        let mut entry = self
            .agreements
            .get_mut(&updated.id)
            .ok_or(StoreError::NotFound(updated.id))?;

        if entry.status != expected_status {
            return Err(StoreError::Conflict(format!(
                "agreement {} is {}, expected {}",
                updated.id, entry.status, expected_status
            )));
        }

        let slot_taken = match guard {
            WriteGuard::StatusOnly => false,
            WriteGuard::AuthorUnsigned => entry.author_signature.is_some(),
            WriteGuard::PartnerUnsigned => entry.partner_signature.is_some(),
        };
        if slot_taken {
            return Err(StoreError::Conflict(format!(
                "agreement {} signature slot already written",
                updated.id
            )));
        }

        *entry = updated.clone();
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use reconnect_core::{Actor, CreateAgreement, Signature};

    fn sig(tag: &str) -> Signature {
        Signature {
            image: "aW5r".into(),
            hash: tag.into(),
            signed_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn seeded() -> (MemoryAgreementStore, Agreement, Actor) {
        let store = MemoryAgreementStore::new();
        let author = Actor::new(Uuid::new_v4(), "A");
        let partner = Actor::new(Uuid::new_v4(), "B");
        let agreement = Agreement::create(
            CreateAgreement {
                title: "t".into(),
                content: "c".into(),
                condition: "x".into(),
                author,
                partner: partner.clone(),
                couple_id: Uuid::new_v4(),
                author_signature: sig("a1"),
            },
            Utc::now(),
        )
        .unwrap();
        (store, agreement, partner)
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let (store, agreement, _) = seeded();
        store.create(agreement.clone()).await.unwrap();
        let found = store.find_by_id(agreement.id).await.unwrap().unwrap();
        assert_eq!(found, agreement);
    }

    #[tokio::test]
    async fn test_list_covers_both_roles() {
        let (store, agreement, partner) = seeded();
        store.create(agreement.clone()).await.unwrap();

        assert_eq!(store.list_for_user(agreement.author_id).await.unwrap().len(), 1);
        assert_eq!(store.list_for_user(partner.id).await.unwrap().len(), 1);
        assert!(store.list_for_user(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guarded_update_rejects_stale_status() {
        let (store, mut agreement, partner) = seeded();
        store.create(agreement.clone()).await.unwrap();

        // First writer wins.
        let mut first = agreement.clone();
        first.sign(&partner, sig("p1")).unwrap();
        store
            .update_guarded(first, AgreementStatus::Pending, WriteGuard::PartnerUnsigned)
            .await
            .unwrap();

        // Second writer raced on the same precondition and must fail.
        agreement.sign(&partner, sig("p2")).unwrap();
        let err = store
            .update_guarded(agreement, AgreementStatus::Pending, WriteGuard::PartnerUnsigned)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_guarded_update_protects_written_signature_slot() {
        let (store, agreement, partner) = seeded();
        store.create(agreement.clone()).await.unwrap();

        let mut signed = agreement.clone();
        signed.sign(&partner, sig("p1")).unwrap();
        store
            .update_guarded(
                signed.clone(),
                AgreementStatus::Pending,
                WriteGuard::PartnerUnsigned,
            )
            .await
            .unwrap();

        // Same expected status lie, but the slot is taken now.
        let err = store
            .update_guarded(signed, AgreementStatus::Completed, WriteGuard::PartnerUnsigned)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let (store, agreement, _) = seeded();
        let err = store
            .update_guarded(agreement, AgreementStatus::Pending, WriteGuard::StatusOnly)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
