//! Agreement authenticity checking.
//!
//! The check re-derives the integrity tag from the *currently stored*
//! fields and compares it to the sealed value. Recomputation, not a
//! stored-vs-stored comparison, is what makes the check meaningful: a
//! record altered after sealing recomputes to a different tag.

use serde::{Deserialize, Serialize};

use crate::agreement::{Agreement, AgreementStatus};
use crate::hash;
use crate::payload::VerificationPayload;

/// Outcome of checking a stored agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationOutcome {
    /// The recomputed tag matches the sealed one.
    Valid,
    /// The agreement exists but has not reached `completed`; there is no
    /// sealed tag to check against.
    Incomplete,
    /// The recomputed tag disagrees with the sealed one: the stored record
    /// was altered after sealing, or a storage/transcription bug occurred.
    HashMismatch { expected: String, recomputed: String },
}

impl VerificationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Check a stored agreement by recomputing its tag from current fields.
pub fn check(agreement: &Agreement) -> VerificationOutcome {
    if agreement.status != AgreementStatus::Completed {
        return VerificationOutcome::Incomplete;
    }

    // A completed record always carries its seal; a missing seal means the
    // record is corrupt, which reads as a mismatch, not absence.
    let (Some(expected), Some(sealed_at)) = (&agreement.agreement_hash, agreement.sealed_at)
    else {
        tracing::warn!(agreement_id = %agreement.id, "completed agreement missing seal fields");
        return VerificationOutcome::HashMismatch {
            expected: agreement.agreement_hash.clone().unwrap_or_default(),
            recomputed: String::new(),
        };
    };

    let recomputed = hash::hash(&agreement.seal_input(sealed_at));
    if &recomputed == expected {
        VerificationOutcome::Valid
    } else {
        tracing::warn!(
            agreement_id = %agreement.id,
            expected,
            recomputed,
            "agreement hash mismatch"
        );
        VerificationOutcome::HashMismatch {
            expected: expected.clone(),
            recomputed,
        }
    }
}

/// Check a decoded QR payload against the stored agreement it names.
///
/// The stored record is authoritative: the record is checked first, then the
/// payload's embedded tag is compared against the sealed one, catching
/// hand-edited payloads over an intact record.
pub fn check_payload(agreement: &Agreement, payload: &VerificationPayload) -> VerificationOutcome {
    let outcome = check(agreement);
    if !outcome.is_valid() {
        return outcome;
    }

    match &agreement.agreement_hash {
        Some(sealed) if *sealed == payload.agreement_hash => VerificationOutcome::Valid,
        Some(sealed) => VerificationOutcome::HashMismatch {
            expected: sealed.clone(),
            recomputed: payload.agreement_hash.clone(),
        },
        None => VerificationOutcome::Incomplete,
    }
}
