//! Agreement record and lifecycle state machine.
//!
//! The lifecycle graph:
//!
//! ```text
//! (none) --create--> pending
//! pending --partner signs--> completed (author signature present)
//!                            signed    (author signature absent)
//! signed  --remaining party signs--> completed
//! pending|signed --author cancels--> cancelled
//! ```
//!
//! Entering `completed` seals the agreement hash exactly once. Status never
//! regresses; `completed` and `cancelled` absorb every further event with a
//! typed rejection rather than a silent no-op. Identity is injected per call
//! so the machine stays pure and independently testable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::hash;

/// Lifecycle status of an agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgreementStatus {
    Pending,
    /// At least one of the two signatures is present but not both. The value
    /// deliberately does not record which side signed; callers infer it from
    /// the populated signature field via [`Agreement::awaiting`].
    Signed,
    Completed,
    Cancelled,
}

impl AgreementStatus {
    /// Whether any further lifecycle event is accepted in this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Signed => "signed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for AgreementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgreementStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "signed" => Ok(Self::Signed),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown agreement status '{other}'")),
        }
    }
}

/// One of the two parties to an agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Author,
    Partner,
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Author => f.write_str("author"),
            Self::Partner => f.write_str("partner"),
        }
    }
}

/// The identity performing an operation, injected per call by the caller
/// (the surrounding product supplies authentication).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
}

impl Actor {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A stored handwritten signature: the raster image (base64 PNG), its
/// capture hash, and when it was applied. Write-once per party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// Base64-encoded PNG of the cropped ink.
    pub image: String,
    /// Capture-event tag: hashes the image bytes together with the capture
    /// timestamp, so pixel-identical ink captured at different instants
    /// tags differently.
    pub hash: String,
    pub signed_at: DateTime<Utc>,
}

/// Fields supplied by the author at creation time.
#[derive(Debug, Clone)]
pub struct CreateAgreement {
    pub title: String,
    pub content: String,
    pub condition: String,
    pub author: Actor,
    pub partner: Actor,
    pub couple_id: Uuid,
    pub author_signature: Signature,
}

/// The central record: a two-party text commitment plus signatures and
/// verification metadata.
///
/// `title`, `content` and `condition` are immutable once the record exists.
/// `agreement_hash` and `sealed_at` are set exactly when the record reaches
/// `completed` and never recomputed afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agreement {
    pub id: Uuid,
    pub couple_id: Uuid,
    pub author_id: Uuid,
    pub partner_id: Uuid,
    pub author_name: String,
    pub partner_name: String,
    pub title: String,
    pub content: String,
    /// The "what happens if unmet" clause.
    pub condition: String,
    pub author_signature: Option<Signature>,
    pub partner_signature: Option<Signature>,
    pub status: AgreementStatus,
    pub agreement_hash: Option<String>,
    pub sealed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agreement {
    /// Create a new agreement. The author supplies the text fields together
    /// with their own signature; the record starts in `pending`.
    pub fn create(input: CreateAgreement, now: DateTime<Utc>) -> Result<Self> {
        if input.author.id == input.partner.id {
            return Err(CoreError::SameParty);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            couple_id: input.couple_id,
            author_id: input.author.id,
            partner_id: input.partner.id,
            author_name: input.author.name,
            partner_name: input.partner.name,
            title: input.title,
            content: input.content,
            condition: input.condition,
            author_signature: Some(input.author_signature),
            partner_signature: None,
            status: AgreementStatus::Pending,
            agreement_hash: None,
            sealed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Which party `actor` is, if a participant at all.
    pub fn party_of(&self, actor_id: Uuid) -> Option<Party> {
        if actor_id == self.author_id {
            Some(Party::Author)
        } else if actor_id == self.partner_id {
            Some(Party::Partner)
        } else {
            None
        }
    }

    fn signature_of(&self, party: Party) -> &Option<Signature> {
        match party {
            Party::Author => &self.author_signature,
            Party::Partner => &self.partner_signature,
        }
    }

    /// The party whose signature is still missing, while the agreement is
    /// open. This is the inference the ambiguous `signed` status forces:
    /// the status value alone does not say which side signed.
    pub fn awaiting(&self) -> Option<Party> {
        if self.status.is_terminal() {
            return None;
        }
        if self.author_signature.is_none() {
            Some(Party::Author)
        } else if self.partner_signature.is_none() {
            Some(Party::Partner)
        } else {
            None
        }
    }

    /// Apply `actor`'s signature.
    ///
    /// Guards: the agreement must be open, the actor must be a participant,
    /// and that party's signature must currently be absent (write-once).
    /// When the second signature lands the agreement moves to `completed`
    /// and is sealed with the signing instant.
    pub fn sign(&mut self, actor: &Actor, signature: Signature) -> Result<()> {
        if self.status.is_terminal() {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                action: "sign",
            });
        }

        let party = self
            .party_of(actor.id)
            .ok_or(CoreError::NotParticipant(actor.id))?;

        if self.signature_of(party).is_some() {
            return Err(CoreError::AlreadySigned { party });
        }

        let signed_at = signature.signed_at;
        match party {
            Party::Author => self.author_signature = Some(signature),
            Party::Partner => self.partner_signature = Some(signature),
        }
        self.updated_at = signed_at;

        if self.author_signature.is_some() && self.partner_signature.is_some() {
            self.seal(signed_at)?;
            self.status = AgreementStatus::Completed;
            tracing::info!(agreement_id = %self.id, %party, "agreement completed and sealed");
        } else {
            self.status = AgreementStatus::Signed;
            tracing::info!(agreement_id = %self.id, %party, "agreement signed, awaiting other party");
        }

        Ok(())
    }

    /// Cancel the agreement. Only the author, and only while it is open.
    pub fn cancel(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                action: "cancel",
            });
        }
        if actor.id != self.author_id {
            return Err(CoreError::NotAuthor { action: "cancel" });
        }

        self.status = AgreementStatus::Cancelled;
        self.updated_at = now;
        tracing::info!(agreement_id = %self.id, "agreement cancelled");
        Ok(())
    }

    /// Administrative status transition. Honors the same lifecycle graph as
    /// the event-driven path: no regression, terminal states absorb, and
    /// moving to `completed` requires both signatures and seals the record.
    pub fn set_status(
        &mut self,
        actor: &Actor,
        new_status: AgreementStatus,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.party_of(actor.id).is_none() {
            return Err(CoreError::NotParticipant(actor.id));
        }
        if self.status.is_terminal() || new_status == self.status {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                action: "change status of",
            });
        }

        match new_status {
            AgreementStatus::Pending => Err(CoreError::InvalidTransition {
                from: self.status,
                action: "regress",
            }),
            AgreementStatus::Signed => {
                // Only meaningful as pending -> signed, when one side has
                // actually signed.
                if self.status != AgreementStatus::Pending || self.awaiting().is_none() {
                    return Err(CoreError::InvalidTransition {
                        from: self.status,
                        action: "mark signed",
                    });
                }
                self.status = AgreementStatus::Signed;
                self.updated_at = now;
                Ok(())
            }
            AgreementStatus::Completed => {
                if self.author_signature.is_none() {
                    return Err(CoreError::MissingSignature {
                        party: Party::Author,
                    });
                }
                if self.partner_signature.is_none() {
                    return Err(CoreError::MissingSignature {
                        party: Party::Partner,
                    });
                }
                self.seal(now)?;
                self.status = AgreementStatus::Completed;
                self.updated_at = now;
                tracing::info!(agreement_id = %self.id, "agreement completed via status transition");
                Ok(())
            }
            AgreementStatus::Cancelled => self.cancel(actor, now),
        }
    }

    /// The canonical string the agreement hash is computed over, for the
    /// given sealing instant.
    pub fn seal_input(&self, sealed_at: DateTime<Utc>) -> String {
        hash::seal_input(
            &self.title,
            &self.content,
            &self.author_name,
            &self.partner_name,
            &hash::format_seal_timestamp(sealed_at),
        )
    }

    /// Compute and store the agreement hash. Happens exactly once, on the
    /// transition into `completed`.
    fn seal(&mut self, at: DateTime<Utc>) -> Result<()> {
        if self.agreement_hash.is_some() {
            return Err(CoreError::AlreadySealed);
        }
        self.agreement_hash = Some(hash::hash(&self.seal_input(at)));
        self.sealed_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn author() -> Actor {
        Actor::new(
            Uuid::parse_str("6f2b0c5e-0000-4000-8000-000000000001").unwrap(),
            "Jiwoo",
        )
    }

    fn partner() -> Actor {
        Actor::new(
            Uuid::parse_str("6f2b0c5e-0000-4000-8000-000000000002").unwrap(),
            "Minjun",
        )
    }

    fn outsider() -> Actor {
        Actor::new(
            Uuid::parse_str("6f2b0c5e-0000-4000-8000-00000000000f").unwrap(),
            "Nobody",
        )
    }

    fn sig(tag: &str) -> Signature {
        Signature {
            image: format!("cGlnbWVudC17dGFnfQ=={tag}"),
            hash: tag.to_string(),
            signed_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn pending_agreement() -> Agreement {
        Agreement::create(
            CreateAgreement {
                title: "Weekly check-in".into(),
                content: "Share feelings every Sunday".into(),
                condition: "Write an apology note".into(),
                author: author(),
                partner: partner(),
                couple_id: Uuid::new_v4(),
                author_signature: sig("a1"),
            },
            Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_create_starts_pending_with_author_signature() {
        let a = pending_agreement();
        assert_eq!(a.status, AgreementStatus::Pending);
        assert!(a.author_signature.is_some());
        assert!(a.partner_signature.is_none());
        assert!(a.agreement_hash.is_none());
        assert_eq!(a.awaiting(), Some(Party::Partner));
    }

    #[test]
    fn test_create_rejects_self_partnering() {
        let err = Agreement::create(
            CreateAgreement {
                title: "t".into(),
                content: "c".into(),
                condition: "x".into(),
                author: author(),
                partner: author(),
                couple_id: Uuid::new_v4(),
                author_signature: sig("a1"),
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::SameParty));
    }

    #[test]
    fn test_partner_sign_completes_and_seals() {
        let mut a = pending_agreement();
        a.sign(&partner(), sig("p1")).unwrap();

        assert_eq!(a.status, AgreementStatus::Completed);
        assert!(a.agreement_hash.is_some());
        assert_eq!(a.sealed_at, Some(sig("p1").signed_at));
        assert_eq!(a.awaiting(), None);

        // Sealed hash matches a recomputation over current fields.
        let expected = crate::hash::hash(&a.seal_input(a.sealed_at.unwrap()));
        assert_eq!(a.agreement_hash.as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn test_double_sign_rejected_not_ignored() {
        let mut a = pending_agreement();
        a.sign(&partner(), sig("p1")).unwrap();

        let err = a.sign(&partner(), sig("p2")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_author_resign_rejected_write_once() {
        let mut a = pending_agreement();
        let err = a.sign(&author(), sig("a2")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::AlreadySigned {
                party: Party::Author
            }
        ));
        // Original signature untouched.
        assert_eq!(a.author_signature.as_ref().unwrap().hash, "a1");
    }

    #[test]
    fn test_outsider_cannot_sign() {
        let mut a = pending_agreement();
        let err = a.sign(&outsider(), sig("x")).unwrap_err();
        assert!(matches!(err, CoreError::NotParticipant(_)));
    }

    #[test]
    fn test_only_author_cancels() {
        let mut a = pending_agreement();
        let err = a.cancel(&partner(), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::NotAuthor { .. }));

        a.cancel(&author(), Utc::now()).unwrap();
        assert_eq!(a.status, AgreementStatus::Cancelled);
    }

    #[test]
    fn test_terminal_states_absorb_all_events() {
        let mut a = pending_agreement();
        a.cancel(&author(), Utc::now()).unwrap();

        assert!(a.sign(&partner(), sig("p1")).is_err());
        assert!(a.cancel(&author(), Utc::now()).is_err());
        assert!(a
            .set_status(&author(), AgreementStatus::Pending, Utc::now())
            .is_err());
        assert_eq!(a.status, AgreementStatus::Cancelled);
    }

    #[test]
    fn test_no_regression_from_completed() {
        let mut a = pending_agreement();
        a.sign(&partner(), sig("p1")).unwrap();
        let sealed = a.agreement_hash.clone();

        for target in [
            AgreementStatus::Pending,
            AgreementStatus::Signed,
            AgreementStatus::Completed,
            AgreementStatus::Cancelled,
        ] {
            assert!(a.set_status(&author(), target, Utc::now()).is_err());
        }
        // Seal untouched by the rejected attempts.
        assert_eq!(a.agreement_hash, sealed);
        assert_eq!(a.status, AgreementStatus::Completed);
    }

    #[test]
    fn test_administrative_complete_requires_both_signatures() {
        let mut a = pending_agreement();
        let err = a
            .set_status(&author(), AgreementStatus::Completed, Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::MissingSignature {
                party: Party::Partner
            }
        ));
        assert!(a.agreement_hash.is_none());
    }

    #[test]
    fn test_administrative_complete_seals_once() {
        let mut a = pending_agreement();
        a.partner_signature = Some(sig("p1"));
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
        a.set_status(&author(), AgreementStatus::Completed, now)
            .unwrap();
        assert_eq!(a.status, AgreementStatus::Completed);
        assert_eq!(a.sealed_at, Some(now));
        assert!(a.agreement_hash.is_some());
    }

    #[test]
    fn test_status_serde_wire_values() {
        assert_eq!(
            serde_json::to_string(&AgreementStatus::Pending).unwrap(),
            "\"pending\""
        );
        let s: AgreementStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(s, AgreementStatus::Cancelled);
    }
}
