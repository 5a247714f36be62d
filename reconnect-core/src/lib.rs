//! Reconnect Core - agreement lifecycle and integrity verification
//!
//! This crate provides the engine behind Reconnect's couple agreements:
//! two parties co-author a short textual agreement, sign it by hand, and can
//! later prove that this exact wording with these exact signatures existed
//! at a specific time and has not been altered.
//!
//! # Features
//!
//! - Agreement lifecycle state machine (`pending` → `signed` → `completed`,
//!   with author-only cancellation) sealing an integrity tag exactly once
//! - Deterministic 32-bit rolling content hash, reproduced bit-for-bit for
//!   interoperability with previously issued documents
//! - Handwritten signature capture with margin-insensitive encoding
//! - QR verification payload codec with a round-trip guarantee
//! - Fixed-layout A4 document rendering to PDF (feature `render`)
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use uuid::Uuid;
//! use reconnect_core::{
//!     Actor, Agreement, CreateAgreement, Point, SignaturePad, VerificationPayload,
//! };
//!
//! # fn example() -> reconnect_core::Result<()> {
//! let author = Actor::new(Uuid::new_v4(), "Jiwoo");
//! let partner = Actor::new(Uuid::new_v4(), "Minjun");
//!
//! // Author draws a signature and creates the agreement.
//! let mut pad = SignaturePad::default();
//! pad.begin_stroke(Point { x: 40.0, y: 60.0 });
//! pad.extend_stroke(Point { x: 180.0, y: 90.0 });
//! let now = Utc::now();
//! let captured = pad.accept(now)?;
//!
//! let mut agreement = Agreement::create(
//!     CreateAgreement {
//!         title: "Weekly check-in".into(),
//!         content: "Share feelings every Sunday".into(),
//!         condition: "Write an apology note".into(),
//!         author,
//!         partner: partner.clone(),
//!         couple_id: Uuid::new_v4(),
//!         author_signature: captured.into_record(now).expect("ink present"),
//!     },
//!     now,
//! )?;
//!
//! // Partner signs; the agreement completes and is sealed.
//! let mut partner_pad = SignaturePad::default();
//! partner_pad.begin_stroke(Point { x: 30.0, y: 30.0 });
//! partner_pad.extend_stroke(Point { x: 200.0, y: 110.0 });
//! let signed_at = Utc::now();
//! let partner_sig = partner_pad.accept(signed_at)?.into_record(signed_at).expect("ink present");
//! agreement.sign(&partner, partner_sig)?;
//!
//! // Anyone holding the record can re-verify it.
//! assert!(reconnect_core::verify::check(&agreement).is_valid());
//! let payload = VerificationPayload::for_agreement(&agreement, "https://reconnect.example", Utc::now())?;
//! assert_eq!(VerificationPayload::decode(&payload.encode()?)?, payload);
//! # Ok(())
//! # }
//! ```

pub mod agreement;
pub mod error;
pub mod hash;
pub mod payload;
pub mod verify;

#[cfg(feature = "render")]
pub mod render;
#[cfg(feature = "render")]
pub mod signature;

// Re-export main types for convenience
pub use agreement::{
    Actor, Agreement, AgreementStatus, CreateAgreement, Party, Signature,
};
pub use error::{CoreError, Result};
pub use hash::IntegrityAlgorithm;
pub use payload::{VerificationPayload, PLATFORM};
pub use verify::VerificationOutcome;

#[cfg(feature = "render")]
pub use error::RenderError;
#[cfg(feature = "render")]
pub use render::{document_file_name, render_document, FontSet, RenderedDocument};
#[cfg(feature = "render")]
pub use signature::{CapturedSignature, Point, SignaturePad, Surface};
