//! Verification payload codec.
//!
//! The payload is what a document's QR code encodes: enough to re-derive
//! and compare the agreement hash without the issuing system. Serialized as
//! a single JSON string; the QR bit-encoding itself (error correction,
//! module size) is delegated to the `qrcode` crate.
//!
//! Round-trip law: `decode(encode(p)) == p` for every well-formed payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agreement::{Agreement, AgreementStatus};
use crate::error::{CoreError, Result};
use crate::hash;

/// Constant identifying the issuing system.
pub const PLATFORM: &str = "reconnect";

/// The structured data encoded into a QR code, enabling offline
/// re-verification. All fields are required for a payload to be considered
/// well-formed except the two signature hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationPayload {
    pub agreement_id: String,
    pub title: String,
    /// Human-readable agreement date, KST-formatted.
    pub date: String,
    pub author_name: String,
    pub partner_name: String,
    pub agreement_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_signature_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_signature_hash: Option<String>,
    /// Canonical location to re-verify this agreement.
    pub verification_url: String,
    /// ISO-8601 payload-build time (not the agreement time).
    pub timestamp: String,
    pub platform: String,
}

impl VerificationPayload {
    /// Build the payload for a completed agreement.
    ///
    /// `issued_at` is the payload-build instant, injected by the caller.
    /// Building a payload for an agreement that is not completed is refused:
    /// it would advertise an unverifiable document.
    pub fn for_agreement(
        agreement: &Agreement,
        verification_base_url: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<Self> {
        if agreement.status != AgreementStatus::Completed {
            return Err(CoreError::InvalidTransition {
                from: agreement.status,
                action: "build a verification payload for",
            });
        }
        let agreement_hash = agreement
            .agreement_hash
            .clone()
            .ok_or(CoreError::SealMissing)?;
        let sealed_at = agreement.sealed_at.ok_or(CoreError::SealMissing)?;

        Ok(Self {
            agreement_id: agreement.id.to_string(),
            title: agreement.title.clone(),
            date: hash::format_kst_date(sealed_at),
            author_name: agreement.author_name.clone(),
            partner_name: agreement.partner_name.clone(),
            agreement_hash,
            author_signature_hash: agreement.author_signature.as_ref().map(|s| s.hash.clone()),
            partner_signature_hash: agreement.partner_signature.as_ref().map(|s| s.hash.clone()),
            verification_url: format!(
                "{}/verify/{}",
                verification_base_url.trim_end_matches('/'),
                agreement.id
            ),
            timestamp: issued_at.to_rfc3339(),
            platform: PLATFORM.to_string(),
        })
    }

    /// Serialize to the single string a QR code encodes.
    pub fn encode(&self) -> Result<String> {
        self.validate()?;
        serde_json::to_string(self).map_err(|e| CoreError::SerializationError(e.to_string()))
    }

    /// Parse a payload back from its QR string form, rejecting anything
    /// that is not well-formed.
    pub fn decode(input: &str) -> Result<Self> {
        let payload: Self = serde_json::from_str(input)
            .map_err(|e| CoreError::MalformedPayload(e.to_string()))?;
        payload.validate()?;
        Ok(payload)
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("agreementId", &self.agreement_id),
            ("title", &self.title),
            ("date", &self.date),
            ("authorName", &self.author_name),
            ("partnerName", &self.partner_name),
            ("agreementHash", &self.agreement_hash),
            ("verificationUrl", &self.verification_url),
            ("timestamp", &self.timestamp),
            ("platform", &self.platform),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(CoreError::MalformedPayload(format!(
                    "required field '{name}' is empty"
                )));
            }
        }
        Ok(())
    }

    /// Render the encoded payload as a QR module image (dark modules black,
    /// one pixel per module plus quiet zone). Scaling to the final document
    /// size is the renderer's job.
    #[cfg(feature = "render")]
    pub fn to_qr_image(&self) -> Result<image::GrayImage> {
        use crate::error::RenderError;

        let encoded = self.encode()?;
        let code = qrcode::QrCode::new(encoded.as_bytes())
            .map_err(|e| RenderError::Qr(e.to_string()))?;
        Ok(code
            .render::<image::Luma<u8>>()
            .module_dimensions(1, 1)
            .quiet_zone(true)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VerificationPayload {
        VerificationPayload {
            agreement_id: "5f64a0c8-4a6a-4f7b-9a0e-6a4f1a2b3c4d".into(),
            title: "Weekly check-in".into(),
            date: "2026.03.01".into(),
            author_name: "Jiwoo".into(),
            partner_name: "Minjun".into(),
            agreement_hash: "1a2b3c4d".into(),
            author_signature_hash: Some("a1".into()),
            partner_signature_hash: Some("p1".into()),
            verification_url: "https://reconnect.example/verify/5f64a0c8".into(),
            timestamp: "2026-03-01T12:00:00+00:00".into(),
            platform: PLATFORM.into(),
        }
    }

    #[test]
    fn test_round_trip() {
        let payload = sample();
        let encoded = payload.encode().unwrap();
        let decoded = VerificationPayload::decode(&encoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_round_trip_without_signature_hashes() {
        let mut payload = sample();
        payload.author_signature_hash = None;
        payload.partner_signature_hash = None;

        let encoded = payload.encode().unwrap();
        // Optional fields are omitted from the wire form entirely.
        assert!(!encoded.contains("authorSignatureHash"));
        let decoded = VerificationPayload::decode(&encoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_wire_field_names_are_camel_case() {
        let encoded = sample().encode().unwrap();
        for field in [
            "agreementId",
            "authorName",
            "partnerName",
            "agreementHash",
            "verificationUrl",
        ] {
            assert!(encoded.contains(field), "missing {field}");
        }
    }

    #[test]
    fn test_decode_rejects_missing_required_field() {
        let mut value: serde_json::Value =
            serde_json::from_str(&sample().encode().unwrap()).unwrap();
        value.as_object_mut().unwrap().remove("agreementHash");
        let err = VerificationPayload::decode(&value.to_string()).unwrap_err();
        assert!(matches!(err, CoreError::MalformedPayload(_)));
    }

    #[test]
    fn test_decode_rejects_empty_required_field() {
        let mut payload = sample();
        payload.title = String::new();
        let raw = serde_json::to_string(&payload).unwrap();
        let err = VerificationPayload::decode(&raw).unwrap_err();
        assert!(matches!(err, CoreError::MalformedPayload(_)));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(VerificationPayload::decode("not a payload").is_err());
    }

    #[cfg(feature = "render")]
    #[test]
    fn test_qr_image_has_quiet_zone() {
        let qr = sample().to_qr_image().unwrap();
        assert!(qr.width() > 21);
        // Quiet zone: corners are light.
        assert_eq!(qr.get_pixel(0, 0).0[0], 255);
    }
}
