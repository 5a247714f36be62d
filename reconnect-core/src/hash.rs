//! Content integrity tagging.
//!
//! The operative tag is a 32-bit rolling hash over UTF-16 code units,
//! reproduced bit-for-bit so documents issued by earlier releases keep
//! verifying. It detects accidental mutation only; it does not resist
//! deliberate forgery. Deployments that need real tamper resistance can
//! select the SHA3-256 variant, which keeps the same `&str -> String`
//! interface over the same canonical field concatenation.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

/// Seal timestamps are rendered in Korea Standard Time (UTC+9).
const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Compute the rolling integrity tag for `input`.
///
/// For each UTF-16 code unit `u`: `h = (h << 5) - h + u`, wrapped to a
/// 32-bit signed integer. The result is the lowercase hexadecimal of the
/// absolute value. Identical input yields identical output on every
/// platform, for the lifetime of the system.
pub fn hash(input: &str) -> String {
    let mut h: i32 = 0;
    for unit in input.encode_utf16() {
        h = h
            .wrapping_shl(5)
            .wrapping_sub(h)
            .wrapping_add(i32::from(unit));
    }
    // i32::MIN has no i32 absolute value; widen before taking it.
    format!("{:x}", (i64::from(h)).abs())
}

/// Tag algorithm selection.
///
/// `Rolling32` is what issued documents carry. `Sha3_256` is the
/// interface-compatible hardened variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityAlgorithm {
    #[default]
    Rolling32,
    Sha3_256,
}

impl IntegrityAlgorithm {
    /// Compute the tag for `input` with this algorithm.
    pub fn tag(&self, input: &str) -> String {
        match self {
            Self::Rolling32 => hash(input),
            Self::Sha3_256 => {
                let mut hasher = Sha3_256::new();
                hasher.update(input.as_bytes());
                hex::encode(hasher.finalize())
            }
        }
    }
}

/// Canonical concatenation sealed into an agreement hash.
///
/// The field order is part of the contract: changing it invalidates every
/// previously issued document.
pub fn seal_input(
    title: &str,
    content: &str,
    author_name: &str,
    partner_name: &str,
    formatted_timestamp: &str,
) -> String {
    let mut input = String::with_capacity(
        title.len() + content.len() + author_name.len() + partner_name.len()
            + formatted_timestamp.len(),
    );
    input.push_str(title);
    input.push_str(content);
    input.push_str(author_name);
    input.push_str(partner_name);
    input.push_str(formatted_timestamp);
    input
}

/// The KST offset used for all human-facing timestamps.
pub fn kst_offset() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).expect("KST offset is in range")
}

/// Render a sealing instant the way it is folded into the agreement hash:
/// `yyyy.MM.dd HH:mm` in KST.
pub fn format_seal_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&kst_offset())
        .format("%Y.%m.%d %H:%M")
        .to_string()
}

/// Render a date for human-readable display (payload `date` field):
/// `yyyy.MM.dd` in KST.
pub fn format_kst_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&kst_offset())
        .format("%Y.%m.%d")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_hash_is_deterministic() {
        let s = "Weekly check-in";
        assert_eq!(hash(s), hash(s));
    }

    #[test]
    fn test_hash_distinguishes_content() {
        assert_ne!(hash("A"), hash("B"));
    }

    #[test]
    fn test_hash_empty_input() {
        assert_eq!(hash(""), "0");
    }

    #[test]
    fn test_hash_known_values() {
        // h("a") = 97 = 0x61
        assert_eq!(hash("a"), "61");
        // h("ab") = 97*31 + 98 = 3105 = 0xc21
        assert_eq!(hash("ab"), "c21");
    }

    #[test]
    fn test_hash_wraps_and_stays_stable_on_long_input() {
        let long = "x".repeat(10_000);
        let tag = hash(&long);
        assert_eq!(tag, hash(&long));
        // Must fit a 32-bit magnitude after wrapping.
        assert!(i64::from_str_radix(&tag, 16).unwrap() <= i64::from(i32::MAX) + 1);
    }

    #[test]
    fn test_hash_handles_non_ascii() {
        // Hangul is BMP text; code units equal code points here.
        assert_eq!(hash("약속"), hash("약속"));
        assert_ne!(hash("약속"), hash("약조"));
    }

    #[test]
    fn test_sha3_variant_same_interface() {
        let rolling = IntegrityAlgorithm::Rolling32.tag("abc");
        let digest = IntegrityAlgorithm::Sha3_256.tag("abc");
        assert_eq!(rolling, hash("abc"));
        assert_eq!(digest.len(), 64);
        assert_ne!(rolling, digest);
    }

    #[test]
    fn test_seal_input_field_order() {
        let input = seal_input("t", "c", "a", "p", "2026.01.01 09:00");
        assert_eq!(input, "tcap2026.01.01 09:00");
    }

    #[test]
    fn test_seal_timestamp_is_kst() {
        // 2026-01-01T00:00:00Z is 09:00 on the same day in KST.
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_seal_timestamp(at), "2026.01.01 09:00");
        assert_eq!(format_kst_date(at), "2026.01.01");
    }
}
