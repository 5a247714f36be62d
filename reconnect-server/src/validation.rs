//! Submission validation module
//!
//! Rejects malformed create/sign submissions before any storage call is
//! made. These are the checks the client UI performs before enabling its
//! submit control; the server repeats them because the transport is not
//! trusted to.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::ApiError;
use crate::handlers::SignatureInput;

/// Maximum title length in characters
pub const MAX_TITLE_CHARS: usize = 200;

/// Maximum content/condition length in characters
pub const MAX_BODY_CHARS: usize = 4000;

/// Maximum encoded signature image size (base64 characters, ~1.5 MB raw)
pub const MAX_SIGNATURE_B64_LEN: usize = 2 * 1024 * 1024;

/// Validates a required text field: present, non-blank, within budget.
pub fn validate_text(name: &str, value: &str, max_chars: usize) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{name} is required")));
    }
    let chars = value.chars().count();
    if chars > max_chars {
        return Err(ApiError::validation(format!(
            "{name} is too long: {chars} characters exceeds maximum of {max_chars}"
        )));
    }
    Ok(())
}

/// Validates a submitted signature: image and hash both present, image is
/// valid base64 within the size budget.
///
/// An empty capture never reaches the wire (accepting it is a no-op client
/// side), so an empty image or hash here is a validation failure.
pub fn validate_signature(signature: &SignatureInput) -> Result<(), ApiError> {
    if signature.image.is_empty() || signature.hash.is_empty() {
        return Err(ApiError::validation("signature is required"));
    }
    if signature.image.len() > MAX_SIGNATURE_B64_LEN {
        return Err(ApiError::validation(format!(
            "signature image exceeds maximum of {MAX_SIGNATURE_B64_LEN} encoded bytes"
        )));
    }
    if BASE64.decode(&signature.image).is_err() {
        return Err(ApiError::validation("signature image is not valid base64"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn signature(image: &str, hash: &str) -> SignatureInput {
        SignatureInput {
            image: image.to_string(),
            hash: hash.to_string(),
            signed_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_blank_text_rejected() {
        assert!(validate_text("title", "", MAX_TITLE_CHARS).is_err());
        assert!(validate_text("title", "   ", MAX_TITLE_CHARS).is_err());
        assert!(validate_text("title", "Weekly check-in", MAX_TITLE_CHARS).is_ok());
    }

    #[test]
    fn test_overlong_text_rejected() {
        let long = "x".repeat(MAX_TITLE_CHARS + 1);
        assert!(validate_text("title", &long, MAX_TITLE_CHARS).is_err());
    }

    #[test]
    fn test_char_budget_is_characters_not_bytes() {
        // Multibyte text within the character budget passes.
        let hangul = "약".repeat(MAX_TITLE_CHARS);
        assert!(validate_text("title", &hangul, MAX_TITLE_CHARS).is_ok());
    }

    #[test]
    fn test_empty_signature_rejected() {
        assert!(validate_signature(&signature("", "")).is_err());
        assert!(validate_signature(&signature("aW5r", "")).is_err());
        assert!(validate_signature(&signature("", "abc")).is_err());
    }

    #[test]
    fn test_invalid_base64_rejected() {
        assert!(validate_signature(&signature("not base64!!!", "abc")).is_err());
    }

    #[test]
    fn test_valid_signature_passes() {
        assert!(validate_signature(&signature("aW5r", "1a2b")).is_ok());
    }
}
