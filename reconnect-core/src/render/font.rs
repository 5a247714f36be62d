//! Font resolution for document rendering.
//!
//! Fonts are loaded from an explicit path, the `RECONNECT_FONT` environment
//! variable, or a list of well-known system locations. Document text
//! includes user-supplied Korean, so CJK-capable faces are preferred when
//! present.

use std::path::{Path, PathBuf};

use ab_glyph::FontVec;

use crate::error::RenderError;

/// Environment variable naming a TTF/OTF file to render with.
pub const FONT_ENV: &str = "RECONNECT_FONT";

/// System font locations tried in order when nothing is configured.
const CANDIDATES: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/noto/NotoSansKR-Regular.ttf",
    "/usr/share/fonts/truetype/nanum/NanumGothic.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial Unicode.ttf",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
];

/// The face a document is measured and painted with. Measuring and painting
/// must use the same set; the compose step resolves it once.
#[derive(Debug)]
pub struct FontSet {
    regular: FontVec,
}

impl FontSet {
    /// Load from an explicit path, falling back to `RECONNECT_FONT` and the
    /// well-known candidates.
    pub fn load(explicit: Option<&Path>) -> Result<Self, RenderError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var(FONT_ENV) {
            return Self::from_file(Path::new(&path));
        }
        for candidate in CANDIDATES {
            let path = PathBuf::from(candidate);
            if !path.is_file() {
                continue;
            }
            // Keep trying further candidates on parse failures (e.g. a
            // collection file ab_glyph cannot load directly).
            match Self::from_file(&path) {
                Ok(fonts) => return Ok(fonts),
                Err(e) => tracing::debug!(path = %path.display(), error = %e, "skipping font candidate"),
            }
        }
        Err(RenderError::FontUnavailable(format!(
            "no font configured and no usable candidate present; set {FONT_ENV}"
        )))
    }

    fn from_file(path: &Path) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path).map_err(|e| {
            RenderError::FontUnavailable(format!("{}: {e}", path.display()))
        })?;
        Self::from_bytes(bytes)
    }

    /// Load a face from raw TTF/OTF bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, RenderError> {
        let regular = FontVec::try_from_vec(bytes)
            .map_err(|e| RenderError::FontUnavailable(format!("invalid font data: {e}")))?;
        Ok(Self { regular })
    }

    pub fn regular(&self) -> &FontVec {
        &self.regular
    }
}
