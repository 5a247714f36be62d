//! Handwritten signature capture.
//!
//! Turns a stream of freehand stroke segments on a bounded drawing surface
//! into a stable artifact: a PNG of the ink cropped to its bounding box,
//! plus a capture-event hash. Cropping before encoding means two visually
//! identical signatures drawn with different amounts of blank border encode
//! to the same bytes. The capture timestamp is folded into the hash, so the
//! hash tags the capture event rather than the ink alone.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::error::{RenderError, Result};
use crate::hash;

/// Ink stroke radius in surface pixels. Fixed for all captures so the
/// bounding-box crop is reproducible.
const STROKE_RADIUS: i32 = 2;

/// Padding around the ink bounding box, in surface pixels.
const CROP_PAD: u32 = 4;

const INK: Rgba<u8> = Rgba([17, 24, 39, 255]);
const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A point on the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// The fixed-size drawing surface signatures are captured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            width: 640,
            height: 240,
        }
    }
}

/// Result of accepting a capture: the encoded image and its hash, or the
/// empty pair when no ink was drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedSignature {
    /// PNG bytes of the cropped ink; empty when nothing was drawn.
    pub image: Vec<u8>,
    /// Capture-event hash; empty when nothing was drawn.
    pub hash: String,
}

impl CapturedSignature {
    pub fn empty() -> Self {
        Self {
            image: Vec::new(),
            hash: String::new(),
        }
    }

    /// Whether this capture carries any ink. Accepting an empty capture is
    /// a no-op for the caller: nothing to persist.
    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }

    /// The image as the base64 string stored on agreement records.
    pub fn image_base64(&self) -> String {
        BASE64.encode(&self.image)
    }

    /// Convert into the record form applied to an agreement, stamped with
    /// the signing instant. Returns `None` for an empty capture.
    pub fn into_record(self, signed_at: DateTime<Utc>) -> Option<crate::agreement::Signature> {
        if self.is_empty() {
            return None;
        }
        Some(crate::agreement::Signature {
            image: BASE64.encode(&self.image),
            hash: self.hash,
            signed_at,
        })
    }
}

/// Accumulates freehand strokes on a bounded surface.
///
/// Points outside the surface are clamped to its edge; given the bounded
/// surface contract there is no malformed input, and no recoverable error
/// state beyond the empty-result case.
#[derive(Debug, Clone)]
pub struct SignaturePad {
    surface: Surface,
    strokes: Vec<Vec<Point>>,
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self::new(Surface::default())
    }
}

impl SignaturePad {
    pub fn new(surface: Surface) -> Self {
        Self {
            surface,
            strokes: Vec::new(),
        }
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    /// Start a new stroke at `p`.
    pub fn begin_stroke(&mut self, p: Point) {
        self.strokes.push(vec![self.clamp(p)]);
    }

    /// Extend the current stroke to `p`. Starts a stroke if none is open.
    pub fn extend_stroke(&mut self, p: Point) {
        let p = self.clamp(p);
        match self.strokes.last_mut() {
            Some(stroke) => stroke.push(p),
            None => self.strokes.push(vec![p]),
        }
    }

    /// Discard all ink.
    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    /// Whether any ink has been drawn.
    pub fn has_ink(&self) -> bool {
        self.strokes.iter().any(|s| !s.is_empty())
    }

    fn clamp(&self, p: Point) -> Point {
        Point {
            x: p.x.clamp(0.0, (self.surface.width.saturating_sub(1)) as f32),
            y: p.y.clamp(0.0, (self.surface.height.saturating_sub(1)) as f32),
        }
    }

    /// Bounding box of the ink in surface coordinates, padded by the stroke
    /// radius and crop margin, clamped to the surface. `None` without ink.
    fn ink_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;

        for p in self.strokes.iter().flatten() {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        if !min_x.is_finite() {
            return None;
        }

        let pad = CROP_PAD + STROKE_RADIUS as u32;
        let x0 = (min_x.floor() as u32).saturating_sub(pad);
        let y0 = (min_y.floor() as u32).saturating_sub(pad);
        let x1 = ((max_x.ceil() as u32) + pad + 1).min(self.surface.width);
        let y1 = ((max_y.ceil() as u32) + pad + 1).min(self.surface.height);
        Some((x0, y0, x1, y1))
    }

    /// Accept the capture: rasterize the ink cropped to its bounding box,
    /// encode as PNG, and tag the capture event.
    ///
    /// With no ink this returns the empty pair and the caller must not
    /// mutate any stored state. `captured_at` is injected by the caller and
    /// becomes part of the hash input, so two pixel-identical captures at
    /// different instants tag differently.
    pub fn accept(&self, captured_at: DateTime<Utc>) -> Result<CapturedSignature> {
        let Some((x0, y0, x1, y1)) = self.ink_bounds() else {
            return Ok(CapturedSignature::empty());
        };

        let width = x1 - x0;
        let height = y1 - y0;
        let mut canvas = RgbaImage::from_pixel(width, height, PAPER);

        for stroke in &self.strokes {
            let shifted: Vec<(f32, f32)> = stroke
                .iter()
                .map(|p| (p.x - x0 as f32, p.y - y0 as f32))
                .collect();

            for point in &shifted {
                draw_filled_circle_mut(
                    &mut canvas,
                    (point.0.round() as i32, point.1.round() as i32),
                    STROKE_RADIUS,
                    INK,
                );
            }
            for pair in shifted.windows(2) {
                draw_line_segment_mut(&mut canvas, pair[0], pair[1], INK);
            }
        }

        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(canvas)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| RenderError::ImageEncode(e.to_string()))?;

        let hash_input = format!("{}{}", BASE64.encode(&png), captured_at.to_rfc3339());
        let hash = hash::hash(&hash_input);

        Ok(CapturedSignature { image: png, hash })
    }
}
