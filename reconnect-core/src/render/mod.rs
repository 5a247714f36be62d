//! Fixed-layout document rendering.
//!
//! Produces the printable artifact for an agreement: an A4 page (794x1123
//! logical pixels, rasterized at 2x sampling) carrying the agreement text,
//! both signatures, and (only for a completed agreement) the QR
//! verification block and human-readable hash.
//!
//! Rendering is two explicit phases. [`compose`] decodes every embedded
//! image, resolves the font, measures and wraps all text, and positions
//! every block; anything that can fail fails here. [`ComposedDocument::rasterize`]
//! then paints the settled layout and cannot fail. There is no timed wait
//! between layout and paint.

pub mod font;

pub use font::{FontSet, FONT_ENV};

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use chrono::{DateTime, Utc};
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use uuid::Uuid;

use crate::agreement::{Agreement, AgreementStatus, Signature};
use crate::error::{RenderError, Result};
use crate::hash;
use crate::payload::VerificationPayload;

/// Logical page size: A4 at 96 dpi.
pub const PAGE_WIDTH: u32 = 794;
pub const PAGE_HEIGHT: u32 = 1123;
/// Raster sampling factor; the painted page is 1588x2246.
pub const SAMPLING: u32 = 2;

const MARGIN: i32 = 64;
const SIGNATURE_BOX_W: i32 = 300;
const SIGNATURE_BOX_H: i32 = 120;
const QR_SIZE: i32 = 150;

const TEXT: Rgba<u8> = Rgba([33, 37, 41, 255]);
const MUTED: Rgba<u8> = Rgba([108, 117, 125, 255]);
const RULE: Rgba<u8> = Rgba([206, 212, 218, 255]);
const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// File name for an issued document: `reconnect_<yyyyMMddHHmmss>_<coupleId>.pdf`.
pub fn document_file_name(issued_at: DateTime<Utc>, couple_id: Uuid) -> String {
    format!(
        "reconnect_{}_{}.pdf",
        issued_at
            .with_timezone(&hash::kst_offset())
            .format("%Y%m%d%H%M%S"),
        couple_id
    )
}

/// A positioned paint operation, in raster coordinates. Everything fallible
/// (decoding, measuring) already happened when one of these exists.
enum Block {
    Text {
        x: i32,
        y: i32,
        px: f32,
        color: Rgba<u8>,
        text: String,
    },
    FilledRect {
        x: i32,
        y: i32,
        w: u32,
        h: u32,
        color: Rgba<u8>,
    },
    OutlineRect {
        x: i32,
        y: i32,
        w: u32,
        h: u32,
        color: Rgba<u8>,
    },
    Bitmap {
        x: i64,
        y: i64,
        image: RgbaImage,
    },
}

/// A fully settled page layout: fonts resolved, images decoded and scaled,
/// text measured and wrapped, every block positioned.
pub struct ComposedDocument<'f> {
    fonts: &'f FontSet,
    blocks: Vec<Block>,
}

/// The finished artifact: PDF bytes plus the conventional file name.
pub struct RenderedDocument {
    pub pdf: Vec<u8>,
    pub file_name: String,
}

fn s(logical: i32) -> i32 {
    logical * SAMPLING as i32
}

fn spx(logical: f32) -> f32 {
    logical * SAMPLING as f32
}

fn text_width(font: &FontVec, px: f32, text: &str) -> f32 {
    let scaled = font.as_scaled(PxScale::from(px));
    let mut width = 0.0;
    let mut prev = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(p) = prev {
            width += scaled.kern(p, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

fn line_height(font: &FontVec, px: f32) -> f32 {
    let scaled = font.as_scaled(PxScale::from(px));
    scaled.ascent() - scaled.descent() + scaled.line_gap()
}

/// Greedy word wrap against a pixel budget; explicit newlines are kept and
/// an overlong single word is broken per character.
fn wrap_text(font: &FontVec, px: f32, text: &str, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if text_width(font, px, &candidate) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if text_width(font, px, word) <= max_width {
                current = word.to_string();
            } else {
                // Hard-break a word wider than the line.
                for c in word.chars() {
                    let mut attempt = current.clone();
                    attempt.push(c);
                    if text_width(font, px, &attempt) > max_width && !current.is_empty() {
                        lines.push(std::mem::take(&mut current));
                        current.push(c);
                    } else {
                        current = attempt;
                    }
                }
            }
        }
        lines.push(current);
    }
    lines
}

fn decode_signature(signature: &Signature) -> std::result::Result<RgbaImage, RenderError> {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    let bytes = BASE64
        .decode(&signature.image)
        .map_err(|e| RenderError::ImageDecode(format!("signature base64: {e}")))?;
    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| RenderError::ImageDecode(format!("signature image: {e}")))?;
    Ok(decoded.to_rgba8())
}

fn fit_into(image: &RgbaImage, box_w: u32, box_h: u32, filter: FilterType) -> RgbaImage {
    let (w, h) = (image.width().max(1), image.height().max(1));
    let scale = (box_w as f32 / w as f32).min(box_h as f32 / h as f32);
    let target_w = ((w as f32 * scale).round() as u32).max(1);
    let target_h = ((h as f32 * scale).round() as u32).max(1);
    image::imageops::resize(image, target_w, target_h, filter)
}

/// Lay out the document for `agreement`.
///
/// The QR verification block is embedded iff the agreement is completed;
/// embedding it earlier would advertise an unverifiable document.
/// `issued_at` stamps the payload and the footer.
pub fn compose<'f>(
    agreement: &Agreement,
    verification_base_url: &str,
    issued_at: DateTime<Utc>,
    fonts: &'f FontSet,
) -> Result<ComposedDocument<'f>> {
    let font = fonts.regular();
    let content_width = spx((PAGE_WIDTH as i32 - 2 * MARGIN) as f32);
    let mut blocks = Vec::new();
    let mut y = s(MARGIN);

    let centered = |blocks: &mut Vec<Block>, y: i32, px: f32, color, text: String| {
        let x = (spx(PAGE_WIDTH as f32) - text_width(font, px, &text)) / 2.0;
        blocks.push(Block::Text {
            x: x.max(0.0) as i32,
            y,
            px,
            color,
            text,
        });
    };

    // Title block.
    centered(&mut blocks, y, spx(30.0), TEXT, "Couple Agreement".to_string());
    y += line_height(font, spx(30.0)) as i32 + s(4);
    centered(&mut blocks, y, spx(12.0), MUTED, "reconnect".to_string());
    y += line_height(font, spx(12.0)) as i32 + s(18);

    // Topic.
    centered(&mut blocks, y, spx(21.0), TEXT, agreement.title.clone());
    y += line_height(font, spx(21.0)) as i32 + s(12);

    blocks.push(Block::FilledRect {
        x: s(MARGIN),
        y,
        w: content_width as u32,
        h: SAMPLING,
        color: RULE,
    });
    y += s(20);

    // Content and condition paragraphs.
    for (label, body) in [
        ("Our promise", agreement.content.as_str()),
        ("If the promise is not kept", agreement.condition.as_str()),
    ] {
        blocks.push(Block::Text {
            x: s(MARGIN),
            y,
            px: spx(13.0),
            color: MUTED,
            text: label.to_string(),
        });
        y += line_height(font, spx(13.0)) as i32 + s(4);

        for line in wrap_text(font, spx(17.0), body, content_width) {
            blocks.push(Block::Text {
                x: s(MARGIN),
                y,
                px: spx(17.0),
                color: TEXT,
                text: line,
            });
            y += line_height(font, spx(17.0)) as i32;
        }
        y += s(14);
    }

    // Parties and agreement date.
    for line in [
        format!("Author   {}", agreement.author_name),
        format!("Partner  {}", agreement.partner_name),
        format!(
            "Date     {}",
            hash::format_seal_timestamp(agreement.sealed_at.unwrap_or(agreement.created_at))
        ),
    ] {
        blocks.push(Block::Text {
            x: s(MARGIN),
            y,
            px: spx(15.0),
            color: TEXT,
            text: line,
        });
        y += line_height(font, spx(15.0)) as i32 + s(2);
    }
    y += s(16);

    // Signature pair, side by side.
    let box_gap = PAGE_WIDTH as i32 - 2 * MARGIN - 2 * SIGNATURE_BOX_W;
    let slots = [
        (s(MARGIN), &agreement.author_signature, &agreement.author_name),
        (
            s(MARGIN + SIGNATURE_BOX_W + box_gap),
            &agreement.partner_signature,
            &agreement.partner_name,
        ),
    ];
    for (x, signature, name) in slots {
        blocks.push(Block::OutlineRect {
            x,
            y,
            w: s(SIGNATURE_BOX_W) as u32,
            h: s(SIGNATURE_BOX_H) as u32,
            color: RULE,
        });
        if let Some(signature) = signature {
            let ink = decode_signature(signature)?;
            let fitted = fit_into(
                &ink,
                s(SIGNATURE_BOX_W - 16) as u32,
                s(SIGNATURE_BOX_H - 16) as u32,
                FilterType::Triangle,
            );
            let dx = (s(SIGNATURE_BOX_W) as u32 - fitted.width()) / 2;
            let dy = (s(SIGNATURE_BOX_H) as u32 - fitted.height()) / 2;
            blocks.push(Block::Bitmap {
                x: i64::from(x) + i64::from(dx),
                y: i64::from(y) + i64::from(dy),
                image: fitted,
            });
        }
        let label = name.clone();
        let label_x =
            x as f32 + (s(SIGNATURE_BOX_W) as f32 - text_width(font, spx(13.0), &label)) / 2.0;
        blocks.push(Block::Text {
            x: label_x as i32,
            y: y + s(SIGNATURE_BOX_H + 6),
            px: spx(13.0),
            color: MUTED,
            text: label,
        });
    }
    y += s(SIGNATURE_BOX_H + 6) + line_height(font, spx(13.0)) as i32 + s(24);

    // Verification footer, only on a completed (sealed) agreement.
    if agreement.status == AgreementStatus::Completed {
        let payload = VerificationPayload::for_agreement(agreement, verification_base_url, issued_at)?;
        let qr = payload.to_qr_image()?;
        let qr_rgba = image::DynamicImage::ImageLuma8(qr).to_rgba8();
        let qr_scaled = fit_into(&qr_rgba, s(QR_SIZE) as u32, s(QR_SIZE) as u32, FilterType::Nearest);

        blocks.push(Block::FilledRect {
            x: s(MARGIN),
            y,
            w: content_width as u32,
            h: SAMPLING,
            color: RULE,
        });
        y += s(16);

        centered(
            &mut blocks,
            y,
            spx(12.0),
            MUTED,
            format!("Agreement ID  {}", agreement.id),
        );
        y += line_height(font, spx(12.0)) as i32 + s(10);

        let qr_x = (spx(PAGE_WIDTH as f32) as i64 - i64::from(qr_scaled.width())) / 2;
        let qr_h = qr_scaled.height();
        blocks.push(Block::Bitmap {
            x: qr_x,
            y: i64::from(y),
            image: qr_scaled,
        });
        y += qr_h as i32 + s(10);

        let sealed_hash = payload.agreement_hash.clone();
        centered(
            &mut blocks,
            y,
            spx(13.0),
            TEXT,
            format!("Integrity tag  {sealed_hash}"),
        );
        y += line_height(font, spx(13.0)) as i32 + s(6);

        centered(
            &mut blocks,
            y,
            spx(11.0),
            MUTED,
            format!("Issued {}", hash::format_seal_timestamp(issued_at)),
        );
    }

    Ok(ComposedDocument { fonts, blocks })
}

impl ComposedDocument<'_> {
    /// Paint the settled layout onto the fixed-size page raster.
    pub fn rasterize(&self) -> RgbaImage {
        let mut page = RgbaImage::from_pixel(
            PAGE_WIDTH * SAMPLING,
            PAGE_HEIGHT * SAMPLING,
            PAPER,
        );

        for block in &self.blocks {
            match block {
                Block::Text {
                    x,
                    y,
                    px,
                    color,
                    text,
                } => {
                    draw_text_mut(
                        &mut page,
                        *color,
                        *x,
                        *y,
                        PxScale::from(*px),
                        self.fonts.regular(),
                        text,
                    );
                }
                Block::FilledRect { x, y, w, h, color } => {
                    draw_filled_rect_mut(&mut page, Rect::at(*x, *y).of_size(*w, *h), *color);
                }
                Block::OutlineRect { x, y, w, h, color } => {
                    draw_hollow_rect_mut(&mut page, Rect::at(*x, *y).of_size(*w, *h), *color);
                }
                Block::Bitmap { x, y, image } => {
                    image::imageops::overlay(&mut page, image, *x, *y);
                }
            }
        }

        page
    }
}

/// Wrap a painted page into a single-page A4 PDF.
pub fn to_pdf(page: &RgbaImage) -> std::result::Result<Vec<u8>, RenderError> {
    use printpdf::{
        ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm, PdfDocument, Px,
    };

    let (doc, page_idx, layer_idx) =
        PdfDocument::new("Reconnect Agreement", Mm(210.0), Mm(297.0), "page");
    let layer = doc.get_page(page_idx).get_layer(layer_idx);

    let mut rgb = Vec::with_capacity((page.width() * page.height() * 3) as usize);
    for pixel in page.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
    }

    let xobject = ImageXObject {
        width: Px(page.width() as usize),
        height: Px(page.height() as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: false,
        image_data: rgb,
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    };

    // Raster pixels per physical inch so the bitmap spans the A4 width.
    let dpi = page.width() as f32 / (210.0 / 25.4);
    Image::from(xobject).add_to_layer(
        layer,
        ImageTransform {
            dpi: Some(dpi),
            ..Default::default()
        },
    );

    doc.save_to_bytes()
        .map_err(|e| RenderError::Pdf(e.to_string()))
}

/// Compose, rasterize and package the document for `agreement` in one go.
/// No partial artifact is produced on failure.
pub fn render_document(
    agreement: &Agreement,
    verification_base_url: &str,
    issued_at: DateTime<Utc>,
    fonts: &FontSet,
) -> Result<RenderedDocument> {
    let composed = compose(agreement, verification_base_url, issued_at, fonts)?;
    let page = composed.rasterize();
    let pdf = to_pdf(&page).map_err(crate::error::CoreError::from)?;
    tracing::debug!(
        agreement_id = %agreement.id,
        bytes = pdf.len(),
        "document rendered"
    );
    Ok(RenderedDocument {
        pdf,
        file_name: document_file_name(issued_at, agreement.couple_id),
    })
}
