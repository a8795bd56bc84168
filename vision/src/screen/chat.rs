//! Chat window text extraction.
//!
//! The chat log sits in the bottom-left corner. Lines are segmented by text
//! color before OCR so each line gets its own, better-focused recognition
//! pass instead of one big noisy crop.

use super::{normalize_text, text_rows};
use crate::{Image, Theme};

/// OCR the chat region and return visible lines, oldest first.
pub fn lines(image: Image, theme: Theme, ocr: &crate::ocr::Ocr) -> Vec<String> {
    let region = region(image);
    let min_row_h = ((image.height() as f32) * 0.010).round().max(6.0) as u32;

    let mut out = Vec::new();
    for row in text_rows(region, theme, 0.02, min_row_h) {
        let pad = (row.h / 4).max(1);
        let view = region.sub_image(row.x, row.y.saturating_sub(pad), row.w, row.h + pad * 2);
        let line = normalize_text(&view.get_text(theme, ocr));
        if !line.is_empty() {
            out.push(line);
        }
    }
    out
}

/// Chat region (relative coordinates from a 1920x1080 reference layout).
pub fn region(image: Image) -> Image {
    let w = image.width();
    let h = image.height();

    let x1 = (w as f32 * 0.015).round() as u32;
    let x2 = (w as f32 * 0.40).round() as u32;
    let y1 = (h as f32 * 0.68).round() as u32;
    let y2 = (h as f32 * 0.97).round() as u32;

    image.sub_image(x1, y1, x2.saturating_sub(x1), y2.saturating_sub(y1))
}
