//! Dialogue box detection.
//!
//! Goal: be robust to different screen resolutions and avoid hard-coded pixel
//! coordinates by using relative ROIs and contour-based segmentation.
//!
//! The logic here is intentionally conservative: if we cannot confidently
//! detect the dialogue panel, we return `None` instead of panicking.

use super::{normalize_text, text_rows, Rect};
use crate::{Image, Theme};

/// A parsed on-screen dialogue panel.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Dialogue {
    /// Bounding box of the panel in capture coordinates.
    pub rect: Rect,
    /// Body text (NPC speech, prompt text).
    pub text: String,
    /// Response rows beneath the body, top to bottom.
    pub options: Vec<DialogueOption>,
    /// Fraction of the panel matching the backdrop color (0..1). Low values
    /// mean the contour was probably not a dialogue panel.
    pub confidence: f32,
}

/// One selectable response row.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DialogueOption {
    pub rect: Rect,
    pub label: String,
}

/// Fraction of the body region that must match the backdrop color for the
/// cheap presence check to fire.
const BACKDROP_MIN_FRACTION: f32 = 0.35;

/// Cheap dialogue presence check (no OCR): the lower-middle of the screen is
/// dominated by the panel backdrop color.
pub fn is_screen(image: Image, theme: Theme) -> bool {
    let Some(rect) = detect_panel(image) else {
        return false;
    };

    image
        .sub_image(rect.x, rect.y, rect.w, rect.h)
        .color_fraction(theme.backdrop, 8.0)
        >= BACKDROP_MIN_FRACTION
}

pub fn parse(image: Image, theme: Theme, ocr: &crate::ocr::Ocr) -> Option<Dialogue> {
    let rect = detect_panel(image)?;
    let panel = image.sub_image(rect.x, rect.y, rect.w, rect.h);
    let confidence = panel.color_fraction(theme.backdrop, 8.0);

    let margin = ((rect.w as f32) * 0.04).round().max(2.0) as u32;
    let inner_w = rect.w.saturating_sub(margin * 2).max(1);

    // Body text occupies the top ~55% of the panel.
    let body_h = ((rect.h as f32) * 0.55).round().max(12.0) as u32;
    let body = panel.sub_image(margin, margin.min(rect.h / 4), inner_w, body_h);
    let text = normalize_text(&body.get_text(theme, ocr));

    // Option rows live in the remainder.
    let opts_y = body_h;
    let opts_h = rect.h.saturating_sub(opts_y);
    let mut options = Vec::new();
    if opts_h > 0 {
        let band = panel.sub_image(margin, opts_y, inner_w, opts_h);
        let min_row_h = ((image.height() as f32) * 0.012).round().max(6.0) as u32;

        for row in text_rows(band, theme, 0.04, min_row_h) {
            // Re-anchor the row rect into capture coordinates.
            let abs = Rect {
                x: rect.x + margin + row.x,
                y: rect.y + opts_y + row.y,
                w: row.w,
                h: row.h,
            };

            let pad = (row.h / 4).max(1);
            let label_view = band.sub_image(
                row.x,
                row.y.saturating_sub(pad),
                row.w,
                row.h + pad * 2,
            );
            let label = normalize_text(&label_view.get_text(theme, ocr));
            if label.is_empty() {
                continue;
            }

            options.push(DialogueOption { rect: abs, label });
            if options.len() >= 6 {
                break;
            }
        }
    }

    if text.is_empty() && options.is_empty() {
        return None;
    }

    Some(Dialogue { rect, text, options, confidence })
}

/// Find the dialogue panel rectangle via contour detection.
fn detect_panel(image: Image) -> Option<Rect> {
    use imageproc::contours::{find_contours, BorderType};
    use imageproc::contrast::{equalize_histogram, otsu_level, threshold, ThresholdType};

    let w = image.width();
    let h = image.height();
    if w == 0 || h == 0 {
        return None;
    }

    // Restrict to a broad ROI where the panel can appear (relative coordinates).
    let roi_x1 = (w as f32 * 0.15).round() as u32;
    let roi_x2 = (w as f32 * 0.85).round() as u32;
    let roi_y1 = (h as f32 * 0.50).round() as u32;
    let roi_y2 = (h as f32 * 0.97).round() as u32;

    let roi_w = roi_x2.saturating_sub(roi_x1).max(1);
    let roi_h = roi_y2.saturating_sub(roi_y1).max(1);

    let roi = image.sub_image(roi_x1, roi_y1, roi_w, roi_h).to_owned_image();
    let gray = equalize_histogram(&roi.to_gray_image());
    let level = otsu_level(&gray);
    let mut bin = threshold(&gray, level, ThresholdType::Binary);
    normalize_binary(&mut bin);

    let contours = find_contours::<i32>(&bin);

    // The panel is a wide rectangle spanning a good chunk of the screen.
    let min_w = (w as f32 * 0.30) as u32;
    let min_h = (h as f32 * 0.10) as u32;
    let max_h = (h as f32 * 0.45) as u32;

    let mut best: Option<Rect> = None;
    for c in contours {
        if c.border_type != BorderType::Outer {
            continue;
        }

        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;

        for p in &c.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        if min_x < 0 || min_y < 0 {
            continue;
        }

        let rw = (max_x - min_x + 1).max(0) as u32;
        let rh = (max_y - min_y + 1).max(0) as u32;
        if rw < min_w || rh < min_h || rh > max_h {
            continue;
        }

        // Panels are much wider than tall.
        let aspect = rw as f32 / rh as f32;
        if aspect < 1.6 {
            continue;
        }

        let rect = Rect {
            x: roi_x1 + (min_x as u32),
            y: roi_y1 + (min_y as u32),
            w: rw,
            h: rh,
        };

        match best {
            None => best = Some(rect),
            Some(b) if (rect.w as u64 * rect.h as u64) > (b.w as u64 * b.h as u64) => {
                best = Some(rect)
            }
            _ => {}
        }
    }

    best
}

fn normalize_binary(bin: &mut image::GrayImage) {
    // Decide whether to invert the thresholded image based on white/black ratio.
    let mut white = 0u64;
    let mut black = 0u64;
    for p in bin.pixels() {
        if p.0[0] > 0 {
            white += 1;
        } else {
            black += 1;
        }
    }
    if black > white {
        for p in bin.pixels_mut() {
            p.0[0] = 255u8.saturating_sub(p.0[0]);
        }
    }
}
