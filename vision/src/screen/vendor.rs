//! Vendor inventory table parsing.
//!
//! The vendor screen shows a scrollable table of listings (item name on the
//! left, unit price on the right). Rows that fail to parse are skipped; a
//! partial read is more useful to the price scanner than no read.

use std::sync::LazyLock;

use regex::Regex;

use super::{normalize_text, text_rows, Rect};
use crate::{Image, Theme};

/// One parsed vendor listing row.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Listing {
    pub rect: Rect,
    pub name: String,
    pub price: u32,
}

static PRICE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d,.]*)").expect("regex"));

/// Cheap vendor presence check (no OCR): the table header band is dominated
/// by the panel backdrop color.
pub fn is_screen(image: Image, theme: Theme) -> bool {
    let (x, y, w, h) = header_band(image);
    if w == 0 || h == 0 {
        return false;
    }
    image.sub_image(x, y, w, h).color_fraction(theme.backdrop, 8.0) >= 0.40
}

pub fn parse(image: Image, theme: Theme, ocr: &crate::ocr::Ocr) -> Vec<Listing> {
    let (x, y, w, h) = table_roi(image);
    if w == 0 || h == 0 {
        return vec![];
    }

    let table = image.sub_image(x, y, w, h);
    let min_row_h = ((image.height() as f32) * 0.014).round().max(8.0) as u32;

    let mut listings = Vec::new();
    for row in text_rows(table, theme, 0.03, min_row_h) {
        let pad = (row.h / 4).max(1);
        let row_view = table.sub_image(row.x, row.y.saturating_sub(pad), row.w, row.h + pad * 2);

        // Name occupies the left side of the row, price the right.
        let name_w = ((row.w as f32) * 0.68).round().max(1.0) as u32;
        let name = normalize_text(&row_view.sub_image(0, 0, name_w, row_view.height()).get_text(theme, ocr));
        if name.len() < 3 {
            continue;
        }

        let price_view = row_view.sub_image(name_w, 0, row.w - name_w, row_view.height());
        let price_text = price_view.get_text(theme, ocr);
        let Some(price) = parse_price(&price_text) else {
            continue;
        };

        listings.push(Listing {
            rect: Rect {
                x: x + row.x,
                y: y + row.y,
                w: row.w,
                h: row.h,
            },
            name,
            price,
        });
    }

    listings
}

fn parse_price(text: &str) -> Option<u32> {
    let m = PRICE_REGEX.captures(text)?.get(1)?;
    let digits: String = m.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<u32>().ok()
}

/// Table body ROI (relative coordinates, scales with resolution).
fn table_roi(image: Image) -> (u32, u32, u32, u32) {
    let w = image.width();
    let h = image.height();
    let x1 = (w as f32 * 0.24).round() as u32;
    let x2 = (w as f32 * 0.76).round() as u32;
    let y1 = (h as f32 * 0.22).round() as u32;
    let y2 = (h as f32 * 0.82).round() as u32;
    (x1, y1, x2.saturating_sub(x1), y2.saturating_sub(y1))
}

/// Header band just above the table body.
fn header_band(image: Image) -> (u32, u32, u32, u32) {
    let w = image.width();
    let h = image.height();
    let x1 = (w as f32 * 0.24).round() as u32;
    let x2 = (w as f32 * 0.76).round() as u32;
    let y1 = (h as f32 * 0.16).round() as u32;
    let y2 = (h as f32 * 0.21).round() as u32;
    (x1, y1, x2.saturating_sub(x1), y2.saturating_sub(y1))
}

#[cfg(test)]
mod tests {
    use super::parse_price;

    #[test]
    fn price_parses_plain_and_grouped_digits() {
        assert_eq!(parse_price("125"), Some(125));
        assert_eq!(parse_price("1,250 gold"), Some(1250));
        assert_eq!(parse_price("price: 42"), Some(42));
    }

    #[test]
    fn price_rejects_text_without_digits() {
        assert_eq!(parse_price("sold out"), None);
        assert_eq!(parse_price(""), None);
    }
}
