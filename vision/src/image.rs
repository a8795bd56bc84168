//! Image primitives.
//!
//! Screen captures are converted once into an owned RGB frame (`OwnedImage`)
//! and then sliced into borrowed views (`Image<'a>`) for region work. Views
//! never copy pixels, so the dialogue/vendor/chat parsers can probe many
//! regions per frame without allocation. Owned copies are only made at the
//! OCR boundary, where preprocessing mutates pixels.

use anyhow::{Context, Result};

/// Owned RGB image (no alpha).
#[derive(Clone, Debug)]
pub struct OwnedImage {
    width: u32,
    height: u32,
    data: Vec<Color>,
}

impl OwnedImage {
    /// Build an `OwnedImage` from RGBA capture bytes (alpha is discarded).
    ///
    /// The buffer is expected to be tightly packed: `width * height * 4` bytes.
    pub fn from_rgba(width: usize, bytes: &[u8]) -> Self {
        let height = bytes.len() / width / 4;
        let data = bytes
            .chunks_exact(4)
            .map(|v| Color::new(v[0], v[1], v[2]))
            .collect::<Vec<_>>();

        Self {
            width: width as u32,
            height: height as u32,
            data,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resize this image to the given height (preserving aspect ratio).
    ///
    /// Uses `fast_image_resize` (SIMD-optimized) and keeps output in `Vec<Color>`.
    pub fn resize_h(&mut self, height: u32) {
        if self.height == height {
            return;
        }

        let height = height.max(1);
        let width = (self.width as u64 * height as u64 / self.height.max(1) as u64) as u32;

        // SAFETY: `Color` is `#[repr(C)]` with 3 x `u8`, so it is layout-compatible
        // with `fast_image_resize::pixels::U8x3` (alignment 1).
        let src_pixels = unsafe {
            std::slice::from_raw_parts(
                self.data.as_ptr() as *const fast_image_resize::pixels::U8x3,
                self.data.len(),
            )
        };

        let src = fast_image_resize::images::ImageRef::from_pixels(self.width, self.height, src_pixels)
            .expect("fast_image_resize: ImageRef::from_pixels failed");

        let mut dst = fast_image_resize::images::Image::new(width, height, fast_image_resize::PixelType::U8x3);

        let mut resizer = fast_image_resize::Resizer::new();
        let options = fast_image_resize::ResizeOptions::new().resize_alg(
            fast_image_resize::ResizeAlg::Interpolation(fast_image_resize::FilterType::CatmullRom),
        );

        resizer
            .resize(&src, &mut dst, &Some(options))
            .expect("fast_image_resize: resize failed");

        let bytes: Vec<u8> = dst.into_vec();
        let mut data = Vec::with_capacity((width * height) as usize);
        for px in bytes.chunks_exact(3) {
            data.push(Color::new(px[0], px[1], px[2]));
        }

        self.width = width;
        self.height = height;
        self.data = data;
    }

    #[inline]
    pub fn resized_h(mut self, height: u32) -> Self {
        self.resize_h(height);
        self
    }

    pub fn map_pixels(&mut self, f: impl Fn(&mut Color)) {
        for v in &mut self.data {
            f(v);
        }
    }

    /// Create a borrowed view of this entire image.
    pub fn as_image<'a>(&'a self) -> Image<'a> {
        Image {
            x1: 0,
            y1: 0,
            x2: self.width,
            y2: self.height,
            true_width: self.width,
            data: &self.data,
        }
    }

    /// Convert to a grayscale `GrayImage` (luma).
    pub fn to_gray_image(&self) -> image::GrayImage {
        use image::{GrayImage, Luma};
        let mut out = GrayImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.data[(x + y * self.width) as usize];
                out.put_pixel(x, y, Luma([c.luma()]));
            }
        }
        out
    }

    /// Create an RGB `OwnedImage` from a grayscale image (each pixel repeated into RGB).
    pub fn from_gray_as_rgb(gray: &image::GrayImage) -> Self {
        let (w, h) = gray.dimensions();
        let mut data = Vec::with_capacity((w * h) as usize);
        for p in gray.pixels() {
            let v = p.0[0];
            data.push(Color::new(v, v, v));
        }
        Self {
            width: w,
            height: h,
            data,
        }
    }
}

// ----------

/// Borrowed image view into an `OwnedImage`.
#[derive(Clone, Copy)]
pub struct Image<'a> {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
    true_width: u32,
    data: &'a [Color],
}

impl<'a> Image<'a> {
    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    #[inline(always)]
    fn pixel(&self, x: u32, y: u32) -> &Color {
        &self.data[(x + y * self.true_width) as usize]
    }

    pub fn to_owned_image(self) -> OwnedImage {
        let mut data = Vec::with_capacity((self.width() * self.height()) as usize);
        for y in self.y1..self.y2 {
            for x in self.x1..self.x2 {
                data.push(*self.pixel(x, y));
            }
        }

        OwnedImage {
            width: self.width(),
            height: self.height(),
            data,
        }
    }

    pub fn get_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0; (self.width() * self.height() * 3) as usize];
        let mut i = 0;
        for y in self.y1..self.y2 {
            for x in self.x1..self.x2 {
                let clr = self.pixel(x, y);
                bytes[i] = clr.r;
                bytes[i + 1] = clr.g;
                bytes[i + 2] = clr.b;
                i += 3;
            }
        }
        bytes
    }

    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let bytes = self.get_bytes();
        let img = image::RgbImage::from_raw(self.width(), self.height(), bytes)
            .context("RgbImage::from_raw failed")?;
        img.save_with_format(path, image::ImageFormat::Png)
            .context("save png")?;
        Ok(())
    }

    /// Create an arbitrary subimage (relative coordinates).
    pub fn sub_image(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let x = x.min(self.width());
        let y = y.min(self.height());
        let width = width.min(self.width() - x);
        let height = height.min(self.height() - y);

        Self {
            x1: self.x1 + x,
            y1: self.y1 + y,
            x2: self.x1 + x + width,
            y2: self.y1 + y + height,
            true_width: self.true_width,
            data: self.data,
        }
    }

    pub fn average_color(&self) -> Color {
        let mut r = 0u32;
        let mut g = 0u32;
        let mut b = 0u32;

        for y in self.y1..self.y2 {
            for x in self.x1..self.x2 {
                let clr = self.pixel(x, y);
                r += clr.r as u32;
                g += clr.g as u32;
                b += clr.b as u32;
            }
        }

        let count = (self.width() * self.height()).max(1);
        Color {
            r: (r / count) as u8,
            g: (g / count) as u8,
            b: (b / count) as u8,
        }
    }

    /// Fraction of pixels in this view that sit close to `target`.
    ///
    /// Used by the cheap screen detectors; deviation threshold matches the
    /// one used for theme checks elsewhere.
    pub fn color_fraction(&self, target: Color, max_deviation: f32) -> f32 {
        let mut hits = 0u32;
        for y in self.y1..self.y2 {
            for x in self.x1..self.x2 {
                if self.pixel(x, y).deviation(target) <= max_deviation {
                    hits += 1;
                }
            }
        }
        hits as f32 / (self.width() * self.height()).max(1) as f32
    }

    /// Extract text using OCR with preprocessing (grayscale, thresholding, upscale).
    ///
    /// The function tries multiple preprocessing strategies (adaptive threshold,
    /// Otsu threshold, theme-guided) and picks the most plausible result.
    pub fn get_text(&self, theme: crate::Theme, ocr: &crate::ocr::Ocr) -> String {
        use imageproc::contrast::{adaptive_threshold, equalize_histogram, otsu_level, threshold, ThresholdType};

        // Upscale small crops; OCR generally performs better on larger glyphs.
        let mut base = self.to_owned_image();
        const MIN_H: u32 = 80;
        if base.height < MIN_H {
            base = base.resized_h(MIN_H);
        }

        // Candidate 1: adaptive threshold (handles gradients/transparency).
        let adaptive = {
            let gray = equalize_histogram(&base.to_gray_image());
            let bin = adaptive_threshold(&gray, 7, 10);
            OwnedImage::from_gray_as_rgb(&ensure_dark_text_on_light(bin))
        };

        // Candidate 2: global Otsu.
        let otsu = {
            let gray = equalize_histogram(&base.to_gray_image());
            let level = otsu_level(&gray);
            let bin = threshold(&gray, level, ThresholdType::Binary);
            OwnedImage::from_gray_as_rgb(&ensure_dark_text_on_light(bin))
        };

        // Candidate 3: theme-guided (text vs. backdrop color).
        let theme_bin = {
            let mut img = base.clone();
            img.map_pixels(|v| {
                let d1 = v.deviation(theme.text);
                let d2 = v.deviation(theme.backdrop);
                *v = if d1 < d2 { Color::BLACK } else { Color::WHITE };
            });
            img
        };

        let mut best = String::new();
        let mut best_score = i64::MIN;

        for cand in [adaptive, otsu, theme_bin] {
            let text = ocr.get_text(cand.as_image());
            let score = score_ocr_text(&text);
            if score > best_score {
                best_score = score;
                best = text;
            }
        }

        // Optional debug snapshots.
        if std::env::var("SCRYBOT_DUMP_OCR").as_deref() == Ok("1") {
            let name = best
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .take(40)
                .collect::<String>();
            let _ = self.save_png(format!("./debug_ocr_{}.png", name));
        }

        best
    }
}

fn ensure_dark_text_on_light(mut bin: image::GrayImage) -> image::GrayImage {
    // If the image is mostly black, invert it so background becomes light.
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
    bin
}

fn score_ocr_text(text: &str) -> i64 {
    // Prefer strings with more alphanumerics (less noise) and slightly longer length.
    let mut score = 0i64;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            score += 3;
        } else if ch.is_whitespace() {
            score += 0;
        } else {
            score += 1;
        }
    }
    score + text.len() as i64
}

// ----------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Deviation metric used throughout the project for UI color checks.
    ///
    /// NOTE: This is intentionally *not* Euclidean distance; it is tuned for
    /// robust thresholding in the presence of compression and post-processing.
    pub fn deviation(&self, other: Color) -> f32 {
        (((self.r as f32 - other.r as f32).abs() / 255.0 / 3.0
            + (self.g as f32 - other.g as f32).abs() / 255.0 / 3.0
            + (self.b as f32 - other.b as f32).abs() / 255.0 / 3.0)
            / 0.05)
            .powi(3)
    }

    /// Compute luma (grayscale intensity).
    pub fn luma(&self) -> u8 {
        let r = self.r as u32;
        let g = self.g as u32;
        let b = self.b as u32;
        ((299 * r + 587 * g + 114 * b) / 1000) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: Color) -> OwnedImage {
        let mut bytes = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            bytes.extend_from_slice(&[color.r, color.g, color.b, 255]);
        }
        OwnedImage::from_rgba(width as usize, &bytes)
    }

    #[test]
    fn rgba_conversion_drops_alpha() {
        let img = solid(4, 2, Color::new(10, 20, 30));
        assert_eq!(img.width(), 4);
        assert_eq!(img.height(), 2);
        assert_eq!(img.as_image().average_color(), Color::new(10, 20, 30));
    }

    #[test]
    fn sub_image_clamps_to_bounds() {
        let img = solid(8, 8, Color::WHITE);
        let view = img.as_image().sub_image(6, 6, 10, 10);
        assert_eq!(view.width(), 2);
        assert_eq!(view.height(), 2);
    }

    #[test]
    fn color_fraction_on_solid_image() {
        let img = solid(4, 4, Color::new(200, 10, 10));
        let view = img.as_image();
        assert!(view.color_fraction(Color::new(200, 10, 10), 1.0) > 0.99);
        assert!(view.color_fraction(Color::new(10, 200, 10), 1.0) < 0.01);
    }

    #[test]
    fn deviation_is_zero_for_identical_colors() {
        let c = Color::new(120, 80, 40);
        assert_eq!(c.deviation(c), 0.0);
        assert!(c.deviation(Color::WHITE) > 1.0);
    }
}
