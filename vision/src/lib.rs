mod image;
pub use image::*;
mod ocr;
mod theme;
pub use theme::*;

pub mod screen;

/// Vision engine: OCR plus the sampled UI theme.
///
/// One instance is shared by everything that reads the screen. The engine is
/// cheap to call but not cheap to build (OCR model load), so callers keep it
/// behind an `Arc`.
pub struct Vision {
    theme: Theme,
    ocr: ocr::Ocr,
}

impl Vision {
    pub fn try_new(
        theme: Theme,
        ocr_detection: impl AsRef<std::path::Path>,
        ocr_recognition: impl AsRef<std::path::Path>,
        ocr_charset: impl AsRef<std::path::Path>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            theme,
            ocr: ocr::Ocr::try_new(ocr_detection, ocr_recognition, ocr_charset)?,
        })
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    /// Parse the dialogue box (if any) out of a full-window capture.
    pub fn dialogue(&self, image: Image) -> Option<screen::dialogue::Dialogue> {
        screen::dialogue::parse(image, self.theme, &self.ocr)
    }

    /// Cheap dialogue-box presence check (no OCR).
    pub fn dialogue_is_screen(&self, image: Image) -> bool {
        screen::dialogue::is_screen(image, self.theme)
    }

    /// Parse the vendor inventory table into listings.
    pub fn vendor_listings(&self, image: Image) -> Vec<screen::vendor::Listing> {
        screen::vendor::parse(image, self.theme, &self.ocr)
    }

    /// Cheap vendor-screen presence check (no OCR).
    pub fn vendor_is_screen(&self, image: Image) -> bool {
        screen::vendor::is_screen(image, self.theme)
    }

    /// OCR the chat region and return its visible lines, oldest first.
    pub fn chat_lines(&self, image: Image) -> Vec<String> {
        screen::chat::lines(image, self.theme, &self.ocr)
    }
}
