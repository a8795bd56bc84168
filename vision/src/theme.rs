use crate::{Color, Image};

/// UI theme colors sampled from the game settings screen.
///
/// The parsers use these colors to find dialogue text against the parchment
/// backdrop regardless of the player's interface skin or gamma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Theme {
    /// Dialogue/chat text color.
    pub text: Color,
    /// Dialogue panel backdrop color.
    pub backdrop: Color,
}

impl Theme {
    /// Default skin: dark text on a light parchment panel.
    pub const PARCHMENT: Self = Self {
        text: Color::new(32, 28, 24),
        backdrop: Color::new(222, 209, 180),
    };

    /// Sample theme colors from a settings-screen capture.
    ///
    /// The settings screen shows a preview dialogue panel at a fixed layout
    /// position. Sampling rectangles are *relative* so arbitrary resolutions
    /// and UI scales work.
    pub fn from_settings(image: Image) -> Self {
        let w = image.width().max(1);
        let h = image.height().max(1);

        // Ratios derived from a 1920x1080 reference capture:
        // preview panel body at (640,760) size (120x24),
        // preview text line at (668,772) size (64x6).
        let panel_x = (w as f32 * 640.0 / 1920.0).round() as u32;
        let panel_y = (h as f32 * 760.0 / 1080.0).round() as u32;
        let panel_w = (w as f32 * 120.0 / 1920.0).round().max(1.0) as u32;
        let panel_h = (h as f32 * 24.0 / 1080.0).round().max(1.0) as u32;

        let text_x = (w as f32 * 668.0 / 1920.0).round() as u32;
        let text_y = (h as f32 * 772.0 / 1080.0).round() as u32;
        let text_w = (w as f32 * 64.0 / 1920.0).round().max(1.0) as u32;
        let text_h = (h as f32 * 6.0 / 1080.0).round().max(1.0) as u32;

        Self {
            text: image.sub_image(text_x, text_y, text_w, text_h).average_color(),
            backdrop: image
                .sub_image(panel_x, panel_y, panel_w, panel_h)
                .average_color(),
        }
    }
}
