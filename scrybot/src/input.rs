//! Synthetic input.
//!
//! All clicks are expressed as *fractions* of the capture frame, which makes
//! them invariant under capture downscaling; they are converted to absolute
//! screen coordinates against the live window bounds at dispatch time.

use std::time::Duration;

use anyhow::{Context, Result};
use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};

use crate::capture::WindowBounds;

pub struct Input {
	enigo: Enigo,
}

impl Input {
	pub fn try_new() -> Result<Self> {
		let enigo = Enigo::new(&Settings::default()).context("initialize input backend")?;
		Ok(Self { enigo })
	}

	/// Tap (press and release) a key.
	pub fn tap(&mut self, key: Key) -> Result<()> {
		self.enigo.key(key, Direction::Press).context("key press")?;
		std::thread::sleep(Duration::from_millis(30));
		self.enigo.key(key, Direction::Release).context("key release")?;
		self.pace();
		Ok(())
	}

	/// Left-click at a fractional position within the game window.
	pub fn click_fraction(&mut self, bounds: WindowBounds, fx: f32, fy: f32) -> Result<()> {
		let x = bounds.x + bounds.width * fx.clamp(0.0, 1.0);
		let y = bounds.y + bounds.height * fy.clamp(0.0, 1.0);

		// enigo works in physical pixels on some platforms; correct by the
		// monitor scale factor reported with the bounds.
		let x = (x * bounds.scale_factor).round() as i32;
		let y = (y * bounds.scale_factor).round() as i32;

		self.enigo
			.move_mouse(x, y, Coordinate::Abs)
			.context("move mouse")?;
		std::thread::sleep(Duration::from_millis(40));
		self.enigo
			.button(Button::Left, Direction::Click)
			.context("click")?;
		self.pace();
		Ok(())
	}

	pub fn type_text(&mut self, text: &str) -> Result<()> {
		self.enigo.text(text).context("type text")?;
		self.pace();
		Ok(())
	}

	fn pace(&self) {
		let delay = crate::config::read().input_delay_ms;
		std::thread::sleep(Duration::from_millis(delay));
	}
}

/// Parse a key name from a pattern/action definition.
///
/// Accepts the handful of named keys the registry uses plus any single
/// character.
pub fn parse_key(name: &str) -> Option<Key> {
	let lower = name.trim().to_ascii_lowercase();
	match lower.as_str() {
		"space" => Some(Key::Space),
		"enter" | "return" => Some(Key::Return),
		"esc" | "escape" => Some(Key::Escape),
		"tab" => Some(Key::Tab),
		_ => {
			let mut chars = lower.chars();
			match (chars.next(), chars.next()) {
				(Some(c), None) => Some(Key::Unicode(c)),
				_ => None,
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::parse_key;
	use enigo::Key;

	#[test]
	fn named_keys_parse() {
		assert_eq!(parse_key("space"), Some(Key::Space));
		assert_eq!(parse_key("Enter"), Some(Key::Return));
		assert_eq!(parse_key("ESC"), Some(Key::Escape));
	}

	#[test]
	fn single_characters_parse() {
		assert_eq!(parse_key("e"), Some(Key::Unicode('e')));
		assert_eq!(parse_key("Q"), Some(Key::Unicode('q')));
	}

	#[test]
	fn garbage_is_rejected() {
		assert_eq!(parse_key("not-a-key"), None);
		assert_eq!(parse_key(""), None);
	}
}
