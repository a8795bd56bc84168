//! Dialogue state detection.
//!
//! Glue between the vision layer and the pattern registry: parse the frame,
//! classify the text, stamp the result.

use chrono::{DateTime, Utc};

use crate::patterns::{ActionSpec, Registry};

/// A classified on-screen state.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Detection {
	pub state: String,
	pub action: ActionSpec,
	pub dialogue: vision::screen::dialogue::Dialogue,
	/// Capture dimensions the dialogue rect refers to (click math needs them).
	pub frame_w: u32,
	pub frame_h: u32,
	pub detected_at: DateTime<Utc>,
}

pub struct Detector {
	registry: Registry,
}

impl Detector {
	pub fn new(registry: Registry) -> Self {
		Self { registry }
	}

	/// Parse and classify one frame.
	///
	/// Returns `None` when there is no dialogue panel or its text matches no
	/// registered state.
	pub fn detect(&self, vision: &vision::Vision, frame: &vision::OwnedImage) -> Option<Detection> {
		let dialogue = vision.dialogue(frame.as_image())?;

		// Classify against body text and option labels together; some states
		// are only recognizable by their option row ("Accept").
		let mut haystack = dialogue.text.clone();
		for opt in &dialogue.options {
			haystack.push(' ');
			haystack.push_str(&opt.label);
		}

		let pattern = self.registry.classify(&haystack)?;

		tracing::debug!(
			state = %pattern.def.state,
			confidence = dialogue.confidence,
			options = dialogue.options.len(),
			"state detected"
		);

		Some(Detection {
			state: pattern.def.state.clone(),
			action: pattern.def.action.clone(),
			dialogue,
			frame_w: frame.width(),
			frame_h: frame.height(),
			detected_at: Utc::now(),
		})
	}
}
