//! Action dispatch.
//!
//! Maps a detected state to its scripted response and injects the input. A
//! state that stays on screen across consecutive polls must be acted on only
//! once; the trigger re-arms when the state disappears or after a cooldown,
//! whichever comes first.

use std::time::{Duration, Instant};

use anyhow::Result;

use crate::detector::Detection;
use crate::input::{parse_key, Input};
use crate::patterns::ActionSpec;

/// Edge-triggering state machine, separated from input execution so the
/// exactly-once semantics are testable without a display server.
#[derive(Debug, Default)]
pub struct Trigger {
	active: Option<(String, Instant)>,
}

impl Trigger {
	/// Report the state seen this poll cycle (or `None`). Returns `true` when
	/// the caller should fire the state's action now.
	pub fn check(&mut self, state: Option<&str>, rearm: Duration) -> bool {
		let Some(state) = state else {
			// State left the screen: re-arm.
			self.active = None;
			return false;
		};

		if let Some((active, fired_at)) = &self.active {
			if active == state && fired_at.elapsed() < rearm {
				return false;
			}
		}

		self.active = Some((state.to_string(), Instant::now()));
		true
	}
}

/// Executes scripted responses against the game window.
pub struct Dispatcher {
	input: Input,
	trigger: Trigger,
}

impl Dispatcher {
	pub fn try_new() -> Result<Self> {
		Ok(Self {
			input: Input::try_new()?,
			trigger: Trigger::default(),
		})
	}

	/// Handle one poll cycle's detection result.
	///
	/// Returns `true` when an action was dispatched.
	pub fn handle(&mut self, detection: Option<&Detection>) -> Result<bool> {
		let rearm = Duration::from_secs(crate::config::read().rearm_secs);
		let Some(detection) = detection else {
			self.trigger.check(None, rearm);
			return Ok(false);
		};

		if !self.trigger.check(Some(detection.state.as_str()), rearm) {
			return Ok(false);
		}

		self.execute(detection)?;
		Ok(true)
	}

	/// Direct key tap for mode-specific behavior (weapon swap etc.).
	pub fn tap_key(&mut self, key: enigo::Key) -> Result<()> {
		self.input.tap(key)
	}

	/// Click an option row outside the scripted action table.
	pub fn click_option(&mut self, detection: &Detection, index: usize) -> Result<()> {
		let Some(option) = detection.dialogue.options.get(index) else {
			tracing::warn!(index, "click_option: no such option row");
			return Ok(());
		};
		self.click_rect_center(option.rect, detection)
	}

	fn execute(&mut self, detection: &Detection) -> Result<()> {
		tracing::info!(
			state = %detection.state,
			action = ?detection.action,
			"dispatching response"
		);

		match &detection.action {
			ActionSpec::PressKey { key } => {
				let Some(key) = parse_key(key) else {
					tracing::warn!(state = %detection.state, key, "unparseable key; skipping");
					return Ok(());
				};
				self.input.tap(key)?;
			}
			ActionSpec::ClickOption { index } => {
				let Some(option) = detection.dialogue.options.get(*index) else {
					tracing::warn!(
						state = %detection.state,
						index,
						available = detection.dialogue.options.len(),
						"option index out of range; skipping"
					);
					return Ok(());
				};
				self.click_rect_center(option.rect, detection)?;
			}
			ActionSpec::ClickCenter => {
				self.click_rect_center(detection.dialogue.rect, detection)?;
			}
			ActionSpec::Ignore => {}
		}

		Ok(())
	}

	fn click_rect_center(&mut self, rect: vision::screen::Rect, detection: &Detection) -> Result<()> {
		let app_name = crate::config::read().app_name.clone();
		let Some(bounds) = crate::capture::window_bounds(&app_name) else {
			tracing::warn!("game window disappeared before click");
			return Ok(());
		};

		let fx = rect.center_x() as f32 / detection.frame_w.max(1) as f32;
		let fy = rect.center_y() as f32 / detection.frame_h.max(1) as f32;
		self.input.click_fraction(bounds, fx, fy)
	}
}

#[cfg(test)]
mod tests {
	use super::Trigger;
	use std::time::Duration;

	const REARM: Duration = Duration::from_secs(60);

	#[test]
	fn state_fires_exactly_once_while_visible() {
		let mut trigger = Trigger::default();
		assert!(trigger.check(Some("quest_offer"), REARM));
		assert!(!trigger.check(Some("quest_offer"), REARM));
		assert!(!trigger.check(Some("quest_offer"), REARM));
	}

	#[test]
	fn no_detection_rearms_the_trigger() {
		let mut trigger = Trigger::default();
		assert!(trigger.check(Some("quest_offer"), REARM));
		assert!(!trigger.check(Some("quest_offer"), REARM));
		assert!(!trigger.check(None, REARM));
		assert!(trigger.check(Some("quest_offer"), REARM));
	}

	#[test]
	fn different_state_fires_immediately() {
		let mut trigger = Trigger::default();
		assert!(trigger.check(Some("quest_offer"), REARM));
		assert!(trigger.check(Some("continue_prompt"), REARM));
	}

	#[test]
	fn cooldown_expiry_rearms_a_stuck_state() {
		let mut trigger = Trigger::default();
		assert!(trigger.check(Some("continue_prompt"), Duration::ZERO));
		// Zero cooldown: the same visible state may fire again.
		assert!(trigger.check(Some("continue_prompt"), Duration::ZERO));
	}

	#[test]
	fn no_detection_never_fires() {
		let mut trigger = Trigger::default();
		assert!(!trigger.check(None, REARM));
		assert!(!trigger.check(None, REARM));
	}
}
