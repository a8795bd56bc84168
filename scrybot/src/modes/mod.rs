mod combat;
pub use combat::Combat;
mod quest;
pub use quest::Quest;
mod vendor;
pub use vendor::Vendor;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use anyhow::Result;
use regex::Regex;

use crate::detector::Detector;
use crate::dispatch::Dispatcher;
use crate::lockout::Lockouts;
use crate::lootlog::LootLog;
use crate::poller::{FrameReceiver, Poller, WatchKind};

/// Shared plumbing handed to the active mode.
pub struct Bot {
	pub vision: Arc<vision::Vision>,
	pub detector: Detector,
	pub dispatcher: Dispatcher,
	pub poller: Poller,
	pub loot: LootLog,
	pub lockouts: Lockouts,
	pub data: gamedata::Data,
	pub history: gamedata::PriceHistory,
	pub discord: Option<Arc<crate::discord::Notifier>>,
	pub stop: Arc<AtomicBool>,
}

/// A behavior module selected by `--mode`.
pub trait Mode {
	fn name(&self) -> &'static str;

	/// Called once before the loop starts (register poller watchers here).
	#[allow(unused_variables)]
	fn start(&mut self, bot: &mut Bot) -> Result<()> {
		Ok(())
	}

	/// One iteration of the control loop.
	fn tick(&mut self, bot: &mut Bot) -> Result<()>;
}

pub fn by_name(name: &str) -> Option<Box<dyn Mode>> {
	match name {
		"quest" => Some(Box::new(Quest::new())),
		"combat" => Some(Box::new(Combat::new())),
		"vendor" => Some(Box::new(Vendor::new())),
		_ => None,
	}
}

// ----------

/// Dialogue frames fanned out by the poller, with "the dialogue left the
/// screen" tracking so the dispatcher's trigger can re-arm.
pub(crate) struct DialogueFeed {
	rx: FrameReceiver,
	last_frame_at: Option<Instant>,
}

impl DialogueFeed {
	pub fn attach(poller: &Poller) -> Self {
		let (tx, rx) = std::sync::mpsc::channel();
		poller.watch(WatchKind::DialogueScreen, tx);
		Self {
			rx,
			last_frame_at: None,
		}
	}

	/// Drain the channel and return the newest frame, if any arrived.
	pub fn latest_frame(&mut self) -> Option<Arc<vision::OwnedImage>> {
		let mut latest = None;
		while let Ok(frame) = self.rx.try_recv() {
			latest = Some(frame);
		}
		if latest.is_some() {
			self.last_frame_at = Some(Instant::now());
		}
		latest
	}

	/// True when no dialogue frame arrived for two poll intervals.
	pub fn gone_quiet(&mut self) -> bool {
		let poll = crate::config::read().poll_delay_s.max(0.1);
		match self.last_frame_at {
			Some(at) if at.elapsed() > Duration::from_secs_f32(poll * 2.0) => {
				self.last_frame_at = None;
				true
			}
			_ => false,
		}
	}
}

// ----------

static LOOT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)\byou (?:receive|loot|pick up)\s*(?:x?\s*(?<qty>\d+)\s+)?(?<item>.+)")
		.expect("regex")
});

/// Parse a loot toast ("You receive x2 Worn Pelt") into `(quantity, raw name)`.
pub(crate) fn parse_loot(text: &str) -> Option<(u32, String)> {
	let caps = LOOT_REGEX.captures(text)?;
	let quantity = caps
		.name("qty")
		.and_then(|m| m.as_str().parse::<u32>().ok())
		.unwrap_or(1);
	let item = caps.name("item")?.as_str().trim().trim_end_matches('.').to_string();
	if item.is_empty() {
		return None;
	}
	Some((quantity, item))
}

#[cfg(test)]
mod tests {
	use super::parse_loot;

	#[test]
	fn loot_toast_with_quantity_parses() {
		assert_eq!(
			parse_loot("You receive x2 Worn Pelt"),
			Some((2, "Worn Pelt".to_string()))
		);
	}

	#[test]
	fn loot_toast_without_quantity_defaults_to_one() {
		assert_eq!(
			parse_loot("you pick up Ember Crystal."),
			Some((1, "Ember Crystal".to_string()))
		);
	}

	#[test]
	fn non_loot_text_is_none() {
		assert_eq!(parse_loot("You have died"), None);
		assert_eq!(parse_loot(""), None);
	}
}
