//! Quest mode: walk NPC dialogue, accept and turn in quests, log the loot.

use anyhow::Result;
use chrono::{Duration, Utc};

use crate::lootlog::LootEvent;
use crate::patterns::ActionSpec;

use super::{parse_loot, Bot, DialogueFeed, Mode};

pub struct Quest {
	feed: Option<DialogueFeed>,
	offers_handled: u32,
	turn_ins: u32,
}

impl Quest {
	pub fn new() -> Self {
		Self {
			feed: None,
			offers_handled: 0,
			turn_ins: 0,
		}
	}

	/// Bookkeeping that must run once per state appearance (the dispatcher
	/// reports whether this cycle actually fired).
	fn on_state(&mut self, bot: &mut Bot, detection: &crate::detector::Detection) -> Result<()> {
		match detection.state.as_str() {
			"quest_offer" => {
				self.offers_handled += 1;
				tracing::info!(total = self.offers_handled, "quest offer handled");
			}
			"quest_turn_in" => {
				self.turn_ins += 1;
				self.record_lockouts(bot, detection);
				bot.loot.record(LootEvent {
					at: detection.detected_at,
					item: "Quest Turn-in".to_string(),
					quantity: 1,
					source: "quest".to_string(),
					mode: self.name().to_string(),
				})?;
			}
			"loot_toast" => {
				if let Some((quantity, raw)) = parse_loot(&detection.dialogue.text) {
					let item = bot.data.find_item_name(&raw);
					bot.loot.record(LootEvent {
						at: detection.detected_at,
						item,
						quantity,
						source: "drop".to_string(),
						mode: self.name().to_string(),
					})?;
				}
			}
			"level_up" => {
				if let Some(discord) = &bot.discord {
					discord.send(&format!("Level up during questing: {}", detection.dialogue.text));
				}
			}
			_ => {}
		}
		Ok(())
	}

	/// Instance named in the offer text that is still locked out, if any.
	fn locked_instance(&self, bot: &Bot, text: &str) -> Option<String> {
		let (character, instances) = {
			let cfg = crate::config::read();
			(cfg.character.clone(), cfg.lockout.hours_by_instance.clone())
		};

		let text = text.to_ascii_lowercase();
		let now = Utc::now();
		instances
			.keys()
			.find(|instance| {
				text.contains(&instance.to_ascii_lowercase())
					&& !bot.lockouts.can_enter(&character, instance, now)
			})
			.cloned()
	}

	/// A turn-in inside a configured instance starts its lockout.
	fn record_lockouts(&mut self, bot: &mut Bot, detection: &crate::detector::Detection) {
		let (character, instances, default_hours) = {
			let cfg = crate::config::read();
			(
				cfg.character.clone(),
				cfg.lockout.hours_by_instance.clone(),
				cfg.lockout.default_hours,
			)
		};

		let text = detection.dialogue.text.to_ascii_lowercase();
		let now = Utc::now();
		for (instance, hours) in instances {
			if !text.contains(&instance.to_ascii_lowercase()) {
				continue;
			}
			let hours = if hours > 0.0 { hours } else { default_hours };
			bot.lockouts.record_completion(
				&character,
				&instance,
				now,
				Duration::seconds((hours * 3600.0) as i64),
			);
			if let Err(err) = bot.lockouts.save() {
				tracing::warn!(error = %err, "failed to persist lockouts");
			}
			tracing::info!(%instance, hours, "lockout recorded");
		}
	}
}

impl Mode for Quest {
	fn name(&self) -> &'static str {
		"quest"
	}

	fn start(&mut self, bot: &mut Bot) -> Result<()> {
		self.feed = Some(DialogueFeed::attach(&bot.poller));
		Ok(())
	}

	fn tick(&mut self, bot: &mut Bot) -> Result<()> {
		let Some(feed) = &mut self.feed else {
			return Ok(());
		};

		if let Some(frame) = feed.latest_frame() {
			let mut detection = bot.detector.detect(&bot.vision, &frame);

			// Offers are only auto-accepted when configured and the instance
			// is off lockout; otherwise we still consume the appearance (so
			// it logs once) but decline or do nothing.
			if let Some(d) = &mut detection {
				if d.state == "quest_offer" {
					if let Some(instance) = self.locked_instance(bot, &d.dialogue.text) {
						tracing::info!(%instance, "offer declined: instance still locked out");
						d.action = if d.dialogue.options.len() > 1 {
							// Decline is the second option row.
							ActionSpec::ClickOption { index: 1 }
						} else {
							ActionSpec::Ignore
						};
					} else if !crate::config::read().quest.auto_accept {
						d.action = ActionSpec::Ignore;
					}
				}
			}

			let fired = bot.dispatcher.handle(detection.as_ref())?;
			if fired {
				if let Some(d) = detection {
					self.on_state(bot, &d)?;
				}
			}
		} else if feed.gone_quiet() {
			bot.dispatcher.handle(None)?;
		}

		Ok(())
	}
}
