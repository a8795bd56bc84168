//! Combat mode: safety responses, the weapon-swap heuristic and loot pickup
//! logging.
//!
//! The bot does not play combat; it reacts to the prompts combat produces.
//! Repeated ineffective-attack prompts mean the current weapon is wrong for
//! the target, so after a configured streak we cycle weapons.

use anyhow::Result;

use crate::input::parse_key;
use crate::lootlog::LootEvent;

use super::{parse_loot, Bot, DialogueFeed, Mode};

pub struct Combat {
	feed: Option<DialogueFeed>,
	miss_streak: u32,
	deaths: u32,
}

impl Combat {
	pub fn new() -> Self {
		Self {
			feed: None,
			miss_streak: 0,
			deaths: 0,
		}
	}

	fn on_state(&mut self, bot: &mut Bot, detection: &crate::detector::Detection) -> Result<()> {
		match detection.state.as_str() {
			"attack_no_effect" => {
				self.miss_streak += 1;
				let (threshold, swap_key) = {
					let cfg = crate::config::read();
					(cfg.combat.swap_after_misses, cfg.combat.weapon_swap_key)
				};

				if self.miss_streak >= threshold.max(1) {
					self.miss_streak = 0;
					if let Some(key) = parse_key(&swap_key.to_string()) {
						tracing::info!("weapon swap (attacks ineffective)");
						bot.dispatcher.tap_key(key)?;
					}
				}
			}
			"revive_prompt" => {
				// The scripted response already clicked revive.
				self.deaths += 1;
				self.miss_streak = 0;
				tracing::warn!(deaths = self.deaths, "died; revived");
				if let Some(discord) = &bot.discord {
					discord.send(&format!("scrybot died ({} this session), revived", self.deaths));
				}
			}
			"loot_toast" => {
				self.miss_streak = 0;
				if let Some((quantity, raw)) = parse_loot(&detection.dialogue.text) {
					let item = bot.data.find_item_name(&raw);
					let rare = bot.data.rare_items.contains(&item);
					bot.loot.record(LootEvent {
						at: detection.detected_at,
						item: item.clone(),
						quantity,
						source: "drop".to_string(),
						mode: self.name().to_string(),
					})?;

					if rare {
						if let Some(discord) = &bot.discord {
							discord.send(&format!("Rare drop: **{item}** x{quantity}"));
						}
					}
				}
			}
			_ => {
				self.miss_streak = 0;
			}
		}
		Ok(())
	}
}

impl Mode for Combat {
	fn name(&self) -> &'static str {
		"combat"
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
			let detection = bot.detector.detect(&bot.vision, &frame);
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
