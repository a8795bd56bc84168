//! Vendor mode: open vendor dialogues, scan the inventory table, record
//! prices and flag underpriced listings.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;

use crate::poller::{FrameReceiver, WatchKind};

use super::{Bot, DialogueFeed, Mode};

pub struct Vendor {
	feed: Option<DialogueFeed>,
	vendor_rx: Option<FrameReceiver>,
	last_scan: Option<Instant>,
	scans: u32,
}

/// Minimum time between two scans of the same open vendor screen.
const SCAN_COOLDOWN: Duration = Duration::from_secs(5);

impl Vendor {
	pub fn new() -> Self {
		Self {
			feed: None,
			vendor_rx: None,
			last_scan: None,
			scans: 0,
		}
	}

	fn scan(&mut self, bot: &mut Bot, frame: &Arc<vision::OwnedImage>) -> Result<()> {
		if let Some(at) = self.last_scan {
			if at.elapsed() < SCAN_COOLDOWN {
				return Ok(());
			}
		}
		self.last_scan = Some(Instant::now());

		let listings = bot.vision.vendor_listings(frame.as_image());
		if listings.is_empty() {
			return Ok(());
		}
		self.scans += 1;

		let underprice_ratio = crate::config::read().vendor.underprice_ratio;
		let now = Utc::now();

		for listing in &listings {
			let item = bot.data.find_item_name(&listing.name);
			// Unresolvable OCR rows would poison the history; skip them.
			if item.ends_with('?') || item == "(unreadable)" {
				continue;
			}

			bot.history.record(&item, "vendor", listing.price, now);

			if let Some(market) = bot.data.market_prices.get(&item) {
				let threshold = (*market as f32 * underprice_ratio) as u32;
				if listing.price < threshold {
					tracing::info!(%item, price = listing.price, market, "underpriced listing");
					if let Some(discord) = &bot.discord {
						discord.send(&format!(
							"Underpriced: **{item}** at {} (market {})",
							listing.price, market
						));
					}
				}
			}
		}

		if let Err(err) = bot.history.save() {
			tracing::warn!(error = %err, "failed to persist price history");
		}
		tracing::info!(rows = listings.len(), scan = self.scans, "vendor scan complete");
		Ok(())
	}

	/// Click the "browse wares" option on a vendor greeting.
	fn open_shop(&mut self, bot: &mut Bot, detection: &crate::detector::Detection) -> Result<()> {
		let index = detection
			.dialogue
			.options
			.iter()
			.position(|opt| {
				let label = opt.label.to_ascii_lowercase();
				label.contains("browse") || label.contains("trade") || label.contains("buy")
			})
			.unwrap_or(0);
		bot.dispatcher.click_option(detection, index)?;

		// The table takes a moment to open; pull the next poll forward so the
		// first scan isn't a full interval away.
		bot.poller.nudge_at(Instant::now() + Duration::from_millis(400));
		Ok(())
	}
}

impl Mode for Vendor {
	fn name(&self) -> &'static str {
		"vendor"
	}

	fn start(&mut self, bot: &mut Bot) -> Result<()> {
		self.feed = Some(DialogueFeed::attach(&bot.poller));

		let (tx, rx) = std::sync::mpsc::channel();
		bot.poller.watch(WatchKind::VendorScreen, tx);
		self.vendor_rx = Some(rx);
		Ok(())
	}

	fn tick(&mut self, bot: &mut Bot) -> Result<()> {
		// 1) Dialogue handling (vendor greetings).
		if let Some(feed) = &mut self.feed {
			if let Some(frame) = feed.latest_frame() {
				let detection = bot.detector.detect(&bot.vision, &frame);
				let fired = bot.dispatcher.handle(detection.as_ref())?;
				if fired {
					if let Some(d) = detection {
						if d.state == "vendor_greeting" {
							self.open_shop(bot, &d)?;
						}
					}
				}
			} else if feed.gone_quiet() {
				bot.dispatcher.handle(None)?;
			}
		}

		// 2) Inventory scanning whenever the vendor table is on screen.
		let frame = {
			let Some(rx) = &self.vendor_rx else {
				return Ok(());
			};
			let mut latest = None;
			while let Ok(frame) = rx.try_recv() {
				latest = Some(frame);
			}
			latest
		};
		if let Some(frame) = frame {
			self.scan(bot, &frame)?;
		}

		Ok(())
	}
}
