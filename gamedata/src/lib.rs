use std::{
	collections::{HashMap, HashSet},
	fs::File,
	io::{BufReader, BufWriter, Write},
	path::PathBuf,
};

use anyhow::{Context, Result};

mod history;
mod pricepage;
mod schema;

pub use history::{Observation, PriceHistory};

/// Item dataset used to resolve dirty OCR strings and value loot.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Data {
	/// Going market price per item (gold).
	pub market_prices: HashMap<String, u32>,
	/// Canonical item names, used as the fuzzy-match universe.
	pub item_names: HashSet<String>,
	/// Items worth an alert when they drop or show up underpriced.
	pub rare_items: HashSet<String>,
}

impl Default for Data {
	fn default() -> Self {
		let mut s = Self {
			market_prices: HashMap::new(),
			item_names: HashSet::new(),
			rare_items: HashSet::new(),
		};

		// Staple drops the price feed doesn't carry. Keeping them in the name
		// universe means loot OCR still resolves them when the API is down.
		for name in ["Gold Pouch", "Worn Pelt", "Tattered Scroll"] {
			s.item_names.insert(name.to_string());
		}

		s
	}
}

impl Data {
	fn cache_path() -> Option<PathBuf> {
		dirs::cache_dir().map(|p| p.join("scrybot").join("data_cache.json"))
	}

	fn load_cache() -> Result<Self> {
		let path = Self::cache_path().context("No cache_dir available")?;
		let file = File::open(&path).with_context(|| format!("Open cache {}", path.display()))?;
		let reader = BufReader::new(file);
		let data: Self = serde_json::from_reader(reader).with_context(|| format!("Parse cache {}", path.display()))?;
		Ok(data)
	}

	fn save_cache(&self) -> Result<()> {
		let Some(path) = Self::cache_path() else {
			return Ok(());
		};
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent).with_context(|| format!("Create cache dir {}", parent.display()))?;
		}

		let tmp = path.with_extension("json.tmp");
		let file = File::create(&tmp).with_context(|| format!("Write cache temp {}", tmp.display()))?;
		let mut writer = BufWriter::new(file);
		serde_json::to_writer(&mut writer, self).context("Serialize cache")?;
		writer.flush().context("Flush cache")?;

		// Replace existing file (Windows-friendly).
		if std::fs::rename(&tmp, &path).is_err() {
			let _ = std::fs::remove_file(&path);
			std::fs::rename(&tmp, &path).with_context(|| format!("Persist cache {}", path.display()))?;
		}
		Ok(())
	}

	fn fetch_remote() -> Result<Self> {
		let mut res = ureq::get(schema::items::URL)
			.call()
			.context("GET items")?;
		let items = res
			.body_mut()
			.read_json::<schema::items::Items>()
			.context("Decode items JSON")?;

		let mut s = Self::default();

		for item in &items.data {
			s.item_names.insert(item.name.clone());
			if let Some(rarity) = item.rarity.as_deref() {
				if matches!(rarity, "rare" | "epic" | "legendary") {
					s.rare_items.insert(item.name.clone());
				}
			}
		}

		// Prices come from a separate endpoint. Best-effort: a missing price
		// feed still leaves the name universe usable.
		match fetch_prices() {
			Ok(prices) => s.market_prices = prices,
			Err(err) => tracing::warn!("price feed unavailable: {err:#}"),
		}

		Ok(s)
	}

	/// Fetch from the network; fall back to the HTML price board, then to a
	/// cached copy (if available).
	pub fn try_populated() -> Result<Self> {
		let fetched = Self::fetch_remote().or_else(|api_err| {
			tracing::warn!("item API unavailable, scraping price board: {api_err:#}");
			pricepage::scraped()
		});

		match fetched {
			Ok(data) => {
				let _ = data.save_cache();
				Ok(data)
			}
			Err(err) => {
				if let Ok(cached) = Self::load_cache() {
					tracing::warn!("Using cached item data due to network error: {err:#}");
					Ok(cached)
				} else {
					Err(err)
				}
			}
		}
	}

	/// Never errors: empty defaults when both the network and the cache fail.
	pub fn populated() -> Self {
		Self::try_populated().unwrap_or_else(|err| {
			tracing::warn!("Failed to load item data (no cache): {err:#}");
			Self::default()
		})
	}

	/// Attempts to find the closest item name from a dirty ocr string
	pub fn find_item_name(&self, name: &str) -> String {
		let name = name.trim_ascii();
		// When OCR returns an empty/near-empty string, *don't* guess.
		// Levenshtein over the whole universe tends to pick the shortest
		// item name, which makes logs look "stuck" on one item.
		if name.len() < 3 {
			return "(unreadable)".to_string();
		}
		if self.item_names.contains(name) {
			return name.to_owned();
		}

		// OCR often prepends pickup-message fragments ("You receive ..."),
		// so retry on each suffix starting at a word boundary.
		let mut start = 0;
		while let Some(index) = name[start..].find(' ') {
			start += index + 1;
			let sub = &name[start..];
			if self.item_names.contains(sub) {
				return sub.to_owned();
			}
		}

		let mut min_name = name;
		let mut min = usize::MAX;
		for item_name in self.item_names.iter() {
			let lev = levenshtein::levenshtein(name, item_name);
			if lev < min {
				min_name = item_name.as_str();
				min = lev;
			}
		}

		// If the best match is still very far away, show the raw OCR text
		// so it's obvious OCR failed instead of silently "guessing".
		let max_len = name.len().max(min_name.len());
		if min > (max_len / 2).max(3) {
			return format!("{name}?");
		}

		min_name.to_string()
	}
}

fn fetch_prices() -> Result<HashMap<String, u32>> {
	let mut res = ureq::get(schema::prices::URL)
		.call()
		.context("GET prices")?;
	let prices = res
		.body_mut()
		.read_json::<schema::prices::Prices>()
		.context("Decode prices JSON")?;

	let mut map = HashMap::new();
	for entry in prices.payload.previous_day {
		map.insert(entry.name, entry.median_price.round().max(0.0) as u32);
	}
	Ok(map)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_data() -> Data {
		let mut data = Data::default();
		for name in ["Iron Longsword", "Silk Bandage", "Ember Crystal"] {
			data.item_names.insert(name.to_string());
		}
		data
	}

	#[test]
	fn exact_name_passes_through() {
		let data = sample_data();
		assert_eq!(data.find_item_name("Iron Longsword"), "Iron Longsword");
	}

	#[test]
	fn pickup_prefix_is_stripped() {
		let data = sample_data();
		assert_eq!(data.find_item_name("You receive Silk Bandage"), "Silk Bandage");
	}

	#[test]
	fn close_ocr_garbage_resolves_by_distance() {
		let data = sample_data();
		assert_eq!(data.find_item_name("Iron Longsw0rd"), "Iron Longsword");
	}

	#[test]
	fn near_empty_input_is_not_guessed() {
		let data = sample_data();
		assert_eq!(data.find_item_name("  a "), "(unreadable)");
	}

	#[test]
	fn far_matches_are_flagged_not_guessed() {
		let data = sample_data();
		assert_eq!(data.find_item_name("Completely Unrelated Words"), "Completely Unrelated Words?");
	}
}
