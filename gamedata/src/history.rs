//! Observed vendor price history.
//!
//! Every vendor scan appends observations; the file is a plain JSON map so it
//! stays hand-inspectable. Writes go through a temp file + rename, same as
//! the dataset cache.

use std::{
	collections::HashMap,
	fs::File,
	io::{BufReader, BufWriter, Write},
	path::PathBuf,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Observation {
	pub price: u32,
	pub vendor: String,
	pub at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct PriceHistory {
	path: PathBuf,
	entries: HashMap<String, Vec<Observation>>,
}

impl PriceHistory {
	/// Load history from `path`; a missing file is an empty history.
	pub fn load(path: PathBuf) -> Result<Self> {
		if !path.is_file() {
			return Ok(Self { path, entries: HashMap::new() });
		}

		let file = File::open(&path).with_context(|| format!("Open history {}", path.display()))?;
		let reader = BufReader::new(file);
		let entries = serde_json::from_reader(reader)
			.with_context(|| format!("Parse history {}", path.display()))?;
		Ok(Self { path, entries })
	}

	pub fn record(&mut self, item: &str, vendor: &str, price: u32, at: DateTime<Utc>) {
		self.entries
			.entry(item.to_string())
			.or_default()
			.push(Observation {
				price,
				vendor: vendor.to_string(),
				at,
			});
	}

	/// Most recent observation for an item.
	pub fn latest(&self, item: &str) -> Option<&Observation> {
		self.entries.get(item)?.iter().max_by_key(|o| o.at)
	}

	/// Median observed price for an item.
	pub fn median(&self, item: &str) -> Option<u32> {
		let observations = self.entries.get(item)?;
		if observations.is_empty() {
			return None;
		}
		let mut prices: Vec<u32> = observations.iter().map(|o| o.price).collect();
		prices.sort_unstable();
		Some(prices[prices.len() / 2])
	}

	pub fn save(&self) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			std::fs::create_dir_all(parent)
				.with_context(|| format!("Create history dir {}", parent.display()))?;
		}

		let tmp = self.path.with_extension("json.tmp");
		let file = File::create(&tmp).with_context(|| format!("Write history temp {}", tmp.display()))?;
		let mut writer = BufWriter::new(file);
		serde_json::to_writer(&mut writer, &self.entries).context("Serialize history")?;
		writer.flush().context("Flush history")?;

		if std::fs::rename(&tmp, &self.path).is_err() {
			let _ = std::fs::remove_file(&self.path);
			std::fs::rename(&tmp, &self.path)
				.with_context(|| format!("Persist history {}", self.path.display()))?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	#[test]
	fn history_round_trips_through_disk() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("prices.json");

		let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
		let t1 = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();

		let mut history = PriceHistory::load(path.clone()).unwrap();
		history.record("Ember Crystal", "Maro", 120, t0);
		history.record("Ember Crystal", "Maro", 90, t1);
		history.save().unwrap();

		let reloaded = PriceHistory::load(path).unwrap();
		assert_eq!(reloaded.latest("Ember Crystal").unwrap().price, 90);
		assert_eq!(reloaded.median("Ember Crystal"), Some(120));
	}

	#[test]
	fn missing_file_is_empty_history() {
		let dir = tempfile::tempdir().unwrap();
		let history = PriceHistory::load(dir.path().join("none.json")).unwrap();
		assert!(history.latest("Anything").is_none());
		assert!(history.median("Anything").is_none());
	}
}
