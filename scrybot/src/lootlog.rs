//! Loot and session logging.
//!
//! Loot events append to a JSON Lines file per day (one object per line, so
//! a crash mid-session loses at most one line). The session summary is a
//! separate pretty JSON document written on shutdown.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LootEvent {
	pub at: DateTime<Utc>,
	pub item: String,
	pub quantity: u32,
	/// Where the item came from ("drop", "quest", "vendor").
	pub source: String,
	pub mode: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionSummary {
	pub mode: String,
	pub started_at: DateTime<Utc>,
	pub ended_at: DateTime<Utc>,
	pub events: usize,
	/// Total quantity per item, sorted by name for stable output.
	pub items: BTreeMap<String, u32>,
}

#[derive(Debug)]
pub struct LootLog {
	dir: PathBuf,
	mode: String,
	started_at: DateTime<Utc>,
	session: Vec<LootEvent>,
}

impl LootLog {
	pub fn open(dir: PathBuf, mode: &str, started_at: DateTime<Utc>) -> Result<Self> {
		std::fs::create_dir_all(&dir).with_context(|| format!("Create logs dir {}", dir.display()))?;
		Ok(Self {
			dir,
			mode: mode.to_string(),
			started_at,
			session: Vec::new(),
		})
	}

	fn day_path(&self, day: NaiveDate) -> PathBuf {
		self.dir.join(format!("loot-{}.jsonl", day.format("%Y-%m-%d")))
	}

	/// Append one event to today's log file and the in-memory session.
	pub fn record(&mut self, event: LootEvent) -> Result<()> {
		let path = self.day_path(event.at.date_naive());
		let line = serde_json::to_string(&event).context("Serialize loot event")?;

		let mut file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(&path)
			.with_context(|| format!("Open loot log {}", path.display()))?;
		writeln!(file, "{line}").with_context(|| format!("Append loot log {}", path.display()))?;

		self.session.push(event);
		Ok(())
	}

	/// Read back a day's events (skipping unparseable lines with a warning).
	pub fn export_day(&self, day: NaiveDate) -> Result<Vec<LootEvent>> {
		let path = self.day_path(day);
		if !path.is_file() {
			return Ok(Vec::new());
		}

		let file = std::fs::File::open(&path).with_context(|| format!("Open loot log {}", path.display()))?;
		let mut events = Vec::new();
		for line in BufReader::new(file).lines() {
			let line = line.with_context(|| format!("Read loot log {}", path.display()))?;
			if line.trim().is_empty() {
				continue;
			}
			match serde_json::from_str::<LootEvent>(&line) {
				Ok(event) => events.push(event),
				Err(err) => tracing::warn!(error = %err, "skipping corrupt loot log line"),
			}
		}
		Ok(events)
	}

	pub fn summary(&self, ended_at: DateTime<Utc>) -> SessionSummary {
		let mut items: BTreeMap<String, u32> = BTreeMap::new();
		for event in &self.session {
			*items.entry(event.item.clone()).or_insert(0) += event.quantity;
		}

		SessionSummary {
			mode: self.mode.clone(),
			started_at: self.started_at,
			ended_at,
			events: self.session.len(),
			items,
		}
	}

	/// Write the session summary document (called on shutdown).
	pub fn write_summary(&self, ended_at: DateTime<Utc>) -> Result<PathBuf> {
		let summary = self.summary(ended_at);
		let path = self.dir.join(format!(
			"session-{}.json",
			self.started_at.format("%Y%m%dT%H%M%S")
		));
		let json = serde_json::to_string_pretty(&summary).context("Serialize session summary")?;
		std::fs::write(&path, json).with_context(|| format!("Write summary {}", path.display()))?;
		Ok(path)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	fn t(min: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2026, 3, 1, 10, min, 0).unwrap()
	}

	fn event(at: DateTime<Utc>, item: &str, quantity: u32) -> LootEvent {
		LootEvent {
			at,
			item: item.to_string(),
			quantity,
			source: "drop".to_string(),
			mode: "quest".to_string(),
		}
	}

	#[test]
	fn events_round_trip_through_the_day_file() {
		let dir = tempfile::tempdir().unwrap();
		let mut log = LootLog::open(dir.path().to_path_buf(), "quest", t(0)).unwrap();

		log.record(event(t(1), "Worn Pelt", 2)).unwrap();
		log.record(event(t(2), "Ember Crystal", 1)).unwrap();

		let exported = log.export_day(t(0).date_naive()).unwrap();
		assert_eq!(exported.len(), 2);
		assert_eq!(exported[0].item, "Worn Pelt");
		assert_eq!(exported[1].quantity, 1);
	}

	#[test]
	fn summary_totals_quantities_per_item() {
		let dir = tempfile::tempdir().unwrap();
		let mut log = LootLog::open(dir.path().to_path_buf(), "combat", t(0)).unwrap();

		log.record(event(t(1), "Worn Pelt", 2)).unwrap();
		log.record(event(t(3), "Worn Pelt", 3)).unwrap();

		let summary = log.summary(t(10));
		assert_eq!(summary.events, 2);
		assert_eq!(summary.items["Worn Pelt"], 5);
		assert_eq!(summary.mode, "combat");
	}

	#[test]
	fn summary_document_is_valid_json() {
		let dir = tempfile::tempdir().unwrap();
		let mut log = LootLog::open(dir.path().to_path_buf(), "quest", t(0)).unwrap();
		log.record(event(t(1), "Gold Pouch", 1)).unwrap();

		let path = log.write_summary(t(30)).unwrap();
		let text = std::fs::read_to_string(path).unwrap();
		let parsed: SessionSummary = serde_json::from_str(&text).unwrap();
		assert_eq!(parsed.items["Gold Pouch"], 1);
	}

	#[test]
	fn corrupt_lines_are_skipped_on_export() {
		let dir = tempfile::tempdir().unwrap();
		let mut log = LootLog::open(dir.path().to_path_buf(), "quest", t(0)).unwrap();
		log.record(event(t(1), "Worn Pelt", 1)).unwrap();

		let day = t(0).date_naive();
		let path = dir.path().join(format!("loot-{}.jsonl", day.format("%Y-%m-%d")));
		let mut file = OpenOptions::new().append(true).open(&path).unwrap();
		writeln!(file, "not json at all").unwrap();

		let exported = log.export_day(day).unwrap();
		assert_eq!(exported.len(), 1);
	}
}
