//! Instance lockout timers.
//!
//! A lockout keys on (character, instance) and holds the UTC timestamp at
//! which re-entry becomes possible. The table is a flat JSON map so players
//! can inspect or hand-edit it.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};

#[derive(Debug)]
pub struct Lockouts {
	path: PathBuf,
	entries: HashMap<String, DateTime<Utc>>,
}

fn key(character: &str, instance: &str) -> String {
	format!("{character}::{instance}")
}

impl Lockouts {
	/// Load the lockout table; a missing file is an empty table.
	///
	/// Already-expired entries are dropped on load.
	pub fn load(path: PathBuf, now: DateTime<Utc>) -> Result<Self> {
		let entries = if path.is_file() {
			let file = File::open(&path).with_context(|| format!("Open lockouts {}", path.display()))?;
			let mut entries: HashMap<String, DateTime<Utc>> =
				serde_json::from_reader(BufReader::new(file))
					.with_context(|| format!("Parse lockouts {}", path.display()))?;
			entries.retain(|_, until| *until > now);
			entries
		} else {
			HashMap::new()
		};

		Ok(Self { path, entries })
	}

	/// Is the (character, instance) pair free to enter at `now`?
	pub fn can_enter(&self, character: &str, instance: &str, now: DateTime<Utc>) -> bool {
		match self.entries.get(&key(character, instance)) {
			Some(until) => *until <= now,
			None => true,
		}
	}

	/// Time left on a lockout, if one is active.
	pub fn remaining(&self, character: &str, instance: &str, now: DateTime<Utc>) -> Option<Duration> {
		let until = self.entries.get(&key(character, instance))?;
		if *until <= now {
			return None;
		}
		Some(*until - now)
	}

	/// Record a completion at `now`; the pair locks until `now + duration`.
	pub fn record_completion(
		&mut self,
		character: &str,
		instance: &str,
		now: DateTime<Utc>,
		duration: Duration,
	) {
		self.entries.insert(key(character, instance), now + duration);
	}

	pub fn save(&self) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			std::fs::create_dir_all(parent)
				.with_context(|| format!("Create lockout dir {}", parent.display()))?;
		}

		let tmp = self.path.with_extension("json.tmp");
		let file = File::create(&tmp).with_context(|| format!("Write lockouts temp {}", tmp.display()))?;
		let mut writer = BufWriter::new(file);
		serde_json::to_writer_pretty(&mut writer, &self.entries).context("Serialize lockouts")?;
		writer.flush().context("Flush lockouts")?;

		if std::fs::rename(&tmp, &self.path).is_err() {
			let _ = std::fs::remove_file(&self.path);
			std::fs::rename(&tmp, &self.path)
				.with_context(|| format!("Persist lockouts {}", self.path.display()))?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	fn t(hour: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
	}

	#[test]
	fn completion_locks_immediately_and_expires() {
		let dir = tempfile::tempdir().unwrap();
		let mut lockouts = Lockouts::load(dir.path().join("lockouts.json"), t(0)).unwrap();

		assert!(lockouts.can_enter("Fen", "Ember Depths", t(0)));

		lockouts.record_completion("Fen", "Ember Depths", t(0), Duration::hours(20));
		assert!(!lockouts.can_enter("Fen", "Ember Depths", t(0)));
		assert!(!lockouts.can_enter("Fen", "Ember Depths", t(19)));

		// Once the expiry timestamp passes, entry opens up again.
		assert!(lockouts.can_enter("Fen", "Ember Depths", t(20)));
	}

	#[test]
	fn lockouts_are_per_character_and_instance() {
		let dir = tempfile::tempdir().unwrap();
		let mut lockouts = Lockouts::load(dir.path().join("lockouts.json"), t(0)).unwrap();

		lockouts.record_completion("Fen", "Ember Depths", t(0), Duration::hours(20));
		assert!(lockouts.can_enter("Alt", "Ember Depths", t(1)));
		assert!(lockouts.can_enter("Fen", "Sunken Vault", t(1)));
	}

	#[test]
	fn expired_entries_are_purged_on_load() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("lockouts.json");

		let mut lockouts = Lockouts::load(path.clone(), t(0)).unwrap();
		lockouts.record_completion("Fen", "Ember Depths", t(0), Duration::hours(2));
		lockouts.save().unwrap();

		let reloaded = Lockouts::load(path, t(3)).unwrap();
		assert!(reloaded.entries.is_empty());
	}

	#[test]
	fn remaining_reports_time_left() {
		let dir = tempfile::tempdir().unwrap();
		let mut lockouts = Lockouts::load(dir.path().join("lockouts.json"), t(0)).unwrap();

		lockouts.record_completion("Fen", "Ember Depths", t(0), Duration::hours(20));
		assert_eq!(
			lockouts.remaining("Fen", "Ember Depths", t(5)),
			Some(Duration::hours(15))
		);
		assert_eq!(lockouts.remaining("Fen", "Ember Depths", t(21)), None);
	}
}
