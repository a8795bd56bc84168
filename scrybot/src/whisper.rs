//! Whisper monitor.
//!
//! Polls the chat region on its own thread, extracts incoming whispers by
//! regex and pushes them into a queue the active mode can drain. The thread
//! stops when the shared stop flag flips.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryIter};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;

#[derive(Debug, Clone, serde::Serialize)]
pub struct Whisper {
	pub from: String,
	pub message: String,
	pub received_at: DateTime<Utc>,
}

static WHISPER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)^(?:\[\d+:\d+\]\s*)?(?<from>[A-Za-z][\w']*)\s+whispers:?\s+(?<msg>.+)$").expect("regex")
});

pub struct WhisperMonitor {
	rx: Receiver<Whisper>,
	stop: Arc<AtomicBool>,
}

impl WhisperMonitor {
	/// Spawn the monitor thread.
	///
	/// The thread captures independently of the main poller: whisper checks
	/// run at their own (usually slower) cadence and must keep working even
	/// when a mode has pulled the poller somewhere else.
	pub fn spawn(
		vision: Arc<vision::Vision>,
		discord: Option<Arc<crate::discord::Notifier>>,
		stop: Arc<AtomicBool>,
	) -> Self {
		let (tx, rx) = std::sync::mpsc::channel();
		let thread_stop = stop.clone();

		std::thread::spawn(move || {
			let mut recent: Vec<String> = Vec::new();

			while !thread_stop.load(Ordering::Relaxed) {
				let delay = {
					let cfg = crate::config::read();
					if !cfg.whisper.enabled {
						// Disabled at runtime: idle cheaply, re-check later.
						drop(cfg);
						std::thread::sleep(Duration::from_secs(5));
						continue;
					}
					Duration::from_secs_f32(cfg.whisper.poll_delay_s.max(0.25))
				};

				if let Some(frame) = crate::capture::capture() {
					let lines = vision.chat_lines(frame.as_image());
					for line in lines {
						let Some(whisper) = parse_line(&line) else {
							continue;
						};

						// The chat log keeps old lines on screen; only emit
						// lines we haven't seen in the last few captures.
						if recent.contains(&line) {
							continue;
						}
						recent.push(line.clone());
						if recent.len() > 16 {
							recent.remove(0);
						}

						tracing::info!(from = %whisper.from, "whisper received");
						if let Some(discord) = &discord {
							if crate::config::read().whisper.forward_to_discord {
								discord.send(&format!(
									"**{}** whispers: {}",
									whisper.from, whisper.message
								));
							}
						}
						let _ = tx.send(whisper);
					}
				}

				std::thread::sleep(delay);
			}
		});

		Self { rx, stop }
	}

	/// Drain whispers received since the last call.
	pub fn drain(&self) -> TryIter<'_, Whisper> {
		self.rx.try_iter()
	}

	pub fn stop(&self) {
		self.stop.store(true, Ordering::Relaxed);
	}
}

fn parse_line(line: &str) -> Option<Whisper> {
	let caps = WHISPER_REGEX.captures(line.trim())?;
	Some(Whisper {
		from: caps.name("from")?.as_str().to_string(),
		message: caps.name("msg")?.as_str().trim().to_string(),
		received_at: Utc::now(),
	})
}

#[cfg(test)]
mod tests {
	use super::parse_line;

	#[test]
	fn plain_whisper_parses() {
		let w = parse_line("Aldric whispers: meet me at the gate").unwrap();
		assert_eq!(w.from, "Aldric");
		assert_eq!(w.message, "meet me at the gate");
	}

	#[test]
	fn timestamped_whisper_parses() {
		let w = parse_line("[12:30] Mira whispers need a healer?").unwrap();
		assert_eq!(w.from, "Mira");
		assert_eq!(w.message, "need a healer?");
	}

	#[test]
	fn ordinary_chat_is_ignored() {
		assert!(parse_line("Aldric says: hello").is_none());
		assert!(parse_line("You receive Worn Pelt").is_none());
		assert!(parse_line("").is_none());
	}
}
