use std::{
	sync::{
		mpsc::{Receiver, Sender},
		Arc, Condvar, Mutex,
	},
	time::{Duration, Instant},
};

#[derive(Debug, Clone)]
pub enum WatchKind {
	/// Lowercased string we want to see somewhere in the chat lines.
	ChatText(String),
	/// Cheap detector for a visible dialogue panel (no OCR).
	DialogueScreen,
	/// Cheap detector for the vendor inventory table (no OCR).
	VendorScreen,
}

pub type FrameReceiver = Receiver<Arc<vision::OwnedImage>>;

type Watching = Arc<Mutex<Vec<(WatchKind, Sender<Arc<vision::OwnedImage>>)>>>;
type Schedule = Arc<(Mutex<Instant>, Condvar)>;

/// Background capture scheduler.
///
/// One thread captures the game window on the configured interval, computes
/// only what registered watchers need (chat OCR is expensive, the screen
/// checks are not) and fans matching frames out to watcher channels.
#[derive(Clone)]
pub struct Poller {
	next_poll: Schedule,
	watching: Watching,
}

impl Poller {
	pub fn new(vision: Arc<vision::Vision>) -> Self {
		let next_poll: Schedule = Arc::new((Mutex::new(Instant::now()), Condvar::new()));
		let watching: Watching = Arc::new(Mutex::new(Vec::new()));

		let next_poll_thread = next_poll.clone();
		let watching_thread = watching.clone();

		std::thread::spawn(move || {
			// NOTE: this is a best-effort background worker.
			// Any failure should log and keep going.
			loop {
				// 1) Wait until it's time to poll (or until someone updates the schedule).
				{
					let (lock, cv) = &*next_poll_thread;
					let mut next = lock.lock().expect("next_poll lock poisoned");
					loop {
						let now = Instant::now();
						if *next <= now {
							break;
						}
						let dur = next.saturating_duration_since(now);
						let (guard, _timeout) = cv
							.wait_timeout(next, dur)
							.expect("next_poll lock poisoned during wait");
						next = guard;
					}
				}

				// 2) Do the expensive part without holding locks.
				if let Some(frame) = crate::capture::capture() {
					let frame = Arc::new(frame);

					// Snapshot watchers so sending can't block the watcher lock.
					let watchers = {
						watching_thread
							.lock()
							.expect("watching lock poisoned")
							.clone()
					};

					// Only OCR the chat region if any watcher needs it.
					let needs_chat = watchers.iter().any(|(kind, _)| matches!(kind, WatchKind::ChatText(_)));
					let chat_lines = if needs_chat {
						Some(
							vision
								.chat_lines(frame.as_image())
								.into_iter()
								.map(|l| l.to_ascii_lowercase())
								.collect::<Vec<_>>(),
						)
					} else {
						None
					};

					// Cheap screen detection (no OCR).
					let needs_dialogue = watchers.iter().any(|(kind, _)| matches!(kind, WatchKind::DialogueScreen));
					let on_dialogue = if needs_dialogue {
						Some(vision.dialogue_is_screen(frame.as_image()))
					} else {
						None
					};

					let needs_vendor = watchers.iter().any(|(kind, _)| matches!(kind, WatchKind::VendorScreen));
					let on_vendor = if needs_vendor {
						Some(vision.vendor_is_screen(frame.as_image()))
					} else {
						None
					};

					for (kind, tx) in watchers {
						match kind {
							WatchKind::ChatText(text) => {
								if let Some(ref lines) = chat_lines {
									if lines.iter().any(|line| matches(line, &text, 3)) {
										let _ = tx.send(frame.clone());
									}
								}
							}
							WatchKind::DialogueScreen => {
								if on_dialogue.unwrap_or(false) {
									let _ = tx.send(frame.clone());
								}
							}
							WatchKind::VendorScreen => {
								if on_vendor.unwrap_or(false) {
									let _ = tx.send(frame.clone());
								}
							}
						}
					}
				}

				// 3) Schedule the next poll.
				let poll_delay = crate::config::read().poll_delay_s;
				let candidate = Instant::now() + Duration::from_secs_f32(poll_delay);
				let (lock, cv) = &*next_poll_thread;
				let mut next = lock.lock().expect("next_poll lock poisoned");
				if candidate > *next {
					*next = candidate;
				}
				cv.notify_all();
			}
		});

		Self { next_poll, watching }
	}

	/// Pull the next poll earlier (never later).
	pub fn nudge_at(&self, time: Instant) {
		let (lock, cv) = &*self.next_poll;
		let mut next = lock.lock().expect("next_poll lock poisoned");
		if time < *next {
			*next = time;
			cv.notify_all();
		}
	}

	pub fn watch(&self, kind: WatchKind, tx: Sender<Arc<vision::OwnedImage>>) {
		let kind = match kind {
			WatchKind::ChatText(text) => WatchKind::ChatText(text.to_ascii_lowercase()),
			other => other,
		};

		self.watching
			.lock()
			.expect("watching lock poisoned")
			.push((kind, tx));
	}

	pub fn secs_till_next_poll(&self) -> f32 {
		let (lock, _) = &*self.next_poll;
		let next = *lock.lock().expect("next_poll lock poisoned");
		let now = Instant::now();
		if next > now {
			return next.duration_since(now).as_secs_f32();
		}
		0.0
	}
}

fn matches(a: &str, b: &str, threshold: usize) -> bool {
	if a.contains(b) {
		return true;
	}

	let mut end = a.len();
	while let Some(index) = a[..end].rfind(' ') {
		end = index;
		let sub = &a[..end];
		if sub == b {
			return true;
		}
	}

	levenshtein::levenshtein(a, b) <= threshold
}

#[cfg(test)]
mod tests {
	use super::matches;

	#[test]
	fn exact_and_substring_match() {
		assert!(matches("vendor restocked wares", "wares", 2));
		assert!(matches("wares", "wares", 0));
	}

	#[test]
	fn close_ocr_noise_matches_within_threshold() {
		assert!(matches("guild summons", "guild sumons", 3));
		assert!(!matches("completely different", "guild summons", 3));
	}
}
