//! Discord webhook notifications.
//!
//! Best-effort by design: a failed post logs a warning and the bot keeps
//! running. No webhook URL configured means no notifier.

use anyhow::{Context, Result};

use crate::lootlog::SessionSummary;

pub struct Notifier {
	webhook_url: String,
}

impl Notifier {
	/// Build a notifier from the current config, if a webhook URL is set.
	pub fn from_config() -> Option<Self> {
		let url = crate::config::read().discord_webhook_url.clone()?;
		if url.trim().is_empty() {
			return None;
		}
		Some(Self { webhook_url: url })
	}

	/// Post a plain message.
	pub fn send(&self, content: &str) {
		if let Err(err) = self.post(&serde_json::json!({ "content": content })) {
			tracing::warn!(error = %err, "discord notification failed");
		}
	}

	/// Post the end-of-session loot summary as an embed.
	pub fn send_session_summary(&self, summary: &SessionSummary) {
		let mut lines: Vec<String> = summary
			.items
			.iter()
			.map(|(item, quantity)| format!("{item} x{quantity}"))
			.collect();
		if lines.is_empty() {
			lines.push("(no loot)".to_string());
		}

		let payload = serde_json::json!({
			"embeds": [{
				"title": format!("scrybot session ({})", summary.mode),
				"description": lines.join("\n"),
				"footer": {
					"text": format!(
						"{} events, {} - {}",
						summary.events,
						summary.started_at.format("%H:%M"),
						summary.ended_at.format("%H:%M")
					)
				}
			}]
		});

		if let Err(err) = self.post(&payload) {
			tracing::warn!(error = %err, "discord summary failed");
		}
	}

	fn post(&self, payload: &serde_json::Value) -> Result<()> {
		ureq::post(&self.webhook_url)
			.send_json(payload)
			.context("POST webhook")?;
		Ok(())
	}
}
