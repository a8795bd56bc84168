//! Persistent application configuration.
//!
//! Stored as JSON in a platform-appropriate config directory and kept in a
//! process-wide `RwLock` so the poller and modes always see current values.
//! An optional `notify` watcher reloads the file when it changes on disk, so
//! tuning poll delays or thresholds does not require restarting the bot.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock, RwLockReadGuard};

use anyhow::{Context, Result};
use notify::{RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};

/// On-disk configuration for the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target window application name (from `xcap::Window::app_name()`).
    ///
    /// This is reasonably stable across restarts. If multiple windows share
    /// the same app name, the first match is used.
    pub app_name: String,

    /// Character name, used to key lockout timers.
    pub character: String,

    /// Poll interval (seconds) for screen checks.
    pub poll_delay_s: f32,

    /// Optional max capture height (downscales large captures for performance).
    pub max_capture_height: Option<u32>,

    /// UI theme colors sampled from the in-game settings screen.
    pub theme: vision::Theme,

    /// Delay between synthetic input events (milliseconds).
    pub input_delay_ms: u64,

    /// Seconds before a still-visible state may be acted on again.
    pub rearm_secs: u64,

    /// Discord webhook URL; `None` disables notifications.
    pub discord_webhook_url: Option<String>,

    /// Override for the data directory (lockouts, loot logs, price history).
    pub data_dir: Option<PathBuf>,

    pub quest: QuestConfig,
    pub combat: CombatConfig,
    pub vendor: VendorConfig,
    pub whisper: WhisperConfig,
    pub lockout: LockoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestConfig {
    /// Accept quest offers automatically.
    pub auto_accept: bool,
}

impl Default for QuestConfig {
    fn default() -> Self {
        Self { auto_accept: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Swap weapons after this many consecutive ineffective-attack prompts.
    pub swap_after_misses: u32,
    /// Key tapped to cycle weapons.
    pub weapon_swap_key: char,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            swap_after_misses: 3,
            weapon_swap_key: 'q',
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorConfig {
    /// Alert when a listing is below this fraction of the known market price.
    pub underprice_ratio: f32,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self { underprice_ratio: 0.6 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhisperConfig {
    pub enabled: bool,
    pub poll_delay_s: f32,
    pub forward_to_discord: bool,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_delay_s: 2.0,
            forward_to_discord: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutConfig {
    /// Default lockout duration in hours.
    pub default_hours: f32,
    /// Per-instance overrides, keyed by instance name.
    pub hours_by_instance: HashMap<String, f32>,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            default_hours: 20.0,
            hours_by_instance: HashMap::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "steam_app_1172620".to_string(),
            character: "default".to_string(),
            poll_delay_s: 1.0,
            max_capture_height: Some(1080),
            theme: vision::Theme::PARCHMENT,
            input_delay_ms: 120,
            rearm_secs: 10,
            discord_webhook_url: None,
            data_dir: None,
            quest: QuestConfig::default(),
            combat: CombatConfig::default(),
            vendor: VendorConfig::default(),
            whisper: WhisperConfig::default(),
            lockout: LockoutConfig::default(),
        }
    }
}

impl Config {
    /// Path to the config file.
    pub fn path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("config_dir() unavailable")?;
        Ok(base.join("scrybot.json"))
    }

    /// Load configuration from disk, falling back to defaults on missing file.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load config; using defaults");
                Self::default()
            }
        }
    }

    /// Try to load configuration from disk.
    pub fn try_load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
        let cfg = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
        Ok(cfg)
    }

    /// Save configuration to disk.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(path, json).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }

    /// Directory for lockouts, loot logs and price history.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("scrybot")
        })
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }
}

// ----------

static CONFIG: LazyLock<RwLock<Config>> = LazyLock::new(|| RwLock::new(Config::default()));

/// Replace the process-wide config (startup and hot reload).
pub fn install(cfg: Config) {
    *CONFIG.write().expect("config lock poisoned") = cfg;
}

/// Read access to the process-wide config.
///
/// Note: holding the guard across a capture will stall a hot reload; clone
/// the fields you need instead.
pub fn read() -> RwLockReadGuard<'static, Config> {
    CONFIG.read().expect("config lock poisoned")
}

/// Watch the config file and hot-reload it on change.
///
/// The returned watcher must be kept alive for the lifetime of the process.
pub fn watch(path: PathBuf) -> Result<notify::RecommendedWatcher> {
    let watch_path = path.clone();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                match Config::try_load(&path) {
                    Ok(cfg) => {
                        install(cfg);
                        tracing::info!(path = %path.display(), "config reloaded");
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "config changed but failed to parse; keeping previous");
                    }
                }
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "config watcher error"),
        }
    })
    .context("create config watcher")?;

    // Watch the parent directory: editors replace files on save, which drops
    // a watch registered on the file itself.
    let target = watch_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| watch_path.clone());
    watcher
        .watch(&target, RecursiveMode::NonRecursive)
        .with_context(|| format!("watch {:?}", target))?;

    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::try_load(&dir.path().join("none.json")).unwrap();
        assert_eq!(cfg.poll_delay_s, Config::default().poll_delay_s);
    }

    #[test]
    fn config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scrybot.json");

        let mut cfg = Config::default();
        cfg.app_name = "game_window".to_string();
        cfg.lockout.hours_by_instance.insert("Ember Depths".to_string(), 44.0);
        cfg.save(&path).unwrap();

        let loaded = Config::try_load(&path).unwrap();
        assert_eq!(loaded.app_name, "game_window");
        assert_eq!(loaded.lockout.hours_by_instance["Ember Depths"], 44.0);
    }

    #[test]
    fn unknown_mode_sections_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{"app_name": "g", "character": "alt"}"#).unwrap();

        let cfg = Config::try_load(&path).unwrap();
        assert_eq!(cfg.character, "alt");
        assert_eq!(cfg.combat.swap_after_misses, 3);
        assert!(cfg.quest.auto_accept);
    }
}
