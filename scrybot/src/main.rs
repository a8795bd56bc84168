//! scrybot: OCR-driven screen automation for the game client.
//!
//! This binary wires the capture/OCR/pattern pipeline to a behavior mode and
//! runs the sleep-paced control loop.

mod args;
mod assets;
mod capture;
mod config;
mod detector;
mod discord;
mod dispatch;
mod input;
mod lockout;
mod lootlog;
mod modes;
mod patterns;
mod poller;
mod whisper;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;

fn main() -> Result<()> {
    // Structured logging. Use `RUST_LOG=info` etc.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = args::Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::Config::path()?,
    };
    config::install(config::Config::load_or_default(&config_path));

    // Keep the watcher alive for the whole run; without it edits to the
    // config file are ignored until restart.
    let _config_watcher = match config::watch(config_path.clone()) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            tracing::warn!(error = %err, "config hot reload unavailable");
            None
        }
    };

    if cli.list_windows {
        for name in capture::list_app_names() {
            println!("{name}");
        }
        return Ok(());
    }

    // Vision engine (OCR model load is the slow part).
    let ocr = assets::resolve_ocr_assets("latin")?;
    let theme = config::read().theme;
    let vision = Arc::new(
        vision::Vision::try_new(theme, &ocr.detection, &ocr.recognition, &ocr.charset)
            .context("initialize vision engine")?,
    );

    if cli.sample_theme {
        return sample_theme(&config_path);
    }

    let data_dir = config::read().data_dir();
    let registry = patterns::Registry::with_user_patterns(&data_dir.join("patterns.json"))?;
    tracing::info!(states = registry.len(), "pattern registry loaded");
    let detector = detector::Detector::new(registry);

    if cli.once {
        return detect_once(&vision, &detector);
    }

    let Some(mode_arg) = cli.mode else {
        bail!("--mode is required (quest, combat or vendor)");
    };
    let mut mode = modes::by_name(mode_arg.as_str())
        .with_context(|| format!("unknown mode {:?}", mode_arg.as_str()))?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::SeqCst);
        })
        .context("install Ctrl-C handler")?;
    }

    // Item dataset: network, then cache, then empty defaults.
    let data = gamedata::Data::populated();

    let lockouts = lockout::Lockouts::load(data_dir.join("lockouts.json"), Utc::now())?;
    let history = gamedata::PriceHistory::load(data_dir.join("price_history.json"))?;
    let loot = lootlog::LootLog::open(config::read().logs_dir(), mode.name(), Utc::now())?;
    let discord = discord::Notifier::from_config().map(Arc::new);

    let poller = poller::Poller::new(vision.clone());
    let whisper_monitor = whisper::WhisperMonitor::spawn(vision.clone(), discord.clone(), stop.clone());

    let mut bot = modes::Bot {
        vision,
        detector,
        dispatcher: dispatch::Dispatcher::try_new()?,
        poller,
        loot,
        lockouts,
        data,
        history,
        discord,
        stop: stop.clone(),
    };

    mode.start(&mut bot)?;
    tracing::info!(mode = mode.name(), "bot running (Ctrl-C to stop)");

    while !stop.load(Ordering::SeqCst) {
        // Error policy: log, skip this cycle, keep going.
        if let Err(err) = mode.tick(&mut bot) {
            tracing::warn!(error = %err, "tick failed; continuing");
        }

        for w in whisper_monitor.drain() {
            tracing::info!(from = %w.from, message = %w.message, "whisper");
        }

        let delay = config::read().poll_delay_s.max(0.1);
        std::thread::sleep(Duration::from_secs_f32(delay));
    }

    shutdown(&bot, &whisper_monitor);
    Ok(())
}

fn shutdown(bot: &modes::Bot, whisper_monitor: &whisper::WhisperMonitor) {
    tracing::info!("shutting down");
    whisper_monitor.stop();

    let ended_at = Utc::now();
    match bot.loot.write_summary(ended_at) {
        Ok(path) => {
            tracing::info!(path = %path.display(), "session summary written");
            if let Some(discord) = &bot.discord {
                discord.send_session_summary(&bot.loot.summary(ended_at));
            }
        }
        Err(err) => tracing::warn!(error = %err, "failed to write session summary"),
    }

    if let Err(err) = bot.lockouts.save() {
        tracing::warn!(error = %err, "failed to persist lockouts");
    }
    if let Err(err) = bot.history.save() {
        tracing::warn!(error = %err, "failed to persist price history");
    }
}

/// `--once`: one capture/detect cycle, result as JSON on stdout.
fn detect_once(vision: &vision::Vision, detector: &detector::Detector) -> Result<()> {
    let frame = capture::capture().context("capture game window (is it running?)")?;
    match detector.detect(vision, &frame) {
        Some(detection) => {
            println!("{}", serde_json::to_string_pretty(&detection)?);
        }
        None => {
            println!("{{}}");
            tracing::info!("no registered state on screen");
        }
    }
    Ok(())
}

/// `--sample-theme`: read theme colors off the settings screen and persist.
fn sample_theme(config_path: &std::path::Path) -> Result<()> {
    let frame = capture::capture().context("capture game window (is it running?)")?;
    let theme = vision::Theme::from_settings(frame.as_image());

    let mut cfg = config::read().clone();
    cfg.theme = theme;
    cfg.save(config_path)?;
    config::install(cfg);

    println!(
        "theme sampled: text=({}, {}, {}), backdrop=({}, {}, {})",
        theme.text.r, theme.text.g, theme.text.b,
        theme.backdrop.r, theme.backdrop.g, theme.backdrop.b
    );
    Ok(())
}
