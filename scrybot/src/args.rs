use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "scrybot", about = "OCR-driven screen automation for the game client")]
pub struct Cli {
    /// Behavior module to run.
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Config file path (defaults to the platform config dir).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// List visible window app names and exit.
    #[arg(long)]
    pub list_windows: bool,

    /// Run a single capture/detect cycle, print the detection as JSON, exit.
    #[arg(long)]
    pub once: bool,

    /// Capture the settings screen, sample theme colors into the config, exit.
    #[arg(long)]
    pub sample_theme: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Quest,
    Combat,
    Vendor,
}

impl ModeArg {
    pub fn as_str(self) -> &'static str {
        match self {
            ModeArg::Quest => "quest",
            ModeArg::Combat => "combat",
            ModeArg::Vendor => "vendor",
        }
    }
}
