//! Fetches the OCR models the `vision` crate needs into an assets directory.
//!
//! Usage: `model_downloader [target_dir]` (defaults to `./ocr`).

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const BASE_URL: &str =
    "https://github.com/DayuanTan/ocr-rs-models/releases/download/v2.0";

const FILES: &[&str] = &[
    "detection.mnn",
    "latin_recognition.mnn",
    "latin_charset.txt",
];

fn main() -> Result<()> {
    let target = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./ocr"));

    std::fs::create_dir_all(&target)
        .with_context(|| format!("create {}", target.display()))?;

    for file in FILES {
        let dest = target.join(file);
        if dest.is_file() {
            println!("{} already present, skipping", dest.display());
            continue;
        }

        println!("downloading {file}...");
        download(&format!("{BASE_URL}/{file}"), &dest)
            .with_context(|| format!("download {file}"))?;
    }

    println!("done. point the bot at {} (or copy it next to the binary).", target.display());
    Ok(())
}

fn download(url: &str, dest: &Path) -> Result<()> {
    let response = ureq::get(url).call().with_context(|| format!("GET {url}"))?;

    let mut reader = response.into_reader();
    let tmp = dest.with_extension("part");
    let mut file = std::fs::File::create(&tmp)
        .with_context(|| format!("create {}", tmp.display()))?;
    std::io::copy(&mut reader, &mut file).context("write body")?;
    file.flush().context("flush")?;
    drop(file);

    std::fs::rename(&tmp, dest)
        .with_context(|| format!("persist {}", dest.display()))?;
    Ok(())
}
