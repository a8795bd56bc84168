use std::path::PathBuf;

use anyhow::{bail, Result};

#[derive(Debug, Clone)]
pub struct OcrAssets {
	pub detection: PathBuf,
	pub recognition: PathBuf,
	pub charset: PathBuf,
}

fn normalize_ocr_dir(dir: PathBuf) -> PathBuf {
	// Allow the env var to point either to the repo/app root (containing `ocr/`)
	// or directly to the `ocr/` folder.
	if dir.join("detection.mnn").is_file() {
		dir
	} else {
		dir.join("ocr")
	}
}

/// Resolve OCR model paths in a way that works both:
/// - when running from the repo (`cargo run`), and
/// - when running a packaged binary (assets next to the executable).
///
/// You can override discovery by setting `SCRYBOT_ASSETS_DIR`.
pub fn resolve_ocr_assets(lang_code: &str) -> Result<OcrAssets> {
	let recognition_name = format!("{lang_code}_recognition.mnn");
	let charset_name = format!("{lang_code}_charset.txt");

	let mut tried = Vec::new();

	let mut candidates: Vec<PathBuf> = Vec::new();
	if let Some(dir) = std::env::var_os("SCRYBOT_ASSETS_DIR") {
		candidates.push(PathBuf::from(dir));
	}
	if let Ok(exe) = std::env::current_exe()
		&& let Some(dir) = exe.parent()
	{
		candidates.push(dir.to_path_buf());
	}
	if let Ok(cwd) = std::env::current_dir() {
		candidates.push(cwd);
	}

	for candidate in candidates {
		let dir = normalize_ocr_dir(candidate);
		let assets = OcrAssets {
			detection: dir.join("detection.mnn"),
			recognition: dir.join(&recognition_name),
			charset: dir.join(&charset_name),
		};

		if assets.detection.is_file() && assets.recognition.is_file() && assets.charset.is_file() {
			return Ok(assets);
		}
		tried.push(dir);
	}

	bail!(
		"OCR models not found (run vision's model_downloader or set SCRYBOT_ASSETS_DIR); looked in: {}",
		tried
			.iter()
			.map(|p| p.display().to_string())
			.collect::<Vec<_>>()
			.join(", ")
	)
}
