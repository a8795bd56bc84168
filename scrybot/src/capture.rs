use xcap::image::EncodableLayout;

/// Geometry information for the captured game window.
#[derive(Debug, Clone, Copy)]
pub struct WindowBounds {
	pub x: f32,
	pub y: f32,
	pub width: f32,
	pub height: f32,
	/// Monitor scale factor (physical pixels per logical point).
	pub scale_factor: f32,
}

pub fn find_window(app_name: &str) -> Option<xcap::Window> {
	let windows = xcap::Window::all().ok()?;
	windows
		.into_iter()
		.find(|window| window.app_name().ok().as_deref() == Some(app_name))
}

/// List app names of all visible windows (for `--list-windows`).
pub fn list_app_names() -> Vec<String> {
	let Ok(windows) = xcap::Window::all() else {
		return Vec::new();
	};
	let mut names: Vec<String> = windows
		.into_iter()
		.filter_map(|w| w.app_name().ok())
		.collect();
	names.sort();
	names.dedup();
	names
}

pub fn window_bounds(app_name: &str) -> Option<WindowBounds> {
	let window = find_window(app_name)?;
	let scale_factor = window
		.current_monitor()
		.ok()
		.and_then(|m| m.scale_factor().ok())
		.unwrap_or(1.0);

	Some(WindowBounds {
		x: window.x().ok()? as f32,
		y: window.y().ok()? as f32,
		width: window.width().ok()? as f32,
		height: window.height().ok()? as f32,
		scale_factor,
	})
}

pub fn capture_specific(app_name: &str, max_height: Option<u32>) -> Option<vision::OwnedImage> {
	let window = find_window(app_name)?;
	let img = window.capture_image().ok()?;
	let mut owned = vision::OwnedImage::from_rgba(img.width() as usize, img.as_bytes());
	// Downscale large captures before OCR; accuracy holds up, CPU time doesn't.
	if let Some(max_h) = max_height {
		if owned.height() > max_h {
			owned.resize_h(max_h);
		}
	}
	Some(owned)
}

/// Reads the config and captures the configured game window.
pub fn capture() -> Option<vision::OwnedImage> {
	let (app_name, max_h) = {
		let cfg = crate::config::read();
		(cfg.app_name.clone(), cfg.max_capture_height)
	};
	capture_specific(&app_name, max_h)
}
