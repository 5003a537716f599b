use std::{fmt, str::FromStr, time};

use anyhow::Context;
use serde_with::{DisplayFromStr, serde_as};
use vtile::{CaptureFormat, RendererOptions};

/// The size of a window surface in pixels, written as `WIDTHxHEIGHT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceSize {
	pub width: u32,
	pub height: u32,
}

impl SurfaceSize {
	pub fn new(width: u32, height: u32) -> Self {
		Self { width, height }
	}
}

impl Default for SurfaceSize {
	fn default() -> Self {
		Self::new(640, 360)
	}
}

impl FromStr for SurfaceSize {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (width, height) = s.split_once('x').context("expected WIDTHxHEIGHT")?;
		let width: u32 = width.trim().parse().context("invalid width")?;
		let height: u32 = height.trim().parse().context("invalid height")?;

		anyhow::ensure!(width > 0 && height > 0, "surface size must be non-zero");
		Ok(Self { width, height })
	}
}

impl fmt::Display for SurfaceSize {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}x{}", self.width, self.height)
	}
}

/// Renderer settings shared by every tile.
#[serde_as]
#[derive(Clone, Debug, clap::Args, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct RenderConfig {
	/// Cap the paint rate of each renderer. Zero pauses rendering.
	#[serde(skip_serializing_if = "Option::is_none")]
	#[arg(id = "max-fps", long = "max-fps", env = "VTILE_MAX_FPS")]
	pub max_fps: Option<f32>,

	/// Flip every tile horizontally, like a selfie preview.
	#[arg(id = "mirror-horizontal", long = "mirror-horizontal", env = "VTILE_MIRROR_HORIZONTAL")]
	pub mirror_horizontal: bool,

	#[arg(id = "mirror-vertical", long = "mirror-vertical", env = "VTILE_MIRROR_VERTICAL")]
	pub mirror_vertical: bool,

	/// Present frames at their capture timestamp instead of immediately.
	#[arg(
		id = "presentation-timestamps",
		long = "presentation-timestamps",
		env = "VTILE_PRESENTATION_TIMESTAMPS"
	)]
	pub presentation_timestamps: bool,

	/// Crop frames to this width/height ratio, or zero to keep each frame's own ratio.
	#[arg(
		id = "aspect-ratio",
		long = "aspect-ratio",
		env = "VTILE_ASPECT_RATIO",
		default_value = "0"
	)]
	pub aspect_ratio: f32,

	/// The size of each tile's surface.
	#[serde_as(as = "DisplayFromStr")]
	#[arg(
		id = "surface-size",
		long = "surface-size",
		env = "VTILE_SURFACE_SIZE",
		default_value = "640x360"
	)]
	pub surface_size: SurfaceSize,

	/// How often to log renderer statistics, if at all.
	#[arg(
		id = "stats-interval",
		long = "stats-interval",
		env = "VTILE_STATS_INTERVAL",
		value_parser = humantime::parse_duration,
	)]
	#[serde(with = "humantime_serde")]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stats_interval: Option<time::Duration>,
}

impl Default for RenderConfig {
	fn default() -> Self {
		Self {
			max_fps: None,
			mirror_horizontal: false,
			mirror_vertical: false,
			presentation_timestamps: false,
			aspect_ratio: 0.0,
			surface_size: SurfaceSize::default(),
			stats_interval: None,
		}
	}
}

impl RenderConfig {
	/// The options for a renderer with the given name.
	pub fn options(&self, name: impl Into<String>) -> RendererOptions {
		RendererOptions {
			name: name.into(),
			max_fps: self.max_fps,
			mirror_horizontally: self.mirror_horizontal,
			mirror_vertically: self.mirror_vertical,
			layout_aspect_ratio: self.aspect_ratio,
			..Default::default()
		}
	}
}

/// Settings for synthetic capture sources.
#[derive(Clone, Debug, clap::Args, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct CaptureConfig {
	#[arg(
		id = "capture-width",
		long = "capture-width",
		env = "VTILE_CAPTURE_WIDTH",
		default_value = "320"
	)]
	pub width: u32,

	#[arg(
		id = "capture-height",
		long = "capture-height",
		env = "VTILE_CAPTURE_HEIGHT",
		default_value = "180"
	)]
	pub height: u32,

	#[arg(id = "capture-fps", long = "capture-fps", env = "VTILE_CAPTURE_FPS", default_value = "15")]
	pub fps: u32,
}

impl Default for CaptureConfig {
	fn default() -> Self {
		Self {
			width: 320,
			height: 180,
			fps: 15,
		}
	}
}

impl CaptureConfig {
	pub fn format(&self) -> CaptureFormat {
		CaptureFormat::new(self.width, self.height, self.fps)
	}
}

#[cfg(test)]
mod test {
	use clap::Parser;

	use super::*;

	#[derive(Parser)]
	struct Cli {
		#[command(flatten)]
		render: RenderConfig,

		#[command(flatten)]
		capture: CaptureConfig,
	}

	#[test]
	fn cli_defaults() {
		let cli = Cli::parse_from(["test"]);
		assert_eq!(cli.render.max_fps, None);
		assert_eq!(cli.render.surface_size, SurfaceSize::new(640, 360));
		assert_eq!(cli.render.aspect_ratio, 0.0);
		assert_eq!(cli.capture.format(), CaptureFormat::new(320, 180, 15));
	}

	#[test]
	fn cli_flags() {
		let cli = Cli::parse_from([
			"test",
			"--max-fps",
			"10",
			"--mirror-horizontal",
			"--aspect-ratio",
			"1.5",
			"--surface-size",
			"1280x720",
			"--stats-interval",
			"2s",
			"--capture-fps",
			"30",
		]);

		let options = cli.render.options("alice");
		assert_eq!(options.name, "alice");
		assert_eq!(options.max_fps, Some(10.0));
		assert!(options.mirror_horizontally);
		assert!(!options.mirror_vertically);
		assert_eq!(options.layout_aspect_ratio, 1.5);

		assert_eq!(cli.render.surface_size, SurfaceSize::new(1280, 720));
		assert_eq!(cli.render.stats_interval, Some(time::Duration::from_secs(2)));
		assert_eq!(cli.capture.fps, 30);
	}

	#[test]
	fn toml_config() {
		let config: RenderConfig = toml::from_str(
			r#"
			max_fps = 24.0
			surface_size = "320x240"
			stats_interval = "500ms"
			"#,
		)
		.unwrap();

		assert_eq!(config.max_fps, Some(24.0));
		assert_eq!(config.surface_size, SurfaceSize::new(320, 240));
		assert_eq!(config.stats_interval, Some(time::Duration::from_millis(500)));
		assert!(!config.presentation_timestamps);

		assert!(toml::from_str::<RenderConfig>("fps = 3").is_err());
	}

	#[test]
	fn surface_size_parse() {
		assert_eq!("16x9".parse::<SurfaceSize>().unwrap(), SurfaceSize::new(16, 9));
		assert_eq!(SurfaceSize::new(16, 9).to_string(), "16x9");
		assert!("16".parse::<SurfaceSize>().is_err());
		assert!("0x9".parse::<SurfaceSize>().is_err());
		assert!("ax9".parse::<SurfaceSize>().is_err());
	}
}
