mod conference;
mod scenario;

use conference::*;
use scenario::*;

use clap::Parser;
use std::{path::PathBuf, time::Duration};

/// Simulate a video call: synthetic cameras feed a tile controller, and each tile
/// is painted by its own render thread onto a headless surface.
#[derive(Parser, Clone)]
#[command(name = "vtile", version)]
pub struct Cli {
	#[command(flatten)]
	log: vtile_native::Log,

	#[command(flatten)]
	render: vtile_native::RenderConfig,

	#[command(flatten)]
	capture: vtile_native::CaptureConfig,

	/// A TOML file describing who joins the call and what happens to their video.
	///
	/// A built-in call with two cameras and a screen share is used if omitted.
	#[arg(long)]
	scenario: Option<PathBuf>,

	/// Stop after this long, like `10s`. Otherwise run until ctrl-c.
	#[arg(long, value_parser = humantime::parse_duration)]
	duration: Option<Duration>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	cli.log.init();

	let scenario = match &cli.scenario {
		Some(path) => Scenario::load(path)?,
		None => Scenario::default(),
	};

	let conference = Conference::new(cli.render, cli.capture, scenario);
	let summary = conference.run(cli.duration).await?;

	tracing::info!(
		notifications = summary.notifications.len(),
		tiles = summary.tiles.len(),
		"done"
	);

	Ok(())
}
