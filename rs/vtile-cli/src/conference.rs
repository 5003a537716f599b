use std::{
	collections::HashMap,
	fmt,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration,
};

use parking_lot::Mutex;
use tokio::{
	sync::mpsc,
	task::block_in_place,
	time::{Instant, Interval},
};
use vtile::{
	Frame, PauseState, RemoteVideoControl, RendererStats, SurfaceHandle, SurfaceView, TileId, VideoCaptureSource,
	VideoRenderer, VideoSink, VideoSource, VideoTileController, VideoTileObserver, VideoTileState,
};
use vtile_native::{Canvas, CaptureConfig, HeadlessBackend, PatternSource, RenderConfig, SoftwareDrawer};

use crate::scenario::{Action, Scenario};

/// A tile notification, in the order the controller fired it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
	Added(VideoTileState),
	Removed(VideoTileState),
	Paused(VideoTileState),
	Resumed(VideoTileState),
}

impl Notification {
	pub fn state(&self) -> &VideoTileState {
		match self {
			Self::Added(state) | Self::Removed(state) | Self::Paused(state) | Self::Resumed(state) => state,
		}
	}
}

impl fmt::Display for Notification {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let kind = match self {
			Self::Added(_) => "added",
			Self::Removed(_) => "removed",
			Self::Paused(_) => "paused",
			Self::Resumed(_) => "resumed",
		};

		let state = self.state();
		match &state.attendee_id {
			Some(attendee) => write!(f, "{kind} tile {} ({attendee}, {})", state.tile_id, state.pause_state),
			None => write!(f, "{kind} tile {} (local, {})", state.tile_id, state.pause_state),
		}
	}
}

/// The final numbers of one tile's renderer.
#[derive(Clone, Debug)]
pub struct TileSummary {
	pub tile_id: TileId,
	pub attendee_id: Option<String>,
	pub stats: RendererStats,
	pub swaps: u64,
	/// The average brightness of the last painted frame.
	pub luma: f64,
}

#[derive(Clone, Debug, Default)]
pub struct Summary {
	pub notifications: Vec<Notification>,
	pub tiles: Vec<TileSummary>,
}

// Everything the dispatch loop reacts to, funneled through one channel.
enum Message {
	Frame { participant: usize, frame: Option<Frame> },
	Tile(Notification),
}

// The simulated network path of one participant.
#[derive(Default)]
struct Link {
	// The local user asked the remote to stop sending.
	user_paused: AtomicBool,
	poor_connection: AtomicBool,
}

impl Link {
	fn pause_state(&self) -> PauseState {
		if self.poor_connection.load(Ordering::Relaxed) {
			PauseState::PausedForPoorConnection
		} else if self.user_paused.load(Ordering::Relaxed) {
			PauseState::PausedByUserRequest
		} else {
			PauseState::Unpaused
		}
	}
}

// Forwards captured frames to the dispatch loop.
struct Uplink {
	participant: usize,
	messages: mpsc::UnboundedSender<Message>,
}

impl VideoSink for Uplink {
	fn on_video_frame_received(&self, frame: &Frame) {
		let _ = self.messages.send(Message::Frame {
			participant: self.participant,
			frame: Some(frame.retain()),
		});
	}
}

// Delivers pause requests to the simulated remote.
struct Signaling {
	links: HashMap<TileId, Arc<Link>>,
}

impl RemoteVideoControl for Signaling {
	fn set_remote_paused(&self, paused: bool, tile_id: TileId) {
		tracing::debug!(%tile_id, paused, "signaling remote");
		if let Some(link) = self.links.get(&tile_id) {
			link.user_paused.store(paused, Ordering::Relaxed);
		}
	}
}

struct Notifier {
	messages: mpsc::UnboundedSender<Message>,
}

impl Notifier {
	fn send(&self, notification: Notification) {
		tracing::info!("{notification}");
		let _ = self.messages.send(Message::Tile(notification));
	}
}

impl VideoTileObserver for Notifier {
	fn on_add_video_tile(&self, state: &VideoTileState) {
		self.send(Notification::Added(state.clone()));
	}

	fn on_remove_video_tile(&self, state: &VideoTileState) {
		self.send(Notification::Removed(state.clone()));
	}

	fn on_pause_video_tile(&self, state: &VideoTileState) {
		self.send(Notification::Paused(state.clone()));
	}

	fn on_resume_video_tile(&self, state: &VideoTileState) {
		self.send(Notification::Resumed(state.clone()));
	}
}

struct Participant {
	attendee: Option<String>,
	tile: TileId,
	link: Arc<Link>,
	source: PatternSource,
}

#[derive(Clone, Copy, Debug)]
enum Step {
	Join,
	Leave,
	Act(Action),
}

struct Tile {
	renderer: Arc<VideoRenderer>,
	backend: HeadlessBackend,
	canvas: Arc<Mutex<Canvas>>,
	attendee: Option<String>,
}

impl Tile {
	fn finish(self, tile_id: TileId) -> TileSummary {
		if let Err(err) = self.renderer.release() {
			tracing::warn!(%tile_id, %err, "failed to release renderer");
		}

		TileSummary {
			tile_id,
			attendee_id: self.attendee,
			stats: self.renderer.stats(),
			swaps: self.backend.stats().swaps,
			luma: self.canvas.lock().mean(),
		}
	}
}

/// Simulates a call: each participant is a synthetic camera whose frames go
/// through a [VideoTileController], and each tile is painted by its own renderer.
///
/// Must run on a multi-threaded runtime: renderer setup and teardown block the loop.
pub struct Conference {
	render: RenderConfig,
	capture: CaptureConfig,
	scenario: Scenario,
}

impl Conference {
	pub fn new(render: RenderConfig, capture: CaptureConfig, scenario: Scenario) -> Self {
		Self {
			render,
			capture,
			scenario,
		}
	}

	/// Run until the duration elapses, or until ctrl-c without one.
	pub async fn run(self, duration: Option<Duration>) -> anyhow::Result<Summary> {
		self.scenario.validate()?;

		let (messages, mut inbox) = mpsc::unbounded_channel();

		let participants: Vec<Participant> = self
			.scenario
			.participants
			.iter()
			.enumerate()
			.map(|(index, config)| {
				let name = config.attendee.clone().unwrap_or_else(|| "local".to_string());
				let source = PatternSource::new(name);
				source.add_video_sink(Arc::new(Uplink {
					participant: index,
					messages: messages.clone(),
				}));

				Participant {
					attendee: config.attendee.clone(),
					tile: TileId(config.tile),
					link: Arc::default(),
					source,
				}
			})
			.collect();

		let signaling = Signaling {
			links: participants.iter().map(|p| (p.tile, p.link.clone())).collect(),
		};

		let mut controller = VideoTileController::new(Arc::new(signaling));
		controller.add_video_tile_observer(Arc::new(Notifier {
			messages: messages.clone(),
		}));

		// Every scripted step, in time order.
		let mut steps: Vec<(Duration, usize, Step)> = Vec::new();
		for (index, config) in self.scenario.participants.iter().enumerate() {
			steps.push((config.join, index, Step::Join));
			steps.extend(config.events.iter().map(|event| (event.at, index, Step::Act(event.action))));
			if let Some(leave) = config.leave {
				steps.push((leave, index, Step::Leave));
			}
		}
		steps.sort_by_key(|(at, _, _)| *at);

		let start = Instant::now();
		let deadline = duration.map(|duration| start + duration);
		let mut ticker = self.render.stats_interval.map(tokio::time::interval);
		let mut next = 0;

		let mut tiles: HashMap<TileId, Tile> = HashMap::new();
		let mut summary = Summary::default();

		tracing::info!(participants = participants.len(), ?duration, "starting call");

		loop {
			let wake = steps.get(next).map(|(at, _, _)| start + *at);

			tokio::select! {
				Some(message) = inbox.recv() => match message {
					Message::Frame { participant, frame } => {
						let participant = &participants[participant];
						let pause_state = participant.link.pause_state();

						// The remote stops sending once asked to pause.
						if frame.is_some() && pause_state == PauseState::PausedByUserRequest {
							continue;
						}

						let attendee = participant.attendee.as_deref();
						match frame {
							Some(frame) => {
								controller.on_receive_frame(Some(&frame), attendee, pause_state, participant.tile)
							}
							// Removing a tile waits for its render thread to drop the surface.
							None => block_in_place(|| {
								controller.on_receive_frame(None, attendee, pause_state, participant.tile)
							}),
						}
					}
					Message::Tile(notification) => {
						match &notification {
							Notification::Added(state) => {
								let tile = block_in_place(|| self.bind(&mut controller, state));
								if let Some(tile) = tile {
									tiles.insert(state.tile_id, tile);
								}
							}
							Notification::Removed(state) => {
								if let Some(tile) = tiles.remove(&state.tile_id) {
									summary.tiles.push(block_in_place(|| tile.finish(state.tile_id)));
								}
							}
							Notification::Paused(_) | Notification::Resumed(_) => {}
						}

						summary.notifications.push(notification);
					}
				},
				_ = tokio::time::sleep_until(wake.unwrap_or(start)), if wake.is_some() => {
					let (_, index, step) = steps[next];
					next += 1;

					block_in_place(|| self.step(&mut controller, &participants[index], index, step, &messages));
				}
				_ = tick(&mut ticker) => {
					for (tile_id, tile) in &tiles {
						let stats = tile.renderer.stats();
						tracing::info!(
							%tile_id,
							received = stats.received,
							rendered = stats.rendered,
							dropped = stats.dropped,
							superseded = stats.superseded,
							"renderer stats"
						);
					}
				}
				_ = tokio::time::sleep_until(deadline.unwrap_or(start)), if deadline.is_some() => {
					tracing::info!("call finished");
					break;
				}
				_ = tokio::signal::ctrl_c() => {
					tracing::info!("interrupted");
					break;
				}
			}
		}

		let mut remaining: Vec<_> = tiles.into_iter().collect();
		remaining.sort_by_key(|(tile_id, _)| *tile_id);

		block_in_place(|| {
			for participant in &participants {
				participant.source.stop();
			}

			summary
				.tiles
				.extend(remaining.into_iter().map(|(tile_id, tile)| tile.finish(tile_id)));
		});

		for tile in &summary.tiles {
			tracing::info!(
				tile_id = %tile.tile_id,
				attendee = ?tile.attendee_id,
				received = tile.stats.received,
				rendered = tile.stats.rendered,
				dropped = tile.stats.dropped,
				superseded = tile.stats.superseded,
				swaps = tile.swaps,
				luma = tile.luma,
				"tile summary"
			);
		}

		Ok(summary)
	}

	fn step(
		&self,
		controller: &mut VideoTileController,
		participant: &Participant,
		index: usize,
		step: Step,
		messages: &mpsc::UnboundedSender<Message>,
	) {
		tracing::debug!(tile_id = %participant.tile, ?step, "scripted step");

		match step {
			Step::Join => {
				if let Err(err) = participant.source.start(self.capture.format()) {
					tracing::warn!(tile_id = %participant.tile, %err, "failed to start capture");
				}
			}
			Step::Leave => {
				participant.source.stop();

				// Queued behind any frames already captured.
				let _ = messages.send(Message::Frame {
					participant: index,
					frame: None,
				});
			}
			Step::Act(Action::Pause) => controller.pause_remote_video_tile(participant.tile),
			Step::Act(Action::Resume) => controller.resume_remote_video_tile(participant.tile),
			Step::Act(Action::PoorConnection) => participant.link.poor_connection.store(true, Ordering::Relaxed),
			Step::Act(Action::Recovered) => participant.link.poor_connection.store(false, Ordering::Relaxed),
		}
	}

	// Create a renderer for a new tile and bind a view to it.
	fn bind(&self, controller: &mut VideoTileController, state: &VideoTileState) -> Option<Tile> {
		let name = match &state.attendee_id {
			Some(attendee) => format!("{}-{attendee}", state.tile_id),
			None => format!("{}-local", state.tile_id),
		};

		let renderer = Arc::new(VideoRenderer::new(self.render.options(name)));
		let backend = HeadlessBackend::new();
		let drawer = SoftwareDrawer::new();
		let canvas = drawer.canvas();

		if state.is_content() {
			// Screen shares keep their own aspect ratio.
			renderer.set_layout_aspect_ratio(0.0);
		}

		if let Err(err) = renderer.initialize(backend.clone(), drawer, self.render.presentation_timestamps) {
			tracing::warn!(tile_id = %state.tile_id, %err, "failed to initialize renderer");
			return None;
		}

		let surface = SurfaceHandle::new(self.render.surface_size);
		controller.bind_video_view(Arc::new(SurfaceView::new(renderer.clone(), surface)), state.tile_id);

		Some(Tile {
			renderer,
			backend,
			canvas,
			attendee: state.attendee_id.clone(),
		})
	}
}

async fn tick(ticker: &mut Option<Interval>) {
	match ticker {
		Some(ticker) => {
			ticker.tick().await;
		}
		None => std::future::pending().await,
	}
}

#[cfg(test)]
mod test {
	use vtile_native::SurfaceSize;

	use super::*;

	const CALL: &str = r#"
		[[participant]]
		tile = 0

		[[participant]]
		attendee = "alice"
		tile = 1
		leave = "1100ms"

		[[participant.event]]
		at = "200ms"
		action = "pause"

		[[participant.event]]
		at = "400ms"
		action = "resume"

		[[participant.event]]
		at = "600ms"
		action = "poor_connection"

		[[participant.event]]
		at = "800ms"
		action = "recovered"
	"#;

	fn capture() -> CaptureConfig {
		let mut capture = CaptureConfig::default();
		capture.width = 64;
		capture.height = 36;
		capture.fps = 50;
		capture
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn scripted_call() {
		let scenario: Scenario = toml::from_str(CALL).unwrap();

		let mut render = RenderConfig::default();
		render.surface_size = SurfaceSize::new(32, 18);

		let conference = Conference::new(render, capture(), scenario);
		let summary = conference.run(Some(Duration::from_millis(1400))).await.unwrap();

		let alice: Vec<_> = summary
			.notifications
			.iter()
			.filter(|notification| notification.state().tile_id == TileId(1))
			.collect();

		let alice_state = |pause_state| VideoTileState::new(TileId(1), Some("alice".to_string()), pause_state);
		assert_eq!(
			alice,
			[
				&Notification::Added(alice_state(PauseState::Unpaused)),
				&Notification::Paused(alice_state(PauseState::PausedByUserRequest)),
				&Notification::Resumed(alice_state(PauseState::Unpaused)),
				&Notification::Paused(alice_state(PauseState::PausedForPoorConnection)),
				&Notification::Resumed(alice_state(PauseState::Unpaused)),
				&Notification::Removed(alice_state(PauseState::Unpaused)),
			]
		);

		// The local tile never left.
		let local = summary.tiles.iter().find(|tile| tile.tile_id == TileId(0)).unwrap();
		assert!(local.attendee_id.is_none());
		assert!(local.stats.rendered > 0);

		let alice = summary.tiles.iter().find(|tile| tile.tile_id == TileId(1)).unwrap();
		assert!(alice.stats.rendered > 0);
		assert!(alice.swaps >= alice.stats.rendered);
	}

	#[test]
	fn notification_display() {
		let state = VideoTileState::new(TileId(3), Some("bob#content".to_string()), PauseState::Unpaused);
		assert_eq!(
			Notification::Added(state).to_string(),
			"added tile 3 (bob#content, unpaused)"
		);

		let state = VideoTileState::new(TileId(0), None, PauseState::PausedByUserRequest);
		assert_eq!(
			Notification::Paused(state).to_string(),
			"paused tile 0 (local, paused by user request)"
		);
	}
}
