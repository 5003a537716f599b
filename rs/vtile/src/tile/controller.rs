use std::{collections::HashMap, fmt, sync::Arc};

use crate::{Frame, ObserverSet, PauseState, TileId, VideoRenderView, VideoTileObserver, VideoTileState};

/// Asks the network layer to stop or restart sending a remote feed.
///
/// Calls are fire-and-forget; there's no guarantee the remote actually pauses.
pub trait RemoteVideoControl: Send + Sync {
	fn set_remote_paused(&self, paused: bool, tile_id: TileId);
}

/// A [RemoteVideoControl] that does nothing, for clients without a signaling channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRemoteControl;

impl RemoteVideoControl for NoRemoteControl {
	fn set_remote_paused(&self, paused: bool, tile_id: TileId) {
		tracing::trace!(%tile_id, paused, "no remote control configured");
	}
}

// The observable outcome of changing a tile's pause state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transition {
	Paused,
	Resumed,
	None,
}

struct VideoTile {
	state: VideoTileState,
	view: Option<Arc<dyn VideoRenderView>>,
}

impl VideoTile {
	fn new(state: VideoTileState) -> Self {
		Self { state, view: None }
	}

	fn set_pause_state(&mut self, pause_state: PauseState) -> Transition {
		let previous = self.state.pause_state;
		if previous == pause_state {
			return Transition::None;
		}

		self.state.pause_state = pause_state;

		match (previous.is_paused(), pause_state.is_paused()) {
			(false, true) => Transition::Paused,
			(true, false) => Transition::Resumed,
			// Switching between two paused variants is silent.
			_ => Transition::None,
		}
	}

	fn is_bound_to(&self, view: &Arc<dyn VideoRenderView>) -> bool {
		self.view.as_ref().is_some_and(|bound| Arc::ptr_eq(bound, view))
	}

	fn bind(&mut self, view: Arc<dyn VideoRenderView>) {
		view.bind(self.state.tile_id);
		self.view = Some(view);
	}

	fn unbind(&mut self) {
		if let Some(view) = self.view.take() {
			view.release();
		}
	}
}

impl fmt::Debug for VideoTile {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("VideoTile")
			.field("state", &self.state)
			.field("bound", &self.view.is_some())
			.finish()
	}
}

/// Tracks the video tile of every attendee and notifies observers about transitions.
///
/// There is at most one tile per attendee; the local tile is keyed by `None`.
/// The controller is not meant to be shared between threads: funnel every frame
/// and pause event through a single dispatch context and call it from there.
pub struct VideoTileController {
	// Keyed by attendee, `None` is the local tile.
	tiles: HashMap<Option<String>, VideoTile>,
	observers: ObserverSet<dyn VideoTileObserver>,
	remote: Arc<dyn RemoteVideoControl>,
}

impl VideoTileController {
	pub fn new(remote: Arc<dyn RemoteVideoControl>) -> Self {
		Self {
			tiles: HashMap::new(),
			observers: ObserverSet::new(),
			remote,
		}
	}

	pub fn add_video_tile_observer(&self, observer: Arc<dyn VideoTileObserver>) {
		self.observers.add(observer);
	}

	pub fn remove_video_tile_observer(&self, observer: &Arc<dyn VideoTileObserver>) {
		self.observers.remove(observer);
	}

	/// Apply a frame event from the media client.
	///
	/// A `None` frame means the attendee stopped sending video and removes the tile.
	/// Otherwise the tile is created or its pause state updated, and the frame is
	/// forwarded to the bound view, if any.
	pub fn on_receive_frame(
		&mut self,
		frame: Option<&Frame>,
		attendee_id: Option<&str>,
		pause_state: PauseState,
		tile_id: TileId,
	) {
		let key = attendee_id.map(str::to_string);

		let Some(frame) = frame else {
			if let Some(mut tile) = self.tiles.remove(&key) {
				tracing::debug!(tile_id = %tile.state.tile_id, attendee = ?attendee_id, "removing video tile");
				tile.unbind();
				self.observers.notify(|observer| observer.on_remove_video_tile(&tile.state));
			}
			return;
		};

		let Some(tile) = self.tiles.get_mut(&key) else {
			let state = VideoTileState::new(tile_id, key.clone(), pause_state);
			tracing::debug!(%tile_id, attendee = ?attendee_id, %pause_state, "adding video tile");

			self.tiles.insert(key, VideoTile::new(state.clone()));
			self.observers.notify(|observer| observer.on_add_video_tile(&state));
			return;
		};

		if tile.state.tile_id != tile_id {
			tracing::warn!(
				expected = %tile.state.tile_id,
				got = %tile_id,
				attendee = ?attendee_id,
				"tile id changed without removal"
			);
		}

		let transition = tile.set_pause_state(pause_state);
		let state = tile.state.clone();

		if let Some(view) = &tile.view {
			view.render_frame(frame);
		}

		self.notify(transition, &state);
	}

	/// Ask the remote attendee to stop sending this tile, and mark it paused.
	///
	/// Ignored for unknown tiles and for the local tile.
	pub fn pause_remote_video_tile(&mut self, tile_id: TileId) {
		self.set_remote_paused(tile_id, true);
	}

	/// Ask the remote attendee to resume sending this tile, and mark it unpaused.
	///
	/// Ignored for unknown tiles and for the local tile.
	pub fn resume_remote_video_tile(&mut self, tile_id: TileId) {
		self.set_remote_paused(tile_id, false);
	}

	fn set_remote_paused(&mut self, tile_id: TileId, paused: bool) {
		let Some(tile) = self.tiles.values_mut().find(|tile| tile.state.tile_id == tile_id) else {
			tracing::debug!(%tile_id, paused, "ignoring remote pause for unknown tile");
			return;
		};

		if tile.state.is_local_tile() {
			tracing::warn!(%tile_id, paused, "ignoring remote pause for local tile");
			return;
		}

		self.remote.set_remote_paused(paused, tile_id);

		let pause_state = match paused {
			true => PauseState::PausedByUserRequest,
			false => PauseState::Unpaused,
		};

		let transition = tile.set_pause_state(pause_state);
		let state = tile.state.clone();

		self.notify(transition, &state);
	}

	fn notify(&self, transition: Transition, state: &VideoTileState) {
		match transition {
			Transition::Paused => {
				tracing::debug!(tile_id = %state.tile_id, pause_state = %state.pause_state, "video tile paused");
				self.observers.notify(|observer| observer.on_pause_video_tile(state));
			}
			Transition::Resumed => {
				tracing::debug!(tile_id = %state.tile_id, "video tile resumed");
				self.observers.notify(|observer| observer.on_resume_video_tile(state));
			}
			Transition::None => {}
		}
	}

	/// Bind a view to a tile, moving it away from any other tile first.
	///
	/// A view already bound to another tile is released there before being bound here.
	/// A different view already bound to this tile is released and replaced.
	pub fn bind_video_view(&mut self, view: Arc<dyn VideoRenderView>, tile_id: TileId) {
		if !self.tiles.values().any(|tile| tile.state.tile_id == tile_id) {
			tracing::debug!(%tile_id, "ignoring bind to unknown tile");
			return;
		}

		for tile in self.tiles.values_mut() {
			if tile.state.tile_id != tile_id && tile.is_bound_to(&view) {
				tracing::debug!(from = %tile.state.tile_id, to = %tile_id, "moving view between tiles");
				tile.unbind();
			}
		}

		let Some(tile) = self.tiles.values_mut().find(|tile| tile.state.tile_id == tile_id) else {
			return;
		};

		if tile.is_bound_to(&view) {
			return;
		}

		tile.unbind();
		tile.bind(view);

		tracing::debug!(%tile_id, "bound view");
	}

	/// Release the view bound to a tile, if any.
	pub fn unbind_video_view(&mut self, tile_id: TileId) {
		if let Some(tile) = self.tiles.values_mut().find(|tile| tile.state.tile_id == tile_id) {
			tile.unbind();
		}
	}

	/// Return a snapshot of the tile with the given id.
	pub fn tile_state(&self, tile_id: TileId) -> Option<VideoTileState> {
		self.tiles
			.values()
			.find(|tile| tile.state.tile_id == tile_id)
			.map(|tile| tile.state.clone())
	}

	/// Return a snapshot of the tile owned by an attendee, `None` being the local tile.
	pub fn attendee_tile(&self, attendee_id: Option<&str>) -> Option<VideoTileState> {
		self.tiles
			.get(&attendee_id.map(str::to_string))
			.map(|tile| tile.state.clone())
	}

	/// Snapshots of all tiles, ordered by tile id.
	pub fn tiles(&self) -> Vec<VideoTileState> {
		let mut tiles: Vec<_> = self.tiles.values().map(|tile| tile.state.clone()).collect();
		tiles.sort_by_key(|state| state.tile_id);
		tiles
	}

	pub fn is_bound(&self, tile_id: TileId) -> bool {
		self.tiles
			.values()
			.any(|tile| tile.state.tile_id == tile_id && tile.view.is_some())
	}

	pub fn len(&self) -> usize {
		self.tiles.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tiles.is_empty()
	}
}

impl Default for VideoTileController {
	fn default() -> Self {
		Self::new(Arc::new(NoRemoteControl))
	}
}

impl fmt::Debug for VideoTileController {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("VideoTileController")
			.field("tiles", &self.tiles)
			.field("observers", &self.observers)
			.finish()
	}
}
