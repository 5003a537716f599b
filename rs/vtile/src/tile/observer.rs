use crate::VideoTileState;

/// Receives tile lifecycle events from a [crate::VideoTileController].
///
/// Each callback gets a snapshot of the tile taken after the transition was applied.
/// Callbacks run on whichever context drives the controller, so keep them short.
pub trait VideoTileObserver: Send + Sync {
	/// An attendee started sharing video.
	fn on_add_video_tile(&self, state: &VideoTileState);

	/// An attendee stopped sharing video.
	fn on_remove_video_tile(&self, state: &VideoTileState);

	/// A tile moved from unpaused to any paused state.
	fn on_pause_video_tile(&self, state: &VideoTileState);

	/// A tile moved from a paused state back to unpaused.
	fn on_resume_video_tile(&self, state: &VideoTileState);
}
