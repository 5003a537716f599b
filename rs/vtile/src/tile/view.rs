use crate::{Frame, TileId};

/// A surface that can display the frames of one tile at a time.
///
/// Views are identified by pointer: binding the same `Arc` to a second tile moves it.
pub trait VideoRenderView: Send + Sync {
	/// The view was bound to a tile and will start receiving frames.
	fn bind(&self, tile_id: TileId) {
		let _ = tile_id;
	}

	/// Display a frame. Implementations retain the frame if they need it past this call.
	fn render_frame(&self, frame: &Frame);

	/// The view was unbound from its tile and should release its surface.
	fn release(&self);
}
