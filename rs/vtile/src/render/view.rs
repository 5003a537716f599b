use std::sync::Arc;

use crate::{Frame, SurfaceHandle, TileId, VideoRenderView, VideoRenderer};

/// A [VideoRenderView] that paints onto a window surface through a [VideoRenderer].
///
/// Binding creates the surface on the render thread and releasing destroys it.
/// The renderer itself stays initialized, so the view can be bound again later.
#[derive(Debug, Clone)]
pub struct SurfaceView {
	renderer: Arc<VideoRenderer>,
	surface: SurfaceHandle,
}

impl SurfaceView {
	pub fn new(renderer: Arc<VideoRenderer>, surface: SurfaceHandle) -> Self {
		Self { renderer, surface }
	}

	pub fn renderer(&self) -> &Arc<VideoRenderer> {
		&self.renderer
	}
}

impl VideoRenderView for SurfaceView {
	fn bind(&self, tile_id: TileId) {
		if let Err(err) = self.renderer.create_surface(self.surface.clone()) {
			tracing::warn!(%tile_id, name = %self.renderer.name(), %err, "failed to create surface");
		}
	}

	fn render_frame(&self, frame: &Frame) {
		if let Err(err) = self.renderer.render(frame) {
			tracing::trace!(name = %self.renderer.name(), %err, "dropping frame");
		}
	}

	fn release(&self) {
		if let Err(err) = self.renderer.release_surface() {
			tracing::debug!(name = %self.renderer.name(), %err, "failed to release surface");
		}
	}
}
