use std::{any::Any, fmt, sync::Arc};

use kurbo::Affine;

use crate::{Frame, Result};

/// An opaque, platform-specific window surface.
///
/// The renderer never looks inside; it only hands the handle to its [GraphicsContext].
#[derive(Clone)]
pub struct SurfaceHandle(Arc<dyn Any + Send + Sync>);

impl SurfaceHandle {
	pub fn new<T: Any + Send + Sync>(surface: T) -> Self {
		Self(Arc::new(surface))
	}

	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.0.downcast_ref()
	}
}

impl fmt::Debug for SurfaceHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SurfaceHandle").finish_non_exhaustive()
	}
}

/// The area of the surface to draw into, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
	pub x: i32,
	pub y: i32,
	pub width: u32,
	pub height: u32,
}

impl Viewport {
	/// A viewport covering the full surface.
	pub fn full(width: u32, height: u32) -> Self {
		Self {
			x: 0,
			y: 0,
			width,
			height,
		}
	}
}

/// Creates the graphics context of a renderer.
///
/// The backend is moved onto the render thread and consumed there, so any
/// thread-affine state is created on the thread that will use it.
pub trait GraphicsBackend: Send + 'static {
	fn create_context(self: Box<Self>) -> Result<Box<dyn GraphicsContext>>;
}

/// A graphics context, only ever touched from the render thread.
pub trait GraphicsContext {
	/// Create a window surface for the handle. Only one surface exists at a time.
	fn create_window_surface(&mut self, surface: &SurfaceHandle) -> Result<()>;

	fn has_surface(&self) -> bool;

	fn make_current(&mut self) -> Result<()>;

	fn make_nothing_current(&mut self);

	/// The size of the current surface in pixels.
	fn surface_size(&self) -> Result<(u32, u32)>;

	/// Clear the surface to a RGBA colour.
	fn clear(&mut self, color: [f32; 4]) -> Result<()>;

	/// Present the surface, optionally at the given presentation time.
	fn swap_buffers(&mut self, presentation_time_ns: Option<u64>) -> Result<()>;

	/// Destroy the window surface, if any. The context stays usable.
	fn release_surface(&mut self);

	/// Destroy the context. Called exactly once, last.
	fn release(&mut self);
}

/// Draws a frame onto the current surface.
///
/// The renderer owns the drawer and releases it on the render thread during teardown.
pub trait Drawer: Send {
	/// Draw the frame, mapping unit-square texture coordinates through `transform`.
	///
	/// Return [crate::Error::OutOfMemory] when the GPU is out of memory; the
	/// renderer reports it and carries on with the next frame.
	fn draw_frame(&mut self, frame: &Frame, transform: Affine, viewport: Viewport) -> Result<()>;

	fn release(&mut self);
}
