use std::sync::Arc;

use parking_lot::Mutex;
use vtile::{Error, GraphicsBackend, GraphicsContext, Result, SurfaceHandle};

use crate::SurfaceSize;

/// What a [HeadlessBackend] has been asked to do so far.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeadlessStats {
	pub surfaces_created: u64,
	pub surfaces_released: u64,
	pub clears: u64,
	pub swaps: u64,

	/// The presentation time of each swap that had one.
	pub presentation_times: Vec<u64>,

	/// The context was destroyed.
	pub released: bool,
}

/// A graphics backend without a display.
///
/// Surfaces are plain sizes: pass a [SurfaceSize] in the [SurfaceHandle], or any other
/// handle to get the default size. Every call is counted in a shared [HeadlessStats].
#[derive(Clone, Debug, Default)]
pub struct HeadlessBackend {
	stats: Arc<Mutex<HeadlessStats>>,
}

impl HeadlessBackend {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn stats(&self) -> HeadlessStats {
		self.stats.lock().clone()
	}
}

impl GraphicsBackend for HeadlessBackend {
	fn create_context(self: Box<Self>) -> Result<Box<dyn GraphicsContext>> {
		tracing::trace!("created headless context");

		Ok(Box::new(HeadlessContext {
			stats: self.stats,
			surface: None,
			current: false,
			released: false,
		}))
	}
}

struct HeadlessContext {
	stats: Arc<Mutex<HeadlessStats>>,
	surface: Option<SurfaceSize>,
	current: bool,
	released: bool,
}

impl HeadlessContext {
	fn check(&self) -> Result<SurfaceSize> {
		if self.released {
			return Err(Error::NoContext);
		}

		self.surface.ok_or(Error::NoSurface)
	}
}

impl GraphicsContext for HeadlessContext {
	fn create_window_surface(&mut self, surface: &SurfaceHandle) -> Result<()> {
		if self.released {
			return Err(Error::NoContext);
		}

		if self.surface.is_some() {
			return Err(Error::Context("surface already created".to_string()));
		}

		let size = surface.downcast_ref::<SurfaceSize>().copied().unwrap_or_default();
		self.surface = Some(size);
		self.stats.lock().surfaces_created += 1;

		Ok(())
	}

	fn has_surface(&self) -> bool {
		self.surface.is_some()
	}

	fn make_current(&mut self) -> Result<()> {
		self.check()?;
		self.current = true;
		Ok(())
	}

	fn make_nothing_current(&mut self) {
		self.current = false;
	}

	fn surface_size(&self) -> Result<(u32, u32)> {
		let size = self.check()?;
		Ok((size.width, size.height))
	}

	fn clear(&mut self, _color: [f32; 4]) -> Result<()> {
		self.check()?;
		if !self.current {
			return Err(Error::Context("context not current".to_string()));
		}

		self.stats.lock().clears += 1;
		Ok(())
	}

	fn swap_buffers(&mut self, presentation_time_ns: Option<u64>) -> Result<()> {
		self.check()?;

		let mut stats = self.stats.lock();
		stats.swaps += 1;
		stats.presentation_times.extend(presentation_time_ns);

		Ok(())
	}

	fn release_surface(&mut self) {
		if self.surface.take().is_some() {
			self.current = false;
			self.stats.lock().surfaces_released += 1;
		}
	}

	fn release(&mut self) {
		self.release_surface();
		self.released = true;
		self.stats.lock().released = true;
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn surface_lifecycle() {
		let backend = HeadlessBackend::new();
		let mut context = Box::new(backend.clone()).create_context().unwrap();

		assert!(!context.has_surface());
		assert_eq!(context.make_current(), Err(Error::NoSurface));

		context
			.create_window_surface(&SurfaceHandle::new(SurfaceSize::new(32, 16)))
			.unwrap();
		assert_eq!(context.surface_size().unwrap(), (32, 16));
		assert!(context.create_window_surface(&SurfaceHandle::new(())).is_err());

		context.make_current().unwrap();
		context.clear([0.0; 4]).unwrap();
		context.swap_buffers(Some(9)).unwrap();
		context.swap_buffers(None).unwrap();

		context.release_surface();
		context.release();
		assert_eq!(context.surface_size(), Err(Error::NoContext));

		assert_eq!(
			backend.stats(),
			HeadlessStats {
				surfaces_created: 1,
				surfaces_released: 1,
				clears: 1,
				swaps: 2,
				presentation_times: vec![9],
				released: true,
			}
		);
	}

	#[test]
	fn default_size() {
		let mut context = Box::new(HeadlessBackend::new()).create_context().unwrap();
		context.create_window_surface(&SurfaceHandle::new("window")).unwrap();
		assert_eq!(context.surface_size().unwrap(), (640, 360));
	}

	#[test]
	fn clear_requires_current() {
		let mut context = Box::new(HeadlessBackend::new()).create_context().unwrap();
		context.create_window_surface(&SurfaceHandle::new(())).unwrap();
		assert!(context.clear([0.0; 4]).is_err());
	}
}
