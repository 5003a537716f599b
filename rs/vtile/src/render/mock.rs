use std::sync::Arc;

use kurbo::Affine;
use parking_lot::Mutex;

use crate::{Drawer, Error, Frame, GraphicsBackend, GraphicsContext, Result, SurfaceHandle, Viewport};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
	CreateContext,
	CreateSurface,
	Clear,
	Draw { timestamp_ns: u64, viewport: Viewport },
	Swap(Option<u64>),
	ReleaseSurface,
	ReleaseDrawer,
	ReleaseContext,
}

/// Every call made into the mock backend and drawer, in order.
#[derive(Default)]
pub struct Recording {
	calls: Mutex<Vec<Call>>,
	transforms: Mutex<Vec<Affine>>,
}

impl Recording {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	fn push(&self, call: Call) {
		self.calls.lock().push(call);
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	pub fn count<F: Fn(&Call) -> bool>(&self, f: F) -> usize {
		self.calls.lock().iter().filter(|&call| f(call)).count()
	}

	/// The timestamps of the drawn frames.
	pub fn draws(&self) -> Vec<u64> {
		self.calls
			.lock()
			.iter()
			.filter_map(|call| match call {
				Call::Draw { timestamp_ns, .. } => Some(*timestamp_ns),
				_ => None,
			})
			.collect()
	}

	pub fn transforms(&self) -> Vec<Affine> {
		self.transforms.lock().clone()
	}
}

pub struct MockBackend {
	recording: Arc<Recording>,
	fail: bool,
}

impl MockBackend {
	pub fn new(recording: &Arc<Recording>) -> Self {
		Self {
			recording: recording.clone(),
			fail: false,
		}
	}

	pub fn failing(recording: &Arc<Recording>) -> Self {
		Self {
			recording: recording.clone(),
			fail: true,
		}
	}
}

impl GraphicsBackend for MockBackend {
	fn create_context(self: Box<Self>) -> Result<Box<dyn GraphicsContext>> {
		if self.fail {
			return Err(Error::Context("no display".to_string()));
		}

		self.recording.push(Call::CreateContext);
		Ok(Box::new(MockContext {
			recording: self.recording,
			surface: false,
		}))
	}
}

struct MockContext {
	recording: Arc<Recording>,
	surface: bool,
}

impl GraphicsContext for MockContext {
	fn create_window_surface(&mut self, _surface: &SurfaceHandle) -> Result<()> {
		self.recording.push(Call::CreateSurface);
		self.surface = true;
		Ok(())
	}

	fn has_surface(&self) -> bool {
		self.surface
	}

	fn make_current(&mut self) -> Result<()> {
		match self.surface {
			true => Ok(()),
			false => Err(Error::NoSurface),
		}
	}

	fn make_nothing_current(&mut self) {}

	fn surface_size(&self) -> Result<(u32, u32)> {
		Ok((64, 36))
	}

	fn clear(&mut self, _color: [f32; 4]) -> Result<()> {
		self.recording.push(Call::Clear);
		Ok(())
	}

	fn swap_buffers(&mut self, presentation_time_ns: Option<u64>) -> Result<()> {
		self.recording.push(Call::Swap(presentation_time_ns));
		Ok(())
	}

	fn release_surface(&mut self) {
		if self.surface {
			self.recording.push(Call::ReleaseSurface);
			self.surface = false;
		}
	}

	fn release(&mut self) {
		self.recording.push(Call::ReleaseContext);
	}
}

/// Lets a test hold the render thread inside a draw.
pub struct DrawControl {
	/// Receives a message every time a draw starts.
	pub entered: async_channel::Receiver<()>,
	/// Each message lets one draw finish.
	pub proceed: async_channel::Sender<()>,
}

pub struct MockDrawer {
	recording: Arc<Recording>,
	block: Option<(async_channel::Sender<()>, async_channel::Receiver<()>)>,
	fail_first: bool,
}

impl MockDrawer {
	pub fn new(recording: &Arc<Recording>) -> Self {
		Self {
			recording: recording.clone(),
			block: None,
			fail_first: false,
		}
	}

	pub fn blocking(recording: &Arc<Recording>) -> (Self, DrawControl) {
		let (entered_tx, entered) = async_channel::unbounded();
		let (proceed, proceed_rx) = async_channel::unbounded();

		let drawer = Self {
			block: Some((entered_tx, proceed_rx)),
			..Self::new(recording)
		};

		(drawer, DrawControl { entered, proceed })
	}

	/// Fail the first draw with [Error::OutOfMemory].
	pub fn fail_first(mut self) -> Self {
		self.fail_first = true;
		self
	}
}

impl Drawer for MockDrawer {
	fn draw_frame(&mut self, frame: &Frame, transform: Affine, viewport: Viewport) -> Result<()> {
		self.recording.push(Call::Draw {
			timestamp_ns: frame.timestamp_ns,
			viewport,
		});
		self.recording.transforms.lock().push(transform);

		if let Some((entered, proceed)) = &self.block {
			let _ = entered.try_send(());
			let _ = proceed.recv_blocking();
		}

		if std::mem::take(&mut self.fail_first) {
			return Err(Error::OutOfMemory);
		}

		Ok(())
	}

	fn release(&mut self) {
		self.recording.push(Call::ReleaseDrawer);
	}
}
