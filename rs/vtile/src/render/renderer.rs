use std::{
	fmt,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	thread,
	time::Instant,
};

use parking_lot::Mutex;

use crate::{
	Drawer, Error, Frame, GraphicsBackend, GraphicsContext, Layout, Result, SurfaceHandle, VideoSink, Viewport,
	render::gate::FpsGate,
};

/// Called on the render thread whenever a paint or surface operation fails.
pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

/// Construction options for a [VideoRenderer].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RendererOptions {
	/// Used to name the render thread and in logs.
	pub name: String,

	/// Cap the paint rate, `None` for no cap.
	pub max_fps: Option<f32>,

	pub mirror_horizontally: bool,
	pub mirror_vertically: bool,

	/// The width/height ratio of the drawn area, or zero to match each frame.
	pub layout_aspect_ratio: f32,

	/// The RGBA colour the surface is cleared to before each frame.
	pub clear_color: [f32; 4],
}

impl Default for RendererOptions {
	fn default() -> Self {
		Self {
			name: "renderer".to_string(),
			max_fps: None,
			mirror_horizontally: false,
			mirror_vertically: false,
			layout_aspect_ratio: 0.0,
			clear_color: [0.0, 0.0, 0.0, 1.0],
		}
	}
}

/// A snapshot of the frame counters of a [VideoRenderer].
///
/// Every received frame ends up in exactly one of the other counters, except
/// for the one that may be sitting in the pending slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RendererStats {
	/// Frames passed to [VideoRenderer::render].
	pub received: u64,

	/// Frames that were drawn and presented.
	pub rendered: u64,

	/// Frames taken off the slot but not presented: gated, no surface, or a draw error.
	pub dropped: u64,

	/// Frames replaced in the slot by a newer frame before they were painted.
	pub superseded: u64,
}

#[derive(Default)]
struct Counters {
	received: AtomicU64,
	rendered: AtomicU64,
	dropped: AtomicU64,
	superseded: AtomicU64,
}

impl Counters {
	fn snapshot(&self) -> RendererStats {
		RendererStats {
			received: self.received.load(Ordering::Relaxed),
			rendered: self.rendered.load(Ordering::Relaxed),
			dropped: self.dropped.load(Ordering::Relaxed),
			superseded: self.superseded.load(Ordering::Relaxed),
		}
	}
}

// State shared between the producers and the render thread.
// Each lock is independent; never hold two at once.
struct Shared {
	name: String,
	pending: Mutex<Option<Frame>>,
	layout: Mutex<Layout>,
	gate: Mutex<FpsGate>,
	counters: Counters,
	on_error: Mutex<Option<ErrorCallback>>,
}

impl Shared {
	fn report(&self, err: &Error) {
		match err {
			Error::OutOfMemory => tracing::warn!(name = %self.name, "out of memory while drawing"),
			err => tracing::warn!(name = %self.name, %err, "render task failed"),
		}

		let callback = self.on_error.lock().clone();
		if let Some(callback) = callback {
			callback(err);
		}
	}

	fn drop_pending(&self) {
		if let Some(frame) = self.pending.lock().take() {
			self.counters.dropped.fetch_add(1, Ordering::Relaxed);
			frame.release();
		}
	}
}

enum Task {
	Paint,
	CreateSurface(SurfaceHandle),
	ReleaseSurface(async_channel::Sender<()>),
	Release(async_channel::Sender<()>),
}

struct RenderThread {
	tasks: async_channel::Sender<Task>,
	handle: thread::JoinHandle<()>,
}

enum Lifecycle {
	Idle,
	Running(RenderThread),
	Released,
}

/// Paints the newest frame from any number of producers on a dedicated thread.
///
/// Frames go through a single pending slot: [VideoRenderer::render] replaces
/// whatever frame is waiting, so a slow surface only ever sees the latest frame.
/// All graphics state lives on the render thread; the producer never blocks on a paint.
///
/// ```ignore
/// let renderer = VideoRenderer::new(RendererOptions::default());
/// renderer.initialize(backend, drawer, false)?;
/// renderer.create_surface(surface)?;
/// renderer.render(&frame)?;
/// renderer.release()?;
/// ```
pub struct VideoRenderer {
	shared: Arc<Shared>,
	clear_color: [f32; 4],
	lifecycle: Mutex<Lifecycle>,
}

impl VideoRenderer {
	pub fn new(options: RendererOptions) -> Self {
		let layout = Layout {
			aspect_ratio: options.layout_aspect_ratio,
			mirror_horizontally: options.mirror_horizontally,
			mirror_vertically: options.mirror_vertically,
		};

		let shared = Shared {
			name: options.name,
			pending: Mutex::new(None),
			layout: Mutex::new(layout),
			gate: Mutex::new(FpsGate::new(options.max_fps)),
			counters: Counters::default(),
			on_error: Mutex::new(None),
		};

		Self {
			shared: Arc::new(shared),
			clear_color: options.clear_color,
			lifecycle: Mutex::new(Lifecycle::Idle),
		}
	}

	pub fn name(&self) -> &str {
		&self.shared.name
	}

	/// Start the render thread and create the graphics context on it.
	///
	/// Blocks until the context exists. Does nothing if already initialized.
	/// A released renderer may be initialized again.
	pub fn initialize<B: GraphicsBackend, D: Drawer + 'static>(
		&self,
		backend: B,
		drawer: D,
		use_presentation_timestamp: bool,
	) -> Result<()> {
		let mut lifecycle = self.lifecycle.lock();
		if let Lifecycle::Running(_) = *lifecycle {
			tracing::debug!(name = %self.shared.name, "renderer already initialized");
			return Ok(());
		}

		let (tasks, receiver) = async_channel::unbounded();
		let (ready_tx, ready_rx) = async_channel::bounded::<Result<()>>(1);

		let shared = self.shared.clone();
		let clear_color = self.clear_color;
		let backend: Box<dyn GraphicsBackend> = Box::new(backend);
		let mut drawer: Box<dyn Drawer> = Box::new(drawer);

		let handle = thread::Builder::new()
			.name(format!("vtile-{}", self.shared.name))
			.spawn(move || {
				let context = match backend.create_context() {
					Ok(context) => context,
					Err(err) => {
						drawer.release();
						let _ = ready_tx.send_blocking(Err(err));
						return;
					}
				};

				let _ = ready_tx.send_blocking(Ok(()));

				let render = RenderLoop {
					shared,
					context,
					drawer,
					clear_color,
					use_presentation_timestamp,
				};
				render.run(receiver);
			})
			.map_err(|err| Error::Context(err.to_string()))?;

		let ready = ready_rx.recv_blocking().unwrap_or(Err(Error::ThreadExited));
		if let Err(err) = ready {
			let _ = handle.join();
			tracing::warn!(name = %self.shared.name, %err, "failed to initialize renderer");
			return Err(err);
		}

		tracing::debug!(name = %self.shared.name, use_presentation_timestamp, "renderer initialized");
		*lifecycle = Lifecycle::Running(RenderThread { tasks, handle });

		Ok(())
	}

	fn tasks(&self) -> Result<async_channel::Sender<Task>> {
		match &*self.lifecycle.lock() {
			Lifecycle::Idle => Err(Error::NotInitialized),
			Lifecycle::Running(thread) => Ok(thread.tasks.clone()),
			Lifecycle::Released => Err(Error::Released),
		}
	}

	/// Queue a frame to be painted, replacing any frame still waiting.
	///
	/// The frame is retained until it's painted or superseded; the caller keeps its own reference.
	pub fn render(&self, frame: &Frame) -> Result<()> {
		let tasks = self.tasks()?;
		let counters = &self.shared.counters;

		counters.received.fetch_add(1, Ordering::Relaxed);

		let previous = self.shared.pending.lock().replace(frame.retain());
		if let Some(previous) = previous {
			counters.superseded.fetch_add(1, Ordering::Relaxed);
			previous.release();
		}

		if tasks.try_send(Task::Paint).is_err() {
			// Raced with release; the render thread is gone.
			self.shared.drop_pending();
			return Err(Error::Released);
		}

		Ok(())
	}

	/// Set the width/height ratio of the drawn area; zero matches each frame.
	pub fn set_layout_aspect_ratio(&self, ratio: f32) {
		self.shared.layout.lock().aspect_ratio = ratio;
	}

	pub fn set_mirror(&self, horizontally: bool, vertically: bool) {
		let mut layout = self.shared.layout.lock();
		layout.mirror_horizontally = horizontally;
		layout.mirror_vertically = vertically;
	}

	pub fn layout(&self) -> Layout {
		*self.shared.layout.lock()
	}

	/// Cap the paint rate. Zero or less pauses painting, infinity removes the cap.
	pub fn set_fps_reduction(&self, fps: f32) {
		tracing::debug!(name = %self.shared.name, fps, "set fps reduction");
		self.shared.gate.lock().set_max_fps(fps);
	}

	pub fn disable_fps_reduction(&self) {
		self.shared.gate.lock().disable();
	}

	/// Drop every frame until the rate is changed again.
	pub fn pause_video(&self) {
		tracing::debug!(name = %self.shared.name, "pause video");
		self.shared.gate.lock().pause();
	}

	/// Create the window surface on the render thread.
	///
	/// Does not block. Nothing happens if a surface already exists.
	pub fn create_surface(&self, surface: SurfaceHandle) -> Result<()> {
		self.tasks()?
			.try_send(Task::CreateSurface(surface))
			.map_err(|_| Error::Released)
	}

	/// Destroy the window surface, blocking until the render thread is done with it.
	pub fn release_surface(&self) -> Result<()> {
		let tasks = self.tasks()?;
		let (ack, done) = async_channel::bounded(1);

		tasks.try_send(Task::ReleaseSurface(ack)).map_err(|_| Error::Released)?;
		done.recv_blocking().map_err(|_| Error::ThreadExited)
	}

	/// Tear everything down and stop the render thread.
	///
	/// Blocks until the graphics context and drawer are released and any pending frame is dropped.
	/// Releasing twice is fine, but releasing a renderer that was never initialized is an error.
	pub fn release(&self) -> Result<()> {
		let thread = {
			let mut lifecycle = self.lifecycle.lock();
			match std::mem::replace(&mut *lifecycle, Lifecycle::Released) {
				Lifecycle::Idle => {
					*lifecycle = Lifecycle::Idle;
					return Err(Error::NotInitialized);
				}
				Lifecycle::Released => return Ok(()),
				Lifecycle::Running(thread) => thread,
			}
		};

		let (ack, done) = async_channel::bounded(1);
		if thread.tasks.try_send(Task::Release(ack)).is_ok() {
			let _ = done.recv_blocking();
		}

		thread.tasks.close();
		if thread.handle.join().is_err() {
			tracing::error!(name = %self.shared.name, "render thread panicked");
		}

		self.shared.drop_pending();

		let stats = self.stats();
		tracing::info!(
			name = %self.shared.name,
			received = stats.received,
			rendered = stats.rendered,
			dropped = stats.dropped,
			superseded = stats.superseded,
			"renderer released"
		);

		Ok(())
	}

	pub fn is_initialized(&self) -> bool {
		matches!(*self.lifecycle.lock(), Lifecycle::Running(_))
	}

	pub fn stats(&self) -> RendererStats {
		self.shared.counters.snapshot()
	}

	/// Called on the render thread for every failed paint, including out of memory.
	pub fn set_error_callback<F: Fn(&Error) + Send + Sync + 'static>(&self, callback: F) {
		*self.shared.on_error.lock() = Some(Arc::new(callback));
	}
}

impl VideoSink for VideoRenderer {
	fn on_video_frame_received(&self, frame: &Frame) {
		if let Err(err) = self.render(frame) {
			tracing::trace!(name = %self.shared.name, %err, "ignoring frame");
		}
	}
}

impl Drop for VideoRenderer {
	fn drop(&mut self) {
		let running = matches!(*self.lifecycle.get_mut(), Lifecycle::Running(_));
		if running {
			let _ = self.release();
		}
	}
}

impl fmt::Debug for VideoRenderer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("VideoRenderer")
			.field("name", &self.shared.name)
			.field("initialized", &self.is_initialized())
			.field("stats", &self.stats())
			.finish()
	}
}

// Owns all the graphics state; lives on the render thread.
struct RenderLoop {
	shared: Arc<Shared>,
	context: Box<dyn GraphicsContext>,
	drawer: Box<dyn Drawer>,
	clear_color: [f32; 4],
	use_presentation_timestamp: bool,
}

impl RenderLoop {
	fn run(mut self, tasks: async_channel::Receiver<Task>) {
		while let Ok(task) = tasks.recv_blocking() {
			match task {
				Task::Paint => self.paint(),
				Task::CreateSurface(surface) => {
					if let Err(err) = self.create_surface(&surface) {
						self.shared.report(&err);
					}
				}
				Task::ReleaseSurface(ack) => {
					self.release_surface();
					let _ = ack.try_send(());
				}
				Task::Release(ack) => {
					self.release();
					let _ = ack.try_send(());
					return;
				}
			}
		}

		self.release();
	}

	fn paint(&mut self) {
		let Some(frame) = self.shared.pending.lock().take() else {
			return;
		};

		let shared = self.shared.clone();
		let counters = &shared.counters;

		if !self.context.has_surface() {
			tracing::trace!(name = %shared.name, "dropping frame, no surface");
			counters.dropped.fetch_add(1, Ordering::Relaxed);
			return;
		}

		if !shared.gate.lock().should_render(Instant::now()) {
			counters.dropped.fetch_add(1, Ordering::Relaxed);
			return;
		}

		let layout = *shared.layout.lock();
		let transform = layout.transform(frame.rotated_width(), frame.rotated_height());

		match self.draw(&frame, transform) {
			Ok(()) => {
				counters.rendered.fetch_add(1, Ordering::Relaxed);
			}
			Err(err) => {
				counters.dropped.fetch_add(1, Ordering::Relaxed);
				shared.report(&err);
			}
		}

		frame.release();
	}

	fn draw(&mut self, frame: &Frame, transform: kurbo::Affine) -> Result<()> {
		self.context.make_current()?;

		let (width, height) = self.context.surface_size()?;
		self.context.clear(self.clear_color)?;
		self.drawer
			.draw_frame(frame, transform, Viewport::full(width, height))?;

		let presentation_time = self.use_presentation_timestamp.then_some(frame.timestamp_ns);
		self.context.swap_buffers(presentation_time)
	}

	fn create_surface(&mut self, surface: &SurfaceHandle) -> Result<()> {
		if self.context.has_surface() {
			tracing::debug!(name = %self.shared.name, "surface already exists");
			return Ok(());
		}

		self.context.create_window_surface(surface)?;
		self.context.make_current()?;

		// Clear once so the surface doesn't show garbage before the first frame.
		self.context.clear(self.clear_color)?;
		self.context.swap_buffers(None)?;

		tracing::debug!(name = %self.shared.name, "created surface");
		Ok(())
	}

	fn release_surface(&mut self) {
		if self.context.has_surface() {
			self.context.make_nothing_current();
			self.context.release_surface();
			tracing::debug!(name = %self.shared.name, "released surface");
		}
	}

	fn release(&mut self) {
		self.drawer.release();
		self.release_surface();
		self.context.make_nothing_current();
		self.context.release();
		self.shared.drop_pending();
	}
}
