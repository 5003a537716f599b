use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread,
	time::{Duration, Instant},
};

use parking_lot::Mutex;
use vtile::{
	CaptureFormat, CaptureSourceObserver, ContentHint, Error, Frame, I420Buffer, ObserverSet, Plane, Result, Rotation,
	SinkSet, VideoCaptureSource, VideoSink, VideoSource,
};

// SMPTE-style bars: white, yellow, cyan, green, magenta, red, blue, black.
const BARS: [(u8, u8, u8); 8] = [
	(235, 235, 235),
	(235, 235, 16),
	(16, 235, 235),
	(16, 235, 16),
	(235, 16, 235),
	(235, 16, 16),
	(16, 16, 235),
	(16, 16, 16),
];

// BT.601 studio swing.
fn rgb_to_yuv((r, g, b): (u8, u8, u8)) -> (u8, u8, u8) {
	let (r, g, b) = (r as i32, g as i32, b as i32);

	let y = ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16;
	let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
	let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;

	(y.clamp(0, 255) as u8, u.clamp(0, 255) as u8, v.clamp(0, 255) as u8)
}

/// Generate one frame of colour bars, shifted by one bar every `shift` frames.
pub fn color_bars(width: u32, height: u32, index: u64, shift: u64, timestamp_ns: u64) -> Result<Frame> {
	let offset = (index / shift.max(1)) as usize;
	let bar_width = (width / BARS.len() as u32).max(1);
	let color = |col: u32| rgb_to_yuv(BARS[((col / bar_width) as usize + offset) % BARS.len()]);

	let chroma_width = width.div_ceil(2);
	let chroma_height = height.div_ceil(2);

	let row: Vec<u8> = (0..width).map(|col| color(col).0).collect();
	let y: Vec<u8> = (0..height).flat_map(|_| row.iter().copied()).collect();

	let u_row: Vec<u8> = (0..chroma_width).map(|col| color(col * 2).1).collect();
	let v_row: Vec<u8> = (0..chroma_width).map(|col| color(col * 2).2).collect();
	let u: Vec<u8> = (0..chroma_height).flat_map(|_| u_row.iter().copied()).collect();
	let v: Vec<u8> = (0..chroma_height).flat_map(|_| v_row.iter().copied()).collect();

	let buffer = I420Buffer::new(
		width,
		height,
		Plane::new(y, width as usize),
		Plane::new(u, chroma_width as usize),
		Plane::new(v, chroma_width as usize),
	)?;

	Ok(Frame::new(buffer, Rotation::Rotation0, timestamp_ns))
}

struct Worker {
	stop: Arc<AtomicBool>,
	handle: thread::JoinHandle<()>,
}

/// A synthetic camera producing animated colour bars on its own thread.
pub struct PatternSource {
	name: String,
	hint: ContentHint,
	sinks: Arc<SinkSet>,
	observers: ObserverSet<dyn CaptureSourceObserver>,
	worker: Mutex<Option<Worker>>,
}

impl PatternSource {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			hint: ContentHint::Motion,
			sinks: Arc::new(SinkSet::new()),
			observers: ObserverSet::new(),
			worker: Mutex::new(None),
		}
	}

	pub fn with_content_hint(mut self, hint: ContentHint) -> Self {
		self.hint = hint;
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn is_running(&self) -> bool {
		self.worker.lock().is_some()
	}

	fn fail(&self, err: Error) -> Error {
		tracing::warn!(name = %self.name, %err, "capture failed");
		self.observers.notify(|observer| observer.on_capture_failed(&err));
		err
	}

	fn run(sinks: Arc<SinkSet>, format: CaptureFormat, stop: Arc<AtomicBool>) {
		let period = Duration::from_secs(1) / format.max_fps;
		let start = Instant::now();
		let mut index = 0u64;

		while !stop.load(Ordering::Acquire) {
			let timestamp = start.elapsed().as_nanos() as u64;

			// One bar per second.
			match color_bars(format.width, format.height, index, format.max_fps as u64, timestamp) {
				Ok(frame) => sinks.on_video_frame_received(&frame),
				Err(err) => {
					tracing::error!(%err, "failed to generate frame");
					return;
				}
			}

			index += 1;

			let deadline = start + period * index as u32;
			let now = Instant::now();
			if deadline > now {
				thread::park_timeout(deadline - now);
			}
		}
	}
}

impl VideoSource for PatternSource {
	fn add_video_sink(&self, sink: Arc<dyn VideoSink>) {
		self.sinks.add(sink);
	}

	fn remove_video_sink(&self, sink: &Arc<dyn VideoSink>) {
		self.sinks.remove(sink);
	}

	fn content_hint(&self) -> ContentHint {
		self.hint
	}
}

impl VideoCaptureSource for PatternSource {
	fn start(&self, format: CaptureFormat) -> Result<()> {
		if format.width == 0 || format.height == 0 || format.max_fps == 0 {
			return Err(self.fail(Error::Capture(format!("invalid format: {format:?}"))));
		}

		self.stop();

		let stop = Arc::new(AtomicBool::new(false));
		let sinks = self.sinks.clone();
		let flag = stop.clone();

		let handle = thread::Builder::new()
			.name(format!("pattern-{}", self.name))
			.spawn(move || Self::run(sinks, format, flag))
			.map_err(|err| self.fail(Error::Capture(err.to_string())))?;

		*self.worker.lock() = Some(Worker { stop, handle });

		tracing::info!(
			name = %self.name,
			width = format.width,
			height = format.height,
			fps = format.max_fps,
			"capture started"
		);
		self.observers.notify(|observer| observer.on_capture_started());

		Ok(())
	}

	fn stop(&self) {
		let Some(worker) = self.worker.lock().take() else {
			return;
		};

		worker.stop.store(true, Ordering::Release);
		worker.handle.thread().unpark();

		if worker.handle.join().is_err() {
			tracing::error!(name = %self.name, "capture thread panicked");
		}

		tracing::info!(name = %self.name, "capture stopped");
		self.observers.notify(|observer| observer.on_capture_stopped());
	}

	fn add_capture_source_observer(&self, observer: Arc<dyn CaptureSourceObserver>) {
		self.observers.add(observer);
	}

	fn remove_capture_source_observer(&self, observer: &Arc<dyn CaptureSourceObserver>) {
		self.observers.remove(observer);
	}
}

impl Drop for PatternSource {
	fn drop(&mut self) {
		self.stop();
	}
}

#[cfg(test)]
mod test {
	use super::*;

	struct Channel(async_channel::Sender<Frame>);

	impl VideoSink for Channel {
		fn on_video_frame_received(&self, frame: &Frame) {
			let _ = self.0.try_send(frame.retain());
		}
	}

	#[derive(Default)]
	struct Events(Mutex<Vec<String>>);

	impl CaptureSourceObserver for Events {
		fn on_capture_started(&self) {
			self.0.lock().push("started".to_string());
		}

		fn on_capture_stopped(&self) {
			self.0.lock().push("stopped".to_string());
		}

		fn on_capture_failed(&self, err: &Error) {
			self.0.lock().push(format!("failed: {err}"));
		}
	}

	#[test]
	fn bars() {
		let frame = color_bars(16, 4, 0, 1, 0).unwrap();
		let buffer = frame.buffer().as_i420().unwrap();

		// White on the left, black on the right.
		assert_eq!(buffer.y.sample(0, 0), 218);
		assert_eq!(buffer.y.sample(15, 3), 30);
		assert_eq!(buffer.u.sample(0, 0), 128);

		// The next frame shifts by one bar: yellow first.
		let frame = color_bars(16, 4, 1, 1, 0).unwrap();
		let buffer = frame.buffer().as_i420().unwrap();
		assert_eq!(buffer.y.sample(0, 0), rgb_to_yuv(BARS[1]).0);
	}

	#[test]
	fn odd_dimensions() {
		let frame = color_bars(7, 5, 3, 2, 0).unwrap();
		assert_eq!((frame.width(), frame.height()), (7, 5));
		assert_eq!(frame.buffer().as_i420().unwrap().chroma_height(), 3);
	}

	#[test]
	fn start_stop() {
		let source = PatternSource::new("test");
		let (tx, rx) = async_channel::unbounded();
		let events = Arc::new(Events::default());

		source.add_video_sink(Arc::new(Channel(tx)));
		source.add_capture_source_observer(events.clone());
		assert_eq!(source.content_hint(), ContentHint::Motion);

		source.start(CaptureFormat::new(32, 18, 200)).unwrap();
		assert!(source.is_running());

		let first = rx.recv_blocking().unwrap();
		let second = rx.recv_blocking().unwrap();
		assert_eq!((first.width(), first.height()), (32, 18));
		assert!(second.timestamp_ns > first.timestamp_ns);

		source.stop();
		source.stop();
		assert!(!source.is_running());

		// Nothing arrives once stopped.
		while rx.try_recv().is_ok() {}
		thread::sleep(Duration::from_millis(20));
		assert!(rx.try_recv().is_err());

		assert_eq!(*events.0.lock(), ["started", "stopped"]);
	}

	#[test]
	fn invalid_format() {
		let source = PatternSource::new("test");
		let events = Arc::new(Events::default());
		source.add_capture_source_observer(events.clone());

		let err = source.start(CaptureFormat::new(0, 18, 30)).unwrap_err();
		assert!(matches!(err, Error::Capture(_)));
		assert!(!source.is_running());
		assert_eq!(events.0.lock().len(), 1);
		assert!(events.0.lock()[0].starts_with("failed"));
	}
}
