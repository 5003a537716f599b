//! Producers and consumers of frames outside the tile controller.
//!
//! A [VideoSource] pushes frames to any number of [VideoSink]s. Capture sources
//! (cameras, screen share, synthetic generators) additionally start and stop on request.

use std::sync::Arc;

use crate::{Error, Frame, ObserverSet, Result};

/// A hint about the content of a source, used by encoders to pick a strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, derive_more::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ContentHint {
	#[default]
	#[display("none")]
	None,

	/// Prefer frame rate over resolution, like a camera.
	#[display("motion")]
	Motion,

	/// Prefer resolution over frame rate, like a document.
	#[display("detail")]
	Detail,

	/// Like [ContentHint::Detail], with sharp edges that must stay legible.
	#[display("text")]
	Text,
}

/// Receives frames from a [VideoSource].
pub trait VideoSink: Send + Sync {
	/// Called for each frame. Retain the frame to keep it past the call.
	fn on_video_frame_received(&self, frame: &Frame);
}

/// Produces frames for sinks.
pub trait VideoSource: Send + Sync {
	fn add_video_sink(&self, sink: Arc<dyn VideoSink>);

	fn remove_video_sink(&self, sink: &Arc<dyn VideoSink>);

	fn content_hint(&self) -> ContentHint {
		ContentHint::None
	}
}

/// The requested capture format; the source may pick the closest it supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaptureFormat {
	pub width: u32,
	pub height: u32,
	pub max_fps: u32,
}

impl CaptureFormat {
	pub fn new(width: u32, height: u32, max_fps: u32) -> Self {
		Self { width, height, max_fps }
	}
}

impl Default for CaptureFormat {
	fn default() -> Self {
		Self::new(960, 540, 15)
	}
}

/// Notified when a capture source changes state.
pub trait CaptureSourceObserver: Send + Sync {
	fn on_capture_started(&self) {}

	fn on_capture_stopped(&self) {}

	fn on_capture_failed(&self, err: &Error) {
		let _ = err;
	}
}

/// A source that captures frames on demand.
pub trait VideoCaptureSource: VideoSource {
	/// Start producing frames. Starting a started source restarts it with the new format.
	fn start(&self, format: CaptureFormat) -> Result<()>;

	/// Stop producing frames. Does nothing if already stopped.
	fn stop(&self);

	fn add_capture_source_observer(&self, observer: Arc<dyn CaptureSourceObserver>);

	fn remove_capture_source_observer(&self, observer: &Arc<dyn CaptureSourceObserver>);
}

/// Fans frames out to every registered sink, in registration order.
///
/// Sources embed one of these to implement [VideoSource].
#[derive(Debug, Default)]
pub struct SinkSet {
	sinks: ObserverSet<dyn VideoSink>,
}

impl SinkSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&self, sink: Arc<dyn VideoSink>) {
		self.sinks.add(sink);
	}

	pub fn remove(&self, sink: &Arc<dyn VideoSink>) {
		self.sinks.remove(sink);
	}

	pub fn len(&self) -> usize {
		self.sinks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sinks.is_empty()
	}
}

impl VideoSink for SinkSet {
	fn on_video_frame_received(&self, frame: &Frame) {
		self.sinks.notify(|sink| sink.on_video_frame_received(frame));
	}
}
