/// A list of possible errors that can occur while tracking or rendering video.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
	/// The renderer was used before [crate::VideoRenderer::initialize].
	#[error("renderer not initialized")]
	NotInitialized,

	/// The renderer was used after [crate::VideoRenderer::release].
	#[error("renderer released")]
	Released,

	/// A render task ran without a graphics context.
	#[error("no graphics context")]
	NoContext,

	/// A render task needed a window surface but none was created.
	#[error("no window surface")]
	NoSurface,

	/// The graphics backend failed to create a context or surface.
	#[error("graphics context error: {0}")]
	Context(String),

	/// The GPU ran out of memory while drawing.
	#[error("out of memory")]
	OutOfMemory,

	/// The drawer failed for a reason other than memory.
	#[error("draw failed: {0}")]
	Draw(String),

	/// The buffer variant can't be handled by this consumer.
	#[error("unsupported buffer: {0}")]
	UnsupportedBuffer(String),

	/// A plane is smaller than its dimensions and stride require.
	#[error("invalid plane {plane}: need {required} bytes, got {actual}")]
	InvalidPlane {
		plane: &'static str,
		required: usize,
		actual: usize,
	},

	#[error("invalid rotation: {0}")]
	InvalidRotation(u16),

	#[error("invalid pause state: {0}")]
	InvalidPauseState(u8),

	#[error("invalid texture type: {0}")]
	InvalidTextureType(u8),

	/// The render thread exited before acknowledging a request.
	#[error("render thread exited")]
	ThreadExited,

	/// A capture source failed to produce frames.
	#[error("capture failed: {0}")]
	Capture(String),
}

pub type Result<T> = std::result::Result<T, Error>;
