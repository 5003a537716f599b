use std::sync::Arc;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{Error, Result, VideoFrameBuffer};

/// The clockwise rotation to apply to a buffer before display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum Rotation {
	Rotation0 = 0,
	Rotation90 = 90,
	Rotation180 = 180,
	Rotation270 = 270,
}

// Not derived; num_enum would treat a `#[default]` variant as a catch-all.
impl Default for Rotation {
	fn default() -> Self {
		Self::Rotation0
	}
}

impl Rotation {
	pub fn from_degrees(degrees: u16) -> Result<Self> {
		Self::try_from(degrees).map_err(|_| Error::InvalidRotation(degrees))
	}

	/// Whether width and height swap when displayed.
	pub fn is_transposed(self) -> bool {
		matches!(self, Self::Rotation90 | Self::Rotation270)
	}
}

/// A decoded picture, ready to be rendered.
///
/// Cloning a frame retains the underlying buffer and dropping it releases it.
/// The buffer is freed exactly once, when the last clone goes away.
/// [Frame::retain] and [Frame::release] exist to make hand-offs explicit at call sites.
#[derive(Clone, Debug)]
pub struct Frame {
	/// When the frame was captured, in nanoseconds on the producer's monotonic clock.
	///
	/// There is no "zero" value; it's only meaningful relative to other frames from the same producer.
	pub timestamp_ns: u64,

	/// The rotation to apply before display.
	pub rotation: Rotation,

	buffer: Arc<VideoFrameBuffer>,
}

impl Frame {
	pub fn new(buffer: impl Into<VideoFrameBuffer>, rotation: Rotation, timestamp_ns: u64) -> Self {
		Self {
			timestamp_ns,
			rotation,
			buffer: Arc::new(buffer.into()),
		}
	}

	pub fn buffer(&self) -> &VideoFrameBuffer {
		&self.buffer
	}

	pub fn width(&self) -> u32 {
		self.buffer.width()
	}

	pub fn height(&self) -> u32 {
		self.buffer.height()
	}

	/// The width after applying the rotation.
	pub fn rotated_width(&self) -> u32 {
		match self.rotation.is_transposed() {
			true => self.height(),
			false => self.width(),
		}
	}

	/// The height after applying the rotation.
	pub fn rotated_height(&self) -> u32 {
		match self.rotation.is_transposed() {
			true => self.width(),
			false => self.height(),
		}
	}

	/// Take another reference to the same buffer.
	pub fn retain(&self) -> Self {
		self.clone()
	}

	/// Give up this reference, freeing the buffer if it was the last one.
	pub fn release(self) {
		drop(self)
	}

	/// The number of outstanding references to the buffer.
	pub fn ref_count(&self) -> usize {
		Arc::strong_count(&self.buffer)
	}

	/// Check if both frames share the same buffer.
	pub fn is_clone(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.buffer, &other.buffer)
	}
}

#[cfg(test)]
mod test {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;
	use crate::{TextureBuffer, TextureType};

	fn texture_frame(released: &Arc<AtomicUsize>) -> Frame {
		let released = released.clone();
		let texture = TextureBuffer::new(640, 480, 3, TextureType::Oes).on_release(move || {
			released.fetch_add(1, Ordering::SeqCst);
		});

		Frame::new(texture, Rotation::Rotation0, 0)
	}

	#[test]
	fn retain_release() {
		let released = Arc::new(AtomicUsize::new(0));
		let frame = texture_frame(&released);

		let retained: Vec<Frame> = (0..5).map(|_| frame.retain()).collect();
		assert_eq!(frame.ref_count(), 6);

		for frame in retained {
			frame.release();
		}

		assert_eq!(frame.ref_count(), 1);
		assert_eq!(released.load(Ordering::SeqCst), 0);

		frame.release();
		assert_eq!(released.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn rotated_dimensions() {
		let released = Arc::new(AtomicUsize::new(0));
		let mut frame = texture_frame(&released);
		assert_eq!((frame.rotated_width(), frame.rotated_height()), (640, 480));

		frame.rotation = Rotation::Rotation90;
		assert_eq!((frame.rotated_width(), frame.rotated_height()), (480, 640));

		frame.rotation = Rotation::Rotation180;
		assert_eq!((frame.rotated_width(), frame.rotated_height()), (640, 480));
	}

	#[test]
	fn rotation_degrees() {
		assert_eq!(Rotation::from_degrees(270).unwrap(), Rotation::Rotation270);
		assert_eq!(Rotation::from_degrees(45).unwrap_err(), Error::InvalidRotation(45));
		assert_eq!(u16::from(Rotation::Rotation90), 90);
	}
}
