use std::fmt;

use bytes::Bytes;
use kurbo::Affine;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use parking_lot::Mutex;

use crate::{Error, Result};

/// The pixel storage behind a [crate::Frame].
///
/// Buffers are immutable once produced. They're shared between the producer and the
/// render thread by reference counting the owning [crate::Frame].
#[derive(Debug)]
pub enum VideoFrameBuffer {
	/// YUV 4:2:0 planar, the usual output of a software decoder.
	I420(I420Buffer),

	/// RGBA packed, mostly used by tests and synthetic sources.
	Rgba(RgbaBuffer),

	/// A GPU texture owned by somebody else, returned through a release hook.
	Texture(TextureBuffer),
}

impl VideoFrameBuffer {
	pub fn width(&self) -> u32 {
		match self {
			Self::I420(buffer) => buffer.width,
			Self::Rgba(buffer) => buffer.width,
			Self::Texture(buffer) => buffer.width,
		}
	}

	pub fn height(&self) -> u32 {
		match self {
			Self::I420(buffer) => buffer.height,
			Self::Rgba(buffer) => buffer.height,
			Self::Texture(buffer) => buffer.height,
		}
	}

	/// A short name for logging.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::I420(_) => "i420",
			Self::Rgba(_) => "rgba",
			Self::Texture(buffer) => match buffer.kind {
				TextureType::Oes => "texture-oes",
				TextureType::Rgb => "texture-rgb",
			},
		}
	}

	/// Return the planar buffer, or a descriptive error for any other variant.
	pub fn as_i420(&self) -> Result<&I420Buffer> {
		match self {
			Self::I420(buffer) => Ok(buffer),
			other => Err(Error::UnsupportedBuffer(format!("expected i420, got {}", other.kind()))),
		}
	}

	pub fn as_texture(&self) -> Result<&TextureBuffer> {
		match self {
			Self::Texture(buffer) => Ok(buffer),
			other => Err(Error::UnsupportedBuffer(format!("expected texture, got {}", other.kind()))),
		}
	}
}

impl From<I420Buffer> for VideoFrameBuffer {
	fn from(buffer: I420Buffer) -> Self {
		Self::I420(buffer)
	}
}

impl From<RgbaBuffer> for VideoFrameBuffer {
	fn from(buffer: RgbaBuffer) -> Self {
		Self::Rgba(buffer)
	}
}

impl From<TextureBuffer> for VideoFrameBuffer {
	fn from(buffer: TextureBuffer) -> Self {
		Self::Texture(buffer)
	}
}

/// A single plane of pixel data.
#[derive(Debug, Clone)]
pub struct Plane {
	/// Raw pixel data for this plane.
	pub data: Bytes,

	/// Number of bytes between rows (may include padding).
	pub stride: usize,
}

impl Plane {
	pub fn new(data: impl Into<Bytes>, stride: usize) -> Self {
		Self {
			data: data.into(),
			stride,
		}
	}

	fn validate(&self, name: &'static str, width: u32, height: u32) -> Result<()> {
		let width = width as usize;
		let height = height as usize;

		// The last row doesn't need the padding.
		let required = match height {
			0 => 0,
			_ => self.stride.max(width) * (height - 1) + width,
		};

		if self.stride < width || self.data.len() < required {
			return Err(Error::InvalidPlane {
				plane: name,
				required,
				actual: self.data.len(),
			});
		}

		Ok(())
	}

	/// Return the sample at the given pixel, or zero when out of range.
	pub fn sample(&self, x: usize, y: usize) -> u8 {
		self.data.get(y * self.stride + x).copied().unwrap_or_default()
	}
}

/// YUV 4:2:0 planar pixel data.
#[derive(Debug, Clone)]
pub struct I420Buffer {
	pub width: u32,
	pub height: u32,
	pub y: Plane,
	pub u: Plane,
	pub v: Plane,
}

impl I420Buffer {
	/// Create a buffer after checking each plane is large enough for the dimensions.
	pub fn new(width: u32, height: u32, y: Plane, u: Plane, v: Plane) -> Result<Self> {
		let chroma_width = width.div_ceil(2);
		let chroma_height = height.div_ceil(2);

		y.validate("y", width, height)?;
		u.validate("u", chroma_width, chroma_height)?;
		v.validate("v", chroma_width, chroma_height)?;

		Ok(Self { width, height, y, u, v })
	}

	pub fn chroma_width(&self) -> u32 {
		self.width.div_ceil(2)
	}

	pub fn chroma_height(&self) -> u32 {
		self.height.div_ceil(2)
	}
}

/// RGBA packed pixel data.
#[derive(Debug, Clone)]
pub struct RgbaBuffer {
	pub width: u32,
	pub height: u32,
	pub data: Plane,
}

impl RgbaBuffer {
	pub fn new(width: u32, height: u32, data: Plane) -> Result<Self> {
		data.validate("rgba", width * 4, height)?;
		Ok(Self { width, height, data })
	}
}

/// The kind of GPU texture backing a [TextureBuffer].
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum TextureType {
	/// An external (OES) texture, as produced by camera and decoder surfaces.
	Oes = 0,
	/// A regular 2D RGB texture.
	Rgb = 1,
}

impl TextureType {
	/// Convert a raw code from a foreign media stack.
	pub fn from_code(code: u8) -> Result<Self> {
		Self::try_from(code).map_err(|_| Error::InvalidTextureType(code))
	}
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// A GPU texture owned by the producer.
///
/// The texture is handed back to the producer through the release hook once the
/// last [crate::Frame] referencing it is dropped.
pub struct TextureBuffer {
	pub width: u32,
	pub height: u32,
	pub texture_id: u32,
	pub kind: TextureType,

	/// The transform from unit-square texture coordinates to sampling coordinates.
	pub transform: Option<Affine>,

	release: Mutex<Option<ReleaseHook>>,
}

impl TextureBuffer {
	pub fn new(width: u32, height: u32, texture_id: u32, kind: TextureType) -> Self {
		Self {
			width,
			height,
			texture_id,
			kind,
			transform: None,
			release: Mutex::new(None),
		}
	}

	pub fn with_transform(mut self, transform: Affine) -> Self {
		self.transform = Some(transform);
		self
	}

	/// Run `hook` exactly once when the texture is no longer referenced.
	pub fn on_release<F: FnOnce() + Send + 'static>(self, hook: F) -> Self {
		*self.release.lock() = Some(Box::new(hook));
		self
	}
}

impl fmt::Debug for TextureBuffer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TextureBuffer")
			.field("width", &self.width)
			.field("height", &self.height)
			.field("texture_id", &self.texture_id)
			.field("kind", &self.kind)
			.field("transform", &self.transform)
			.finish()
	}
}

impl Drop for TextureBuffer {
	fn drop(&mut self) {
		if let Some(hook) = self.release.get_mut().take() {
			hook();
		}
	}
}
