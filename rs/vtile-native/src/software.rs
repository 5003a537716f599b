use std::sync::Arc;

use kurbo::{Affine, Point};
use parking_lot::Mutex;
use vtile::{Drawer, Error, Frame, Result, Rotation, VideoFrameBuffer, Viewport};

/// A grayscale framebuffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Canvas {
	pub width: u32,
	pub height: u32,
	pub pixels: Vec<u8>,
}

impl Canvas {
	pub fn new(width: u32, height: u32) -> Self {
		Self {
			width,
			height,
			pixels: vec![0; width as usize * height as usize],
		}
	}

	pub fn get(&self, x: u32, y: u32) -> Option<u8> {
		if x >= self.width || y >= self.height {
			return None;
		}

		self.pixels.get(y as usize * self.width as usize + x as usize).copied()
	}

	/// The average value of all pixels, or zero when empty.
	pub fn mean(&self) -> f64 {
		match self.pixels.len() {
			0 => 0.0,
			len => self.pixels.iter().map(|&p| p as f64).sum::<f64>() / len as f64,
		}
	}
}

/// Draws the luma of planar and packed frames into a shared [Canvas].
///
/// Each destination pixel samples the frame with nearest-neighbour filtering,
/// after mapping through the renderer's transform and the frame's rotation.
/// Texture frames need a GPU and are rejected.
#[derive(Debug, Default)]
pub struct SoftwareDrawer {
	canvas: Arc<Mutex<Canvas>>,
	frames: u64,
}

impl SoftwareDrawer {
	pub fn new() -> Self {
		Self::default()
	}

	/// A handle to the canvas, still valid after the drawer moved to a render thread.
	pub fn canvas(&self) -> Arc<Mutex<Canvas>> {
		self.canvas.clone()
	}
}

// Map a displayed unit-square coordinate back to the buffer before rotation.
fn unrotate(point: Point, rotation: Rotation) -> Point {
	match rotation {
		Rotation::Rotation0 => point,
		Rotation::Rotation90 => Point::new(point.y, 1.0 - point.x),
		Rotation::Rotation180 => Point::new(1.0 - point.x, 1.0 - point.y),
		Rotation::Rotation270 => Point::new(1.0 - point.y, point.x),
	}
}

fn luma(buffer: &VideoFrameBuffer, point: Point) -> Result<u8> {
	// Clamped, so edge pixels don't sample past the last row or column.
	let col = |width: u32| ((point.x * width as f64) as u32).min(width.saturating_sub(1)) as usize;
	let row = |height: u32| ((point.y * height as f64) as u32).min(height.saturating_sub(1)) as usize;

	match buffer {
		VideoFrameBuffer::I420(buffer) => Ok(buffer.y.sample(col(buffer.width), row(buffer.height))),
		VideoFrameBuffer::Rgba(buffer) => {
			let (x, y) = (col(buffer.width) * 4, row(buffer.height));
			let r = buffer.data.sample(x, y) as u32;
			let g = buffer.data.sample(x + 1, y) as u32;
			let b = buffer.data.sample(x + 2, y) as u32;

			// BT.601 weights, scaled by 256.
			Ok(((77 * r + 150 * g + 29 * b) >> 8) as u8)
		}
		other => Err(Error::UnsupportedBuffer(format!(
			"software drawer can't sample {}",
			other.kind()
		))),
	}
}

impl Drawer for SoftwareDrawer {
	fn draw_frame(&mut self, frame: &Frame, transform: Affine, viewport: Viewport) -> Result<()> {
		let buffer = frame.buffer();
		if let VideoFrameBuffer::Texture(_) = buffer {
			return Err(Error::UnsupportedBuffer(buffer.kind().to_string()));
		}

		if viewport.width == 0 || viewport.height == 0 {
			return Err(Error::Draw(format!("empty viewport {}x{}", viewport.width, viewport.height)));
		}

		let mut canvas = self.canvas.lock();
		if canvas.width != viewport.width || canvas.height != viewport.height {
			*canvas = Canvas::new(viewport.width, viewport.height);
		}

		let width = viewport.width as f64;
		let height = viewport.height as f64;

		for row in 0..viewport.height {
			for col in 0..viewport.width {
				let display = Point::new((col as f64 + 0.5) / width, (row as f64 + 0.5) / height);
				let sample = unrotate(transform * display, frame.rotation);
				let value = luma(buffer, sample)?;

				canvas.pixels[row as usize * viewport.width as usize + col as usize] = value;
			}
		}

		self.frames += 1;
		Ok(())
	}

	fn release(&mut self) {
		tracing::debug!(frames = self.frames, "released software drawer");
		*self.canvas.lock() = Canvas::default();
	}
}
