use kurbo::Affine;

/// How frames are fitted onto the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Layout {
	/// The width/height ratio of the drawn area, or zero to match each frame.
	pub aspect_ratio: f32,
	pub mirror_horizontally: bool,
	pub mirror_vertically: bool,
}

impl Layout {
	/// The texture transform for a frame with the given (rotated) dimensions.
	///
	/// The frame is cropped around its centre to the layout's aspect ratio:
	/// a frame wider than the target is scaled horizontally, otherwise vertically.
	/// Mirroring flips around the centre as well.
	pub fn transform(&self, frame_width: u32, frame_height: u32) -> Affine {
		let frame_ratio = match frame_height {
			0 => 1.0,
			height => frame_width as f64 / height as f64,
		};

		let drawn_ratio = match self.aspect_ratio {
			ratio if ratio > 0.0 => ratio as f64,
			_ => frame_ratio,
		};

		let (scale_x, scale_y) = match frame_ratio > drawn_ratio {
			true => (drawn_ratio / frame_ratio, 1.0),
			false => (1.0, frame_ratio / drawn_ratio),
		};

		let mirror_x = if self.mirror_horizontally { -1.0 } else { 1.0 };
		let mirror_y = if self.mirror_vertically { -1.0 } else { 1.0 };

		Affine::translate((0.5, 0.5))
			* Affine::scale_non_uniform(mirror_x, mirror_y)
			* Affine::scale_non_uniform(scale_x, scale_y)
			* Affine::translate((-0.5, -0.5))
	}
}

#[cfg(test)]
mod test {
	use kurbo::Point;

	use super::*;

	fn assert_close(actual: Affine, expected: [f64; 6]) {
		for (a, e) in actual.as_coeffs().iter().zip(expected) {
			assert!((a - e).abs() < 1e-6, "{actual:?} != {expected:?}");
		}
	}

	#[test]
	fn match_frame() {
		let layout = Layout::default();
		assert_close(layout.transform(1280, 720), [1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
		assert_close(layout.transform(0, 0), [1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
	}

	#[test]
	fn wide_frame_into_square() {
		let layout = Layout {
			aspect_ratio: 1.0,
			..Default::default()
		};

		// Only the middle 9/16ths of the width are sampled.
		let transform = layout.transform(1920, 1080);
		assert_close(transform, [0.5625, 0.0, 0.0, 1.0, 0.21875, 0.0]);
		assert_eq!(transform * Point::new(0.5, 0.5), Point::new(0.5, 0.5));
	}

	#[test]
	fn tall_frame_into_wide() {
		let layout = Layout {
			aspect_ratio: 2.0,
			..Default::default()
		};

		let transform = layout.transform(1000, 1000);
		assert_close(transform, [1.0, 0.0, 0.0, 0.5, 0.0, 0.25]);
	}

	#[test]
	fn mirrored() {
		let layout = Layout {
			mirror_horizontally: true,
			..Default::default()
		};

		let transform = layout.transform(640, 480);
		let point = transform * Point::new(0.0, 0.25);
		assert!((point.x - 1.0).abs() < 1e-9);
		assert!((point.y - 0.25).abs() < 1e-9);

		let layout = Layout {
			mirror_vertically: true,
			..layout
		};
		let point = layout.transform(640, 480) * Point::new(0.0, 0.0);
		assert!((point.x - 1.0).abs() < 1e-9);
		assert!((point.y - 1.0).abs() < 1e-9);
	}
}
