use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq)]
enum Limit {
	Unlimited,
	Period(Duration),
	Paused,
}

/// Decides whether a frame may be painted, given an optional frame rate cap.
///
/// Paints are scheduled one period apart. A late paint moves the schedule up to
/// the time it happened, so a stall never allows a burst of catch-up frames.
/// The first frame after a change of limit is always allowed.
#[derive(Debug)]
pub(crate) struct FpsGate {
	limit: Limit,
	next: Option<Instant>,
}

impl FpsGate {
	pub fn new(max_fps: Option<f32>) -> Self {
		let mut gate = Self {
			limit: Limit::Unlimited,
			next: None,
		};

		if let Some(fps) = max_fps {
			gate.set_max_fps(fps);
		}

		gate
	}

	/// Limit painting to `fps`. Zero, negative or NaN pauses, infinity disables the cap.
	pub fn set_max_fps(&mut self, fps: f32) {
		self.limit = if fps.is_infinite() && fps > 0.0 {
			Limit::Unlimited
		} else if fps > 0.0 {
			// A rate too small to express as a period never paints.
			match Duration::try_from_secs_f64(1.0 / fps as f64) {
				Ok(period) => Limit::Period(period),
				Err(_) => Limit::Paused,
			}
		} else {
			Limit::Paused
		};

		self.next = None;
	}

	pub fn disable(&mut self) {
		self.limit = Limit::Unlimited;
		self.next = None;
	}

	pub fn pause(&mut self) {
		self.limit = Limit::Paused;
		self.next = None;
	}

	#[cfg(test)]
	pub fn is_paused(&self) -> bool {
		self.limit == Limit::Paused
	}

	/// The earliest time the next frame may be painted, if capped.
	#[cfg(test)]
	pub fn next_allowed(&self) -> Option<Instant> {
		self.next
	}

	/// Returns true if a frame arriving at `now` should be painted, advancing the gate if so.
	pub fn should_render(&mut self, now: Instant) -> bool {
		let period = match self.limit {
			Limit::Unlimited => return true,
			Limit::Paused => return false,
			Limit::Period(period) => period,
		};

		self.next = match self.next {
			Some(next) if now < next => return false,
			Some(next) => Some((next + period).max(now)),
			None => Some(now + period),
		};

		true
	}
}
