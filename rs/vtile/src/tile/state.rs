use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{Error, Result};

/// Attendee ids of content shares (screen share) end with this suffix.
pub const CONTENT_SUFFIX: &str = "#content";

/// Identifies a video feed for the duration of an attendee's session.
///
/// Ids are assigned by the media client and may be reused after the tile is removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display, derive_more::From)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileId(pub i32);

/// Whether a tile is currently receiving video.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, derive_more::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PauseState {
	#[display("unpaused")]
	Unpaused = 0,

	/// The local user asked to stop receiving this feed.
	#[display("paused by user request")]
	PausedByUserRequest = 1,

	/// The media client paused the feed because the connection can't sustain it.
	#[display("paused for poor connection")]
	PausedForPoorConnection = 2,
}

impl Default for PauseState {
	fn default() -> Self {
		Self::Unpaused
	}
}

impl PauseState {
	/// Convert a raw code from a foreign media stack.
	pub fn from_code(code: u8) -> Result<Self> {
		Self::try_from(code).map_err(|_| Error::InvalidPauseState(code))
	}

	pub fn is_paused(self) -> bool {
		self != Self::Unpaused
	}
}

/// An immutable snapshot of a tile, handed to observers.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VideoTileState {
	pub tile_id: TileId,

	/// The attendee that owns the feed, or `None` for the local tile.
	pub attendee_id: Option<String>,

	pub pause_state: PauseState,
}

impl VideoTileState {
	pub fn new(tile_id: TileId, attendee_id: Option<String>, pause_state: PauseState) -> Self {
		Self {
			tile_id,
			attendee_id,
			pause_state,
		}
	}

	pub fn is_local_tile(&self) -> bool {
		self.attendee_id.is_none()
	}

	/// Whether the tile is a content share rather than a camera.
	pub fn is_content(&self) -> bool {
		self.attendee_id
			.as_deref()
			.is_some_and(|attendee| attendee.ends_with(CONTENT_SUFFIX))
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn derived_flags() {
		let local = VideoTileState::new(TileId(1), None, PauseState::Unpaused);
		assert!(local.is_local_tile());
		assert!(!local.is_content());

		let remote = VideoTileState::new(TileId(2), Some("alice".into()), PauseState::Unpaused);
		assert!(!remote.is_local_tile());
		assert!(!remote.is_content());

		let content = VideoTileState::new(TileId(3), Some("alice#content".into()), PauseState::Unpaused);
		assert!(content.is_content());
	}

	#[test]
	fn pause_codes() {
		assert_eq!(PauseState::from_code(0).unwrap(), PauseState::Unpaused);
		assert_eq!(PauseState::from_code(2).unwrap(), PauseState::PausedForPoorConnection);
		assert_eq!(PauseState::from_code(9).unwrap_err(), Error::InvalidPauseState(9));

		assert!(!PauseState::Unpaused.is_paused());
		assert!(PauseState::PausedByUserRequest.is_paused());
		assert_eq!(PauseState::PausedForPoorConnection.to_string(), "paused for poor connection");
	}
}
