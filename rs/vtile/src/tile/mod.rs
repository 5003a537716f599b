//! Tile lifecycle tracking.
//!
//! A tile is the video feed of one attendee (or the local camera).
//! [VideoTileController] classifies every incoming frame event into add, remove, pause
//! and resume transitions, and owns the association between tiles and [VideoRenderView]s.

mod controller;
mod observer;
mod state;
mod view;

pub use controller::*;
pub use observer::*;
pub use state::*;
pub use view::*;
