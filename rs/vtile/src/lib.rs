//! # vtile: video tiles for real-time conferencing
//!
//! `vtile` tracks the video feed ("tile") of every participant in a call and paints
//! the newest decoded frame of each feed onto a surface from a dedicated render thread.
//!
//! ## API
//!
//! The crate is split into two halves that meet at [VideoRenderView]:
//! - [VideoTileController]: A state machine fed with `(frame, attendee, pause state, tile id)` events.
//!   It fires [VideoTileObserver] callbacks when tiles are added, removed, paused or resumed,
//!   and forwards frames to whatever view is bound to the tile.
//! - [VideoRenderer]: A single-slot frame queue in front of a render thread.
//!   Producers call [VideoRenderer::render] at any rate; only the newest frame is ever painted.
//!
//! A typical remote feed looks like:
//! - The decoder calls [VideoTileController::on_receive_frame] for each decoded [Frame].
//! - The application receives [VideoTileObserver::on_add_video_tile] and binds a [SurfaceView].
//! - [SurfaceView] hands frames to its [VideoRenderer], which draws them with a [Drawer].
//!
//! Local capture uses the same renderer, since [VideoRenderer] is also a [VideoSink].
//!
//! Nothing in here decodes video or talks to the network; those are collaborators behind traits.

mod error;
mod model;
mod observer;

pub mod render;
pub mod source;
pub mod tile;

pub use error::*;
pub use model::*;
pub use observer::*;
pub use render::*;
pub use source::*;
pub use tile::*;
