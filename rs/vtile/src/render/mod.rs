//! Frame rendering on a dedicated thread.
//!
//! [VideoRenderer] owns a render thread that processes tasks strictly in order.
//! Producers hand it frames through a single pending slot; the thread paints the
//! newest one through a [Drawer] onto the surface of a [GraphicsContext].
//! Graphics APIs are pluggable through [GraphicsBackend].

mod backend;
mod gate;
mod renderer;
mod transform;
mod view;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::*;
pub use renderer::*;
pub use transform::*;
pub use view::*;
