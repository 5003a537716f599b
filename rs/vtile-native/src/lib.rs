//! Helper library for native applications using vtile.
//!
//! Provides the pieces a binary needs around the core library:
//! - [Log]: `tracing` subscriber setup, configurable from the CLI or a file.
//! - [RenderConfig] and [CaptureConfig]: renderer and capture settings.
//! - [HeadlessBackend]: a graphics backend without a window, for tests and simulations.
//! - [SoftwareDrawer]: draws the luma of a frame into an in-memory canvas.
//! - [PatternSource]: a capture source generating colour bars on its own thread.

mod config;
mod headless;
pub mod log;
mod pattern;
mod software;

pub use config::*;
pub use headless::*;
pub use log::*;
pub use pattern::*;
pub use software::*;

// Re-export the core crate.
pub use vtile;
