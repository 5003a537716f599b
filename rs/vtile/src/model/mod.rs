mod buffer;
mod frame;

pub use buffer::*;
pub use frame::*;
