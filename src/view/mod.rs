//! Display camera state: projection matrices, aspect ratios and the handler
//! that drives a display.

mod aspect;
mod display;
mod handler;
pub mod matrix;

pub use aspect::Aspect;
pub use display::{Display, DisplayError, DisplayMode, ImageInfo, MemoryDisplay};
pub use handler::{SavedView, ViewHandler, ViewState};
pub use matrix::Matrix4;
