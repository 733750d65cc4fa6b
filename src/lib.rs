//! VisBio view core
//!
//! Headless view-transform and geometry core of a biological image
//! visualizer: per-display camera handling, saved view state, the data
//! transform tree, dataset import and background tasks.

pub mod command;
pub mod config;
pub mod constants;
pub mod geometry;
pub mod import;
pub mod pattern;
pub mod state;
pub mod task;
pub mod transform;
pub mod view;

pub use command::ViewCommand;
pub use config::{AppConfig, ViewConfig};
pub use state::{AppState, StateError};
pub use view::{Display, DisplayMode, MemoryDisplay, ViewHandler};
