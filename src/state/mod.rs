//! Saved application state: view XML, whole documents and merging.

mod document;
mod error;
mod merge;
pub mod xml;

pub use document::{AppState, DisplayState};
pub use error::{Result, StateError};
pub use merge::{MergeReport, diff};

#[cfg(test)]
mod tests;
