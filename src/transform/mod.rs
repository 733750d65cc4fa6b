//! Data transforms: datasets and the derived views built from them.

mod kind;
mod tree;

pub use kind::{TRANSFORM_TAGS, TransformKind};
pub use tree::{DataTransform, TransformId, TransformTree};

use thiserror::Error;

/// Errors from editing the transform tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The referenced parent is not in the tree
    #[error("Parent transform {0} not found")]
    MissingParent(TransformId),

    /// A derived transform was added without a parent
    #[error("A '{tag}' transform needs a parent")]
    ParentRequired {
        /// Tag of the offending transform
        tag: &'static str,
    },

    /// A root transform was given a parent
    #[error("A '{tag}' transform cannot have a parent")]
    UnexpectedParent {
        /// Tag of the offending transform
        tag: &'static str,
    },

    /// Another transform already uses this id
    #[error("Duplicate transform id {0}")]
    DuplicateId(TransformId),

    /// The id is the largest representable, leaving none for later transforms
    #[error("Transform id {0} leaves no room for further ids")]
    IdOverflow(TransformId),
}
