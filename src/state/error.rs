//! Error types for saving and restoring application state.

use thiserror::Error;

use crate::transform::TransformError;

/// Errors that can occur while reading or writing saved state.
#[derive(Error, Debug)]
pub enum StateError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing or serialization error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Invalid document structure or content
    #[error("Invalid state: {message}")]
    InvalidFormat {
        /// Description of the problem
        message: String,
    },

    /// Required element is missing
    #[error("Missing element: {element}")]
    MissingElement {
        /// Name of the missing element
        element: String,
    },

    /// Required attribute is missing
    #[error("Missing attribute: {attribute}")]
    MissingAttribute {
        /// Name of the missing attribute
        attribute: String,
    },

    /// Attribute present but unreadable
    #[error("Invalid value '{value}' for attribute {attribute}")]
    InvalidValue {
        /// Name of the attribute
        attribute: String,
        /// The offending value
        value: String,
    },

    /// Transform tag not in the registry
    #[error("Unknown transform type '{tag}'")]
    UnknownTransform {
        /// The unrecognized tag
        tag: String,
    },

    /// Restored transforms don't form a valid tree
    #[error("Invalid transform tree: {0}")]
    Transform(#[from] TransformError),
}

impl StateError {
    /// Create an invalid format error with a message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    pub fn missing_element(element: impl Into<String>) -> Self {
        Self::MissingElement {
            element: element.into(),
        }
    }

    pub fn missing_attribute(attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            attribute: attribute.into(),
        }
    }

    pub fn invalid_value(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StateError>;
