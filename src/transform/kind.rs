//! Transform kinds and the tag registry used to persist them.
//!
//! Every kind has a stable string tag. Saving writes the tag plus the
//! kind's attributes; restoring looks the tag up in [`TransformKind::from_tag`],
//! which is the only place a stored transform is turned back into a value.

use std::collections::HashMap;

use crate::state::StateError;
use crate::view::ImageInfo;

/// Tags of all known transform kinds, in registry order.
pub const TRANSFORM_TAGS: &[&str] = &["dataset", "subsample", "projection", "slice"];

/// What a data transform does.
#[derive(Debug, Clone)]
pub enum TransformKind {
    /// Image series loaded from files on disk
    Dataset {
        /// File pattern the dataset was imported from
        pattern: String,
        /// Matched files, in stack order
        files: Vec<String>,
        /// Dimensions and calibration of the series
        image: ImageInfo,
    },
    /// Keep every n-th sample along each axis
    Subsample { x: u32, y: u32, z: u32 },
    /// Maximum intensity projection through the stack
    MaxProjection,
    /// A single focal plane of the stack
    Slice { slice: u32 },
}

impl TransformKind {
    /// Stable tag identifying the kind in saved state.
    pub fn tag(&self) -> &'static str {
        match self {
            TransformKind::Dataset { .. } => "dataset",
            TransformKind::Subsample { .. } => "subsample",
            TransformKind::MaxProjection => "projection",
            TransformKind::Slice { .. } => "slice",
        }
    }

    /// Human-readable kind name.
    pub fn display_name(&self) -> &'static str {
        match self {
            TransformKind::Dataset { .. } => "Dataset",
            TransformKind::Subsample { .. } => "Data sampling",
            TransformKind::MaxProjection => "Maximum intensity projection",
            TransformKind::Slice { .. } => "Slice",
        }
    }

    /// Whether this kind stands at the root of the tree (no parent).
    pub fn is_root(&self) -> bool {
        matches!(self, TransformKind::Dataset { .. })
    }

    /// Kind-specific attributes, as written to saved state.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        match self {
            TransformKind::Dataset { pattern, image, .. } => vec![
                ("pattern", pattern.clone()),
                ("width", image.width.to_string()),
                ("height", image.height.to_string()),
                ("slices", image.slices.to_string()),
                ("micronWidth", image.micron_width.to_string()),
                ("micronHeight", image.micron_height.to_string()),
                ("micronStep", image.micron_step.to_string()),
            ],
            TransformKind::Subsample { x, y, z } => vec![
                ("x", x.to_string()),
                ("y", y.to_string()),
                ("z", z.to_string()),
            ],
            TransformKind::MaxProjection => Vec::new(),
            TransformKind::Slice { slice } => vec![("slice", slice.to_string())],
        }
    }

    /// Source files of a dataset; empty for derived kinds.
    pub fn files(&self) -> &[String] {
        match self {
            TransformKind::Dataset { files, .. } => files,
            _ => &[],
        }
    }

    /// Whether two kinds persist identically.
    pub fn same_as(&self, other: &TransformKind) -> bool {
        self.tag() == other.tag()
            && self.attributes() == other.attributes()
            && self.files() == other.files()
    }

    /// Rebuild a kind from its tag and saved attributes.
    pub fn from_tag(
        tag: &str,
        attrs: &HashMap<String, String>,
        files: Vec<String>,
    ) -> Result<Self, StateError> {
        match tag {
            "dataset" => Ok(TransformKind::Dataset {
                pattern: required(attrs, "pattern")?.to_string(),
                files,
                image: ImageInfo {
                    width: parse(attrs, "width")?,
                    height: parse(attrs, "height")?,
                    slices: parse(attrs, "slices")?,
                    micron_width: optional_f64(attrs, "micronWidth")?,
                    micron_height: optional_f64(attrs, "micronHeight")?,
                    micron_step: optional_f64(attrs, "micronStep")?,
                },
            }),
            "subsample" => Ok(TransformKind::Subsample {
                x: positive(attrs, "x")?,
                y: positive(attrs, "y")?,
                z: positive(attrs, "z")?,
            }),
            "projection" => Ok(TransformKind::MaxProjection),
            "slice" => Ok(TransformKind::Slice {
                slice: parse(attrs, "slice")?,
            }),
            other => Err(StateError::UnknownTransform {
                tag: other.to_string(),
            }),
        }
    }

    /// Image produced by this kind given its parent's image.
    pub fn derive_image(&self, parent: Option<ImageInfo>) -> Option<ImageInfo> {
        match self {
            TransformKind::Dataset { image, .. } => Some(*image),
            TransformKind::Subsample { x, y, z } => parent.map(|p| ImageInfo {
                width: p.width.div_ceil(*x),
                height: p.height.div_ceil(*y),
                slices: p.slices.div_ceil(*z),
                micron_step: p.micron_step * *z as f64,
                ..p
            }),
            TransformKind::MaxProjection | TransformKind::Slice { .. } => {
                parent.map(|p| ImageInfo {
                    slices: 1,
                    micron_step: f64::NAN,
                    ..p
                })
            }
        }
    }
}

fn required<'a>(attrs: &'a HashMap<String, String>, key: &str) -> Result<&'a str, StateError> {
    attrs
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| StateError::missing_attribute(key))
}

fn parse(attrs: &HashMap<String, String>, key: &str) -> Result<u32, StateError> {
    let value = required(attrs, key)?;
    value
        .trim()
        .parse()
        .map_err(|_| StateError::invalid_value(key, value))
}

fn positive(attrs: &HashMap<String, String>, key: &str) -> Result<u32, StateError> {
    match parse(attrs, key)? {
        0 => Err(StateError::invalid_value(key, "0")),
        v => Ok(v),
    }
}

/// Calibration values may be absent; absent reads as NaN.
fn optional_f64(attrs: &HashMap<String, String>, key: &str) -> Result<f64, StateError> {
    match attrs.get(key) {
        None => Ok(f64::NAN),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| StateError::invalid_value(key, value)),
    }
}
