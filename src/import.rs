//! Dataset import: turning a file pattern into a dataset transform.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::pattern::{FilePattern, PatternError, find_pattern};
use crate::task::{CancelToken, Progress};
use crate::transform::{TransformError, TransformId, TransformKind, TransformTree};
use crate::view::ImageInfo;

/// Errors that can occur while importing a dataset.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error("Pattern '{0}' matches no files")]
    NoFiles(String),

    #[error("Missing file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Could not read image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Import was cancelled")]
    Cancelled,
}

/// What the user asked to import.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRequest {
    /// Folder holding the files
    pub dir: PathBuf,
    pub pattern: String,
    /// Name of the new dataset
    pub name: String,
    pub micron_width: Option<f64>,
    pub micron_height: Option<f64>,
    /// Distance between focal planes
    pub micron_step: Option<f64>,
}

impl DatasetRequest {
    pub fn new(dir: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        Self {
            dir: dir.into(),
            name: pattern.clone(),
            pattern,
            micron_width: None,
            micron_height: None,
            micron_step: None,
        }
    }
}

/// A scanned dataset, ready to be added to the transform tree.
#[derive(Debug, Clone)]
pub struct DatasetImport {
    pub name: String,
    pub kind: TransformKind,
}

impl DatasetImport {
    pub fn image(&self) -> Option<ImageInfo> {
        self.kind.derive_image(None)
    }

    /// Add the dataset as a new root transform.
    pub fn add_to(self, tree: &mut TransformTree) -> Result<TransformId, TransformError> {
        tree.add(self.name, None, self.kind)
    }
}

/// Check every file of a pattern and read the series dimensions.
///
/// Cancellation is checked before each file. Each image file of the series
/// becomes one focal plane; dimensions come from the first file.
pub fn scan_dataset(
    request: &DatasetRequest,
    cancel: &CancelToken,
    progress: &Progress,
) -> Result<DatasetImport, ImportError> {
    let pattern = FilePattern::new(&request.pattern)?;
    let files = pattern.files();
    if files.is_empty() {
        return Err(ImportError::NoFiles(request.pattern.clone()));
    }

    let total = files.len();
    for (i, file) in files.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        let path = request.dir.join(file);
        if !path.is_file() {
            return Err(ImportError::MissingFile(path));
        }
        progress.report(i as f32 / total as f32, format!("Checking {}", file));
    }

    let (width, height) = image::image_dimensions(request.dir.join(&files[0]))?;
    progress.report(1.0, "Done");
    log::info!(
        "Scanned dataset '{}': {} file(s) of {}x{}",
        request.name,
        total,
        width,
        height
    );

    let calibration = |v: Option<f64>| v.unwrap_or(f64::NAN);
    Ok(DatasetImport {
        name: request.name.clone(),
        kind: TransformKind::Dataset {
            pattern: request.pattern.clone(),
            image: ImageInfo {
                width,
                height,
                slices: total as u32,
                micron_width: calibration(request.micron_width),
                micron_height: calibration(request.micron_height),
                micron_step: calibration(request.micron_step),
            },
            files,
        },
    })
}

/// Infer a pattern for `file` from the other files in its folder.
pub fn pattern_for_file(file: &Path) -> Result<String, ImportError> {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| ImportError::MissingFile(file.to_path_buf()))?;
    let dir = match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut siblings = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            siblings.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    Ok(find_pattern(&name, &siblings))
}
