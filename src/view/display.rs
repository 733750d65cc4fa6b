//! The display collaborator a view handler drives.
//!
//! A [`Display`] is whatever renders the scene: it owns the live projection
//! matrix and the scale / bounding box / projection-mode switches.
//! [`MemoryDisplay`] keeps everything in memory and backs headless use.

use thiserror::Error;

use super::aspect::Aspect;
use super::matrix::Matrix4;

/// Errors reported by a display.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DisplayError {
    /// The display is gone or not yet realized
    #[error("display unavailable")]
    Unavailable,

    /// The display refused a value
    #[error("display rejected {what}: {reason}")]
    Rejected {
        /// What was being set
        what: &'static str,
        /// Why it was refused
        reason: String,
    },
}

impl DisplayError {
    /// Create a rejection error.
    pub fn rejected(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            what,
            reason: reason.into(),
        }
    }
}

/// Dimensionality of a display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    TwoD,
    ThreeD,
}

impl DisplayMode {
    pub fn is_3d(self) -> bool {
        self == DisplayMode::ThreeD
    }

    /// Number of spatial dimensions, as persisted.
    pub fn dims(self) -> u8 {
        match self {
            DisplayMode::TwoD => 2,
            DisplayMode::ThreeD => 3,
        }
    }

    pub fn from_dims(dims: u8) -> Option<Self> {
        match dims {
            2 => Some(DisplayMode::TwoD),
            3 => Some(DisplayMode::ThreeD),
            _ => None,
        }
    }
}

/// Description of an image-producing data source linked to a display.
///
/// Calibration values are `NaN` when unknown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Number of focal planes
    pub slices: u32,
    /// Physical width in microns
    pub micron_width: f64,
    /// Physical height in microns
    pub micron_height: f64,
    /// Distance between focal planes in microns
    pub micron_step: f64,
}

impl ImageInfo {
    /// Image info without physical calibration.
    pub fn uncalibrated(width: u32, height: u32, slices: u32) -> Self {
        Self {
            width,
            height,
            slices,
            micron_width: f64::NAN,
            micron_height: f64::NAN,
            micron_step: f64::NAN,
        }
    }

    /// Whether any calibration value is usable.
    pub fn is_calibrated(&self) -> bool {
        [self.micron_width, self.micron_height, self.micron_step]
            .iter()
            .any(|v| v.is_finite() && *v > 0.0)
    }
}

/// Rendering surface controlled by a [`super::ViewHandler`].
pub trait Display {
    /// Whether this is a 2D or 3D display.
    fn mode(&self) -> DisplayMode;

    /// Current live projection matrix.
    fn projection_matrix(&self) -> Result<Matrix4, DisplayError>;

    /// Replace the live projection matrix.
    fn set_projection_matrix(&mut self, matrix: &Matrix4) -> Result<(), DisplayError>;

    /// Native projection reset, if the display has one.
    ///
    /// Returns `Ok(false)` when unsupported, leaving the caller to rebuild
    /// the default matrix itself.
    fn reset_projection(&mut self) -> Result<bool, DisplayError> {
        Ok(false)
    }

    /// Native aspect path, used after a native reset.
    fn set_aspect(&mut self, aspect: Aspect) -> Result<(), DisplayError>;

    fn set_scale_enabled(&mut self, enabled: bool) -> Result<(), DisplayError>;

    fn set_box_visible(&mut self, visible: bool) -> Result<(), DisplayError>;

    fn set_parallel_projection(&mut self, parallel: bool) -> Result<(), DisplayError>;

    fn set_eye_separation(&mut self, separation: f64) -> Result<(), DisplayError>;

    /// Image sources linked to this display, in link order.
    fn linked_images(&self) -> Vec<ImageInfo>;
}

// ============================================================================
// In-memory display
// ============================================================================

/// Display that keeps its state in memory.
///
/// Every pushed value is recorded in a public field. `native_reset`
/// advertises the native reset primitive and `failing` makes every fallible
/// call return [`DisplayError::Unavailable`].
#[derive(Debug, Clone)]
pub struct MemoryDisplay {
    pub mode: DisplayMode,
    pub matrix: Matrix4,
    /// Matrix restored by the native reset
    pub home: Matrix4,
    /// Aspect last applied through the native aspect path
    pub native_aspect: Aspect,
    pub scale_enabled: bool,
    pub box_visible: bool,
    pub parallel: bool,
    pub eye_separation: f64,
    pub images: Vec<ImageInfo>,
    pub native_reset: bool,
    pub failing: bool,
}

impl MemoryDisplay {
    pub fn new(mode: DisplayMode) -> Self {
        Self {
            mode,
            matrix: Matrix4::identity(),
            home: Matrix4::identity(),
            native_aspect: Aspect::unit(),
            scale_enabled: false,
            box_visible: false,
            parallel: false,
            eye_separation: 0.0,
            images: Vec::new(),
            native_reset: false,
            failing: false,
        }
    }

    /// Advertise a native reset that restores `home`.
    pub fn with_native_reset(mut self, home: Matrix4) -> Self {
        self.native_reset = true;
        self.home = home;
        self
    }

    /// Link an image source.
    pub fn link(mut self, info: ImageInfo) -> Self {
        self.images.push(info);
        self
    }

    fn check(&self) -> Result<(), DisplayError> {
        if self.failing {
            Err(DisplayError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl Display for MemoryDisplay {
    fn mode(&self) -> DisplayMode {
        self.mode
    }

    fn projection_matrix(&self) -> Result<Matrix4, DisplayError> {
        self.check()?;
        Ok(self.matrix)
    }

    fn set_projection_matrix(&mut self, matrix: &Matrix4) -> Result<(), DisplayError> {
        self.check()?;
        if matrix.0.iter().any(|v| !v.is_finite()) {
            return Err(DisplayError::rejected("matrix", "non-finite element"));
        }
        self.matrix = *matrix;
        Ok(())
    }

    fn reset_projection(&mut self) -> Result<bool, DisplayError> {
        self.check()?;
        if !self.native_reset {
            return Ok(false);
        }
        self.matrix = self.home;
        self.native_aspect = Aspect::unit();
        Ok(true)
    }

    fn set_aspect(&mut self, aspect: Aspect) -> Result<(), DisplayError> {
        self.check()?;
        let old = self.native_aspect;
        self.matrix = self
            .matrix
            .multiply(&Matrix4::aspect_undo(old.x, old.y, old.z))
            .multiply(&Matrix4::scale_xyz(aspect.x, aspect.y, aspect.z));
        self.native_aspect = aspect;
        Ok(())
    }

    fn set_scale_enabled(&mut self, enabled: bool) -> Result<(), DisplayError> {
        self.check()?;
        self.scale_enabled = enabled;
        Ok(())
    }

    fn set_box_visible(&mut self, visible: bool) -> Result<(), DisplayError> {
        self.check()?;
        self.box_visible = visible;
        Ok(())
    }

    fn set_parallel_projection(&mut self, parallel: bool) -> Result<(), DisplayError> {
        self.check()?;
        self.parallel = parallel;
        Ok(())
    }

    fn set_eye_separation(&mut self, separation: f64) -> Result<(), DisplayError> {
        self.check()?;
        self.eye_separation = separation;
        Ok(())
    }

    fn linked_images(&self) -> Vec<ImageInfo> {
        self.images.clone()
    }
}
