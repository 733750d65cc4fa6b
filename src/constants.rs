//! Global constants for the VisBio view core

/// Multiplier applied by a single zoom-in step (zoom-out uses the reciprocal)
pub const ZOOM_FACTOR: f64 = 1.5;

/// Rotation applied by a single rotate step, in degrees
pub const ROTATION_STEP: f64 = 15.0;

/// Translation applied by a single pan step, in normalized display units
pub const PAN_STEP: f64 = 0.25;

/// Default camera zoom for 2D displays
pub const DEFAULT_ZOOM_2D: f64 = 0.9;

/// Default camera zoom for 3D displays
pub const DEFAULT_ZOOM_3D: f64 = 0.5;

/// Default camera rotation (x, y, z degrees) for 3D displays
pub const DEFAULT_ROTATION_3D: [f64; 3] = [-60.0, 0.0, -30.0];

/// Default stereo eye separation
pub const DEFAULT_EYE_SEPARATION: f64 = 0.002;

/// Squared length under which a bisector average counts as zero
pub const BISECTOR_EPSILON: f64 = 1e-12;

/// Delimiter of the array-to-string convention used in persisted state
pub const ARRAY_DELIMITER: char = ',';

/// Version written to the root element of saved state documents
pub const STATE_VERSION: &str = "1";

/// Largest number of file names a single file pattern may expand to
pub const MAX_PATTERN_FILES: usize = 1_000_000;
