/// Mathematica constant pi
pub const PI: f64 = std::f64::consts::PI;

/// Conversion factor from degrees to radians.
pub const DEG_TO_RAD: f64 = PI / 180.0;

/// Row of the ray state vector holding the x position.
pub const X: usize = 0;
/// Row of the ray state vector holding the x slope.
pub const SLOPE_X: usize = 1;
/// Row of the ray state vector holding the y position.
pub const Y: usize = 2;
/// Row of the ray state vector holding the y slope.
pub const SLOPE_Y: usize = 3;
/// Row of the ray state vector holding the homogeneous coordinate, always 1.
pub const HOMOGENEOUS: usize = 4;

/// z position of the detector plane, in metres.
pub const DETECTOR_Z: f64 = 0.0;

/// Default height of the source plane.
pub const DEFAULT_BEAM_Z: f64 = 1.0;

/// Default number of rays in a generated beam.
pub const DEFAULT_NUM_RAYS: usize = 256;

/// Default semi angle of point and axial beams, in radians.
pub const DEFAULT_SEMI_ANGLE: f64 = PI / 4.0;

/// Default radius of a parallel beam.
pub const DEFAULT_BEAM_WIDTH: f64 = 0.2;

/// Default edge length of the square detector.
pub const DEFAULT_DETECTOR_SIZE: f64 = 0.5;

/// Default pixel resolution of the square detector.
pub const DEFAULT_DETECTOR_PIXELS: usize = 128;
