//! Physical, astrodynamic and numerical constants.
//!
//! Units are km, s and kg unless noted otherwise.

/// Seconds per sidereal day
pub const SIDEREAL_DAY: f64 = 86164.0905;

/// Seconds per solar day
pub const SOLAR_DAY: f64 = 86400.0;

/// Earth rotation rate (deg/s), one revolution per sidereal day
pub const EARTH_ROTATION_DEG_S: f64 = 360.0 / SIDEREAL_DAY;

/// Earth rotation rate (rad/s)
pub const OMEGA_EARTH: f64 = TAU / SIDEREAL_DAY;

/// Threshold below which angular momentum, node, eccentricity and energy
/// magnitudes are treated as zero.
pub const SMALL: f64 = 1e-12;

/// Two pi
pub const TAU: f64 = std::f64::consts::TAU;

/// Degrees to radians
pub const DEG2RAD: f64 = std::f64::consts::PI / 180.0;

/// Radians to degrees
pub const RAD2DEG: f64 = 180.0 / std::f64::consts::PI;
