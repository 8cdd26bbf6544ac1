//! Elementary direction-cosine matrices.
//!
//! All matrices are passive: `r3(θ)` rotates the coordinate frame by +θ
//! about the third axis, so `r3(θ) * v` expresses `v` in the rotated frame.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::constants::{DEG2RAD, RAD2DEG};

/// Unit of every angle passed to or returned from a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleUnit {
    #[default]
    Radians,
    Degrees,
}

impl AngleUnit {
    /// Convert an angle expressed in this unit to radians.
    pub fn to_radians(self, angle: f64) -> f64 {
        match self {
            AngleUnit::Radians => angle,
            AngleUnit::Degrees => angle * DEG2RAD,
        }
    }

    /// Express an angle given in radians in this unit.
    pub fn from_radians(self, angle: f64) -> f64 {
        match self {
            AngleUnit::Radians => angle,
            AngleUnit::Degrees => angle * RAD2DEG,
        }
    }
}

/// Rotation about the first (x) axis.
#[rustfmt::skip]
pub fn r1(angle: f64, unit: AngleUnit) -> Matrix3<f64> {
    let (s, c) = unit.to_radians(angle).sin_cos();
    Matrix3::new(
        1.0, 0.0, 0.0,
        0.0, c, s,
        0.0, -s, c,
    )
}

/// Rotation about the second (y) axis.
#[rustfmt::skip]
pub fn r2(angle: f64, unit: AngleUnit) -> Matrix3<f64> {
    let (s, c) = unit.to_radians(angle).sin_cos();
    Matrix3::new(
        c, 0.0, -s,
        0.0, 1.0, 0.0,
        s, 0.0, c,
    )
}

/// Rotation about the third (z) axis.
#[rustfmt::skip]
pub fn r3(angle: f64, unit: AngleUnit) -> Matrix3<f64> {
    let (s, c) = unit.to_radians(angle).sin_cos();
    Matrix3::new(
        c, s, 0.0,
        -s, c, 0.0,
        0.0, 0.0, 1.0,
    )
}

/// Inertial-to-perifocal DCM, the 3-1-3 sequence `R3(ω)·R1(i)·R3(Ω)`.
///
/// Angles in radians. The transpose maps perifocal vectors to inertial.
pub fn perifocal_dcm(raan: f64, inc: f64, aop: f64) -> Matrix3<f64> {
    r3(aop, AngleUnit::Radians) * r1(inc, AngleUnit::Radians) * r3(raan, AngleUnit::Radians)
}
