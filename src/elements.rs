//! Classical orbital elements and their conversion to and from state vectors.
//!
//! Every conversion takes an explicit [`AngleUnit`]; nothing is inferred
//! from magnitudes. Geometries for which an angle is undefined (circular,
//! equatorial, parabolic) still yield a value, the documented fallback, but
//! the returned [`ElementSet`] records which fallbacks were taken so callers
//! can treat them as missing instead.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::constants::{SMALL, TAU};
use crate::error::GeometryError;
use crate::rotation::{perifocal_dcm, AngleUnit};
use crate::state::StateVector;

/// Classical (osculating) orbital elements.
///
/// The unit of the four angles is carried alongside, never stored here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassicalElements {
    /// Semi-major axis (km); negative for hyperbolas, +∞ for parabolas
    pub a: f64,
    /// Eccentricity
    pub e: f64,
    /// Inclination
    pub i: f64,
    /// Right ascension of the ascending node
    pub raan: f64,
    /// Argument of periapsis
    pub aop: f64,
    /// True anomaly
    pub ta: f64,
}

impl ClassicalElements {
    pub fn new(a: f64, e: f64, i: f64, raan: f64, aop: f64, ta: f64) -> Self {
        ClassicalElements { a, e, i, raan, aop, ta }
    }

    /// Create elements from angles in degrees, stored in radians.
    pub fn from_degrees(a: f64, e: f64, i_deg: f64, raan_deg: f64, aop_deg: f64, ta_deg: f64) -> Self {
        ClassicalElements::new(a, e, i_deg, raan_deg, aop_deg, ta_deg)
            .convert(AngleUnit::Degrees, AngleUnit::Radians)
    }

    /// Re-express the angles, currently in `from`, in `to`.
    pub fn convert(&self, from: AngleUnit, to: AngleUnit) -> Self {
        let f = |x: f64| to.from_radians(from.to_radians(x));
        ClassicalElements {
            a: self.a,
            e: self.e,
            i: f(self.i),
            raan: f(self.raan),
            aop: f(self.aop),
            ta: f(self.ta),
        }
    }

    /// `[a, e, i, raan, aop, ta]`
    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.e, self.i, self.raan, self.aop, self.ta]
    }

    /// Semi-latus rectum p = a(1 - e²) (km).
    pub fn semi_latus_rectum(&self) -> f64 {
        self.a * (1.0 - self.e * self.e)
    }

    pub fn is_closed(&self) -> bool {
        self.e < 1.0 && self.a.is_finite() && self.a > 0.0
    }

    /// Orbital period (s), `None` for open orbits.
    pub fn period(&self, mu: f64) -> Option<f64> {
        self.is_closed().then(|| TAU * (self.a.powi(3) / mu).sqrt())
    }
}

/// Which angles fell back to their conventional value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Degeneracy {
    /// |e| at or below threshold: ω and ν are set to 0.
    pub circular: bool,
    /// Node vector at or below threshold: Ω is set to 0 and ω is measured
    /// from the inertial x axis (longitude of periapsis).
    pub equatorial: bool,
    /// |ε| at or below threshold: a is +∞.
    pub parabolic: bool,
}

impl Degeneracy {
    pub fn any(&self) -> bool {
        self.circular || self.equatorial || self.parabolic
    }
}

/// Elements recovered from a state vector, with the fallbacks that were applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementSet {
    /// Elements with fallback values filled in
    pub elements: ClassicalElements,
    pub degeneracy: Degeneracy,
    /// Unit of the angles in `elements`
    pub unit: AngleUnit,
    /// Threshold that decided every degenerate branch
    pub threshold: f64,
}

impl ElementSet {
    pub fn semi_major_axis(&self) -> Option<f64> {
        (!self.degeneracy.parabolic).then_some(self.elements.a)
    }

    pub fn raan(&self) -> Option<f64> {
        (!self.degeneracy.equatorial).then_some(self.elements.raan)
    }

    pub fn aop(&self) -> Option<f64> {
        (!(self.degeneracy.circular || self.degeneracy.equatorial)).then_some(self.elements.aop)
    }

    pub fn true_anomaly(&self) -> Option<f64> {
        (!self.degeneracy.circular).then_some(self.elements.ta)
    }
}

/// Normalize angle to [0, 2π).
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle % TAU;
    if a < 0.0 { a + TAU } else { a }
}

/// arccos with its argument clamped to [-1, 1] against round-off overshoot.
fn clamped_acos(x: f64) -> f64 {
    x.clamp(-1.0, 1.0).acos()
}

/// State vector from classical elements whose angles are in `unit`.
///
/// Position and velocity are built in the perifocal frame from the conic
/// equation and vis-viva, then rotated to inertial by the transpose of
/// `R3(ω)·R1(i)·R3(Ω)`.
pub fn sv_from_coe(
    coe: &ClassicalElements,
    mu: f64,
    unit: AngleUnit,
) -> Result<StateVector, GeometryError> {
    let c = coe.convert(unit, AngleUnit::Radians);
    let p = c.semi_latus_rectum();
    if !p.is_finite() || p <= SMALL {
        return Err(GeometryError::DegenerateConic {
            a: c.a,
            e: c.e,
            semi_latus_rectum: p,
        });
    }

    let (sin_ta, cos_ta) = c.ta.sin_cos();
    let denom = 1.0 + c.e * cos_ta;
    if denom <= 0.0 {
        return Err(GeometryError::BeyondAsymptote { e: c.e, ta: c.ta });
    }

    let r_pqw = p / denom * Vector3::new(cos_ta, sin_ta, 0.0);
    let v_pqw = (mu / p).sqrt() * Vector3::new(-sin_ta, c.e + cos_ta, 0.0);

    let q = perifocal_dcm(c.raan, c.i, c.aop).transpose();
    Ok(StateVector::new(q * r_pqw, q * v_pqw))
}

/// Classical elements from a state vector, angles in `unit`, using [`SMALL`]
/// as the degeneracy threshold.
pub fn coe_from_sv(state: &StateVector, mu: f64, unit: AngleUnit) -> Result<ElementSet, GeometryError> {
    coe_from_sv_with_threshold(state, mu, unit, SMALL)
}

/// [`coe_from_sv`] with a caller-chosen degeneracy threshold.
///
/// A near-zero angular momentum (rectilinear motion) has no orbit plane and
/// is reported as [`GeometryError::Rectilinear`].
pub fn coe_from_sv_with_threshold(
    state: &StateVector,
    mu: f64,
    unit: AngleUnit,
    threshold: f64,
) -> Result<ElementSet, GeometryError> {
    let r = &state.r;
    let v = &state.v;
    let r_mag = r.norm();
    let v_mag = v.norm();

    let h = r.cross(v);
    let h_mag = h.norm();
    if h_mag < threshold {
        return Err(GeometryError::Rectilinear {
            h_mag,
            threshold,
            r: [r.x, r.y, r.z],
            v: [v.x, v.y, v.z],
        });
    }

    let n = Vector3::new(-h.y, h.x, 0.0);
    let n_mag = n.norm();
    let r_dot_v = r.dot(v);
    let e_vec = ((v_mag * v_mag - mu / r_mag) * r - r_dot_v * v) / mu;
    let e = e_vec.norm();

    let energy = v_mag * v_mag / 2.0 - mu / r_mag;

    let degeneracy = Degeneracy {
        circular: e <= threshold,
        equatorial: n_mag <= threshold,
        parabolic: energy.abs() <= threshold,
    };

    let a = if degeneracy.parabolic {
        f64::INFINITY
    } else {
        -mu / (2.0 * energy)
    };

    let i = clamped_acos(h.z / h_mag);

    let raan = if degeneracy.equatorial {
        0.0
    } else {
        let raan = clamped_acos(n.x / n_mag);
        if n.y < 0.0 { TAU - raan } else { raan }
    };

    let aop = if degeneracy.circular {
        0.0
    } else if degeneracy.equatorial {
        // Longitude of periapsis, mirrored for retrograde orbits so that
        // sv_from_coe with Ω = 0 reproduces the same periapsis direction.
        let lon = clamped_acos(e_vec.x / e);
        let lon = if e_vec.y < 0.0 { TAU - lon } else { lon };
        if h.z < 0.0 { normalize_angle(TAU - lon) } else { lon }
    } else {
        let aop = clamped_acos(n.dot(&e_vec) / (n_mag * e));
        if e_vec.z < 0.0 { TAU - aop } else { aop }
    };

    let ta = if degeneracy.circular {
        0.0
    } else {
        let ta = clamped_acos(e_vec.dot(r) / (e * r_mag));
        if r_dot_v < 0.0 { TAU - ta } else { ta }
    };

    let elements = ClassicalElements::new(a, e, i, raan, aop, ta)
        .convert(AngleUnit::Radians, unit);

    Ok(ElementSet {
        elements,
        degeneracy,
        unit,
        threshold,
    })
}

/// Orbital period (s) of the closed orbit through `state`.
///
/// Semi-major axis from vis-viva, then Kepler's third law. Open orbits
/// (non-negative specific energy) have no period.
pub fn period_from_sv(state: &StateVector, mu: f64) -> Result<f64, GeometryError> {
    let energy = state.energy(mu);
    if !(energy < 0.0) {
        return Err(GeometryError::OpenOrbit {
            energy,
            r: [state.r.x, state.r.y, state.r.z],
            v: [state.v.x, state.v.y, state.v.z],
        });
    }
    let a = -mu / (2.0 * energy);
    Ok(TAU * (a.powi(3) / mu).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEG2RAD, RAD2DEG};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use std::f64::consts::PI;
    use rand::{Rng, SeedableRng};

    const MU: f64 = 398600.0;

    /// Smallest signed difference between two angles in radians.
    fn angle_between(a: f64, b: f64) -> f64 {
        (a - b + PI).rem_euclid(TAU) - PI
    }

    #[test]
    fn test_round_trip_non_degenerate() {
        let cases = [
            ClassicalElements::new(7000.0, 0.05, 0.9, 0.5, 1.3, 0.4),
            ClassicalElements::new(26600.0, 0.74, 1.1, 4.0, 4.7, 3.5),
            ClassicalElements::new(42164.0, 0.3, 2.9, 2.2, 5.5, 5.0),
            ClassicalElements::new(12000.0, 0.95, 0.2, 1.0, 2.5, 2.0),
        ];
        for coe in cases {
            let sv = sv_from_coe(&coe, MU, AngleUnit::Radians).unwrap();
            let back = coe_from_sv(&sv, MU, AngleUnit::Radians).unwrap();
            assert!(!back.degeneracy.any());
            let got = back.elements;
            assert_relative_eq!(got.a, coe.a, max_relative = 1e-6);
            assert_relative_eq!(got.e, coe.e, max_relative = 1e-6);
            assert_relative_eq!(got.i, coe.i, max_relative = 1e-6);
            assert_relative_eq!(got.raan, coe.raan, max_relative = 1e-6);
            assert_relative_eq!(got.aop, coe.aop, max_relative = 1e-6);
            assert_relative_eq!(got.ta, coe.ta, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_round_trip_random_orientations() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..500 {
            let coe = ClassicalElements::new(
                rng.gen_range(6600.0..60000.0),
                rng.gen_range(0.01..0.9),
                rng.gen_range(0.05..PI - 0.05),
                rng.gen::<f64>() * TAU,
                rng.gen::<f64>() * TAU,
                rng.gen::<f64>() * TAU,
            );
            let sv = sv_from_coe(&coe, MU, AngleUnit::Radians).unwrap();
            let back = coe_from_sv(&sv, MU, AngleUnit::Radians).unwrap();
            assert!(!back.degeneracy.any(), "{coe:?} flagged degenerate");
            assert_eq!(back.semi_major_axis(), Some(back.elements.a));

            let got = back.elements;
            assert_relative_eq!(got.a, coe.a, max_relative = 1e-8);
            assert_relative_eq!(got.e, coe.e, max_relative = 1e-8);
            assert_relative_eq!(got.i, coe.i, epsilon = 1e-8);
            for (name, got, want) in [
                ("raan", got.raan, coe.raan),
                ("aop", got.aop, coe.aop),
                ("ta", got.ta, coe.ta),
            ] {
                assert!((0.0..TAU).contains(&got), "{name} = {got} not normalized");
                assert!(
                    angle_between(got, want).abs() < 1e-6,
                    "{name}: {got} vs {want} for {coe:?}"
                );
            }
        }
    }

    #[test]
    fn test_degrees_and_radians_agree() {
        let deg = ClassicalElements::new(8000.0, 0.1, 45.0, 30.0, 60.0, 90.0);
        let rad = ClassicalElements::from_degrees(8000.0, 0.1, 45.0, 30.0, 60.0, 90.0);
        let a = sv_from_coe(&deg, MU, AngleUnit::Degrees).unwrap();
        let b = sv_from_coe(&rad, MU, AngleUnit::Radians).unwrap();
        assert_relative_eq!(a.r, b.r, epsilon = 1e-9);
        assert_relative_eq!(a.v, b.v, epsilon = 1e-12);

        let back = coe_from_sv(&a, MU, AngleUnit::Degrees).unwrap().elements;
        assert_relative_eq!(back.i, 45.0, epsilon = 1e-9);
        assert_relative_eq!(back.ta, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_elements_from_known_state() {
        // Curtis, Orbital Mechanics for Engineering Students, example 4.3
        let sv = StateVector::from_array([-6045.0, -3490.0, 2500.0, -3.457, 6.618, 2.533]);
        let set = coe_from_sv(&sv, MU, AngleUnit::Degrees).unwrap();
        let coe = set.elements;
        assert_relative_eq!(coe.a, 8788.0, epsilon = 2.0);
        assert_relative_eq!(coe.e, 0.1712, epsilon = 1e-3);
        assert_relative_eq!(coe.i, 153.2, epsilon = 0.1);
        assert_relative_eq!(coe.raan, 255.3, epsilon = 0.1);
        assert_relative_eq!(coe.aop, 20.07, epsilon = 0.05);
        assert_relative_eq!(coe.ta, 28.45, epsilon = 0.05);
        assert_relative_eq!(sv.angular_momentum().norm(), 58310.0, epsilon = 5.0);
    }

    #[test]
    fn test_hyperbolic_state_from_elements() {
        // Curtis example 4.7: h = 80000 km²/s, e = 1.4
        let p = 80000.0_f64.powi(2) / MU;
        let a = p / (1.0 - 1.4_f64.powi(2));
        let coe = ClassicalElements::new(a, 1.4, 30.0, 40.0, 60.0, 30.0);
        let sv = sv_from_coe(&coe, MU, AngleUnit::Degrees).unwrap();
        assert_relative_eq!(sv.r, Vector3::new(-4040.0, 4815.0, 3629.0), epsilon = 1.0);
        assert_relative_eq!(sv.v, Vector3::new(-10.39, -4.772, 1.744), epsilon = 0.01);

        let back = coe_from_sv(&sv, MU, AngleUnit::Degrees).unwrap();
        assert!(back.elements.a < 0.0);
        assert_relative_eq!(back.elements.e, 1.4, epsilon = 1e-9);
        assert!(period_from_sv(&sv, MU).is_err());
    }

    #[test]
    fn test_circular_orbit_flags_fallbacks() {
        let coe = ClassicalElements::new(7000.0, 0.0, 0.5, 1.0, 0.0, 0.7);
        let sv = sv_from_coe(&coe, MU, AngleUnit::Radians).unwrap();
        let set = coe_from_sv(&sv, MU, AngleUnit::Radians).unwrap();

        assert!(set.degeneracy.circular);
        assert!(!set.degeneracy.equatorial);
        assert_eq!(set.elements.aop, 0.0);
        assert_eq!(set.elements.ta, 0.0);
        assert_eq!(set.aop(), None);
        assert_eq!(set.true_anomaly(), None);
        assert_relative_eq!(set.raan().unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(set.elements.a, 7000.0, max_relative = 1e-12);
    }

    #[test]
    fn test_equatorial_orbit_uses_longitude_of_periapsis() {
        let coe = ClassicalElements::new(9000.0, 0.2, 0.0, 0.0, 1.0, 2.0);
        let sv = sv_from_coe(&coe, MU, AngleUnit::Radians).unwrap();
        let set = coe_from_sv(&sv, MU, AngleUnit::Radians).unwrap();

        assert!(set.degeneracy.equatorial);
        assert!(!set.degeneracy.circular);
        assert_eq!(set.raan(), None);
        assert_eq!(set.elements.raan, 0.0);
        assert_relative_eq!(set.elements.aop, 1.0, epsilon = 1e-9);
        assert_relative_eq!(set.elements.ta, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_retrograde_equatorial_reconstructs_state() {
        let (s, c) = (30.0 * DEG2RAD).sin_cos();
        let sv = StateVector::from_array([8000.0 * c, 8000.0 * s, 0.0, 8.0 * s + 0.5 * c, -8.0 * c + 0.5 * s, 0.0]);
        let set = coe_from_sv(&sv, MU, AngleUnit::Radians).unwrap();
        assert!(set.degeneracy.equatorial);
        assert_relative_eq!(set.elements.i * RAD2DEG, 180.0, epsilon = 1e-9);

        let rebuilt = sv_from_coe(&set.elements, MU, AngleUnit::Radians).unwrap();
        assert_relative_eq!(rebuilt.r, sv.r, epsilon = 1e-6);
        assert_relative_eq!(rebuilt.v, sv.v, epsilon = 1e-9);
    }

    #[test]
    fn test_rectilinear_is_an_error() {
        let sv = StateVector::from_array([7000.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        match coe_from_sv(&sv, MU, AngleUnit::Radians) {
            Err(GeometryError::Rectilinear { h_mag, threshold, .. }) => {
                assert_eq!(h_mag, 0.0);
                assert_eq!(threshold, SMALL);
            }
            other => panic!("expected rectilinear error, got {other:?}"),
        }
    }

    #[test]
    fn test_threshold_override() {
        // A slightly eccentric orbit is treated as circular under a loose threshold.
        let coe = ClassicalElements::new(7000.0, 1e-6, 0.5, 1.0, 2.0, 0.7);
        let sv = sv_from_coe(&coe, MU, AngleUnit::Radians).unwrap();
        let strict = coe_from_sv(&sv, MU, AngleUnit::Radians).unwrap();
        let loose = coe_from_sv_with_threshold(&sv, MU, AngleUnit::Radians, 1e-4).unwrap();
        assert!(!strict.degeneracy.circular);
        assert!(loose.degeneracy.circular);
        assert_eq!(loose.threshold, 1e-4);
    }

    #[test]
    fn test_period_consistency() {
        let coe = ClassicalElements::new(7000.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let sv = sv_from_coe(&coe, MU, AngleUnit::Radians).unwrap();
        let expected = TAU * (7000.0_f64.powi(3) / MU).sqrt();
        assert_relative_eq!(period_from_sv(&sv, MU).unwrap(), expected, max_relative = 1e-9);
        assert_relative_eq!(coe.period(MU).unwrap(), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_open_orbit_has_no_period() {
        let v_esc = (2.0 * MU / 7000.0).sqrt();
        let sv = StateVector::from_array([7000.0, 0.0, 0.0, 0.0, v_esc * 1.01, 0.0]);
        assert!(matches!(period_from_sv(&sv, MU), Err(GeometryError::OpenOrbit { .. })));
    }

    #[test]
    fn test_escape_speed_has_no_semi_major_axis() {
        let v_esc = (2.0 * MU / 7000.0).sqrt();
        let (s, c) = 0.3_f64.sin_cos();
        let sv = StateVector::from_array([7000.0, 0.0, 0.0, 0.0, v_esc * c, v_esc * s]);
        let set = coe_from_sv(&sv, MU, AngleUnit::Radians).unwrap();
        assert!(set.degeneracy.parabolic);
        assert_eq!(set.elements.a, f64::INFINITY);
        assert_eq!(set.semi_major_axis(), None);
        assert_relative_eq!(set.elements.e, 1.0, epsilon = 1e-9);
        assert_relative_eq!(set.elements.i, 0.3, epsilon = 1e-12);
        assert!(set.true_anomaly().is_some());
    }

    #[test]
    fn test_degenerate_conic_rejected() {
        let parabola = ClassicalElements::new(f64::INFINITY, 1.0, 0.1, 0.0, 0.0, 0.0);
        assert!(matches!(
            sv_from_coe(&parabola, MU, AngleUnit::Radians),
            Err(GeometryError::DegenerateConic { .. })
        ));
        let beyond = ClassicalElements::new(-10000.0, 2.0, 0.1, 0.0, 0.0, 3.0);
        assert!(matches!(
            sv_from_coe(&beyond, MU, AngleUnit::Radians),
            Err(GeometryError::BeyondAsymptote { .. })
        ));
    }

    #[test]
    fn test_normalize_angle() {
        assert_relative_eq!(normalize_angle(-0.5), TAU - 0.5);
        assert_relative_eq!(normalize_angle(TAU + 0.25), 0.25, epsilon = 1e-12);
        assert_eq!(normalize_angle(0.0), 0.0);
    }
}
