//! Force models: central gravity plus optional perturbing accelerations.
//!
//! Perturbations form a closed set selected by name in the scenario. A
//! [`ForceModel`] is assembled once per propagation from the central body
//! and the enabled perturbations, and is then a pure function of position
//! and velocity.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::bodies::CentralBody;
use crate::constants::OMEGA_EARTH;
use crate::error::ConfigError;
use crate::integrator::State6;

/// Ballistic coefficient used when a scenario enables drag without one (kg/m²).
pub const DEFAULT_BALLISTIC_COEFFICIENT: f64 = 50.0;

/// Upper edge of the atmosphere model (km).
const ATMOSPHERE_CEILING: f64 = 1000.0;

/// A perturbing acceleration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Perturbation {
    /// J2 zonal harmonic of the central body.
    Oblateness,
    /// Drag through an exponential atmosphere co-rotating with Earth.
    AtmosphericDrag {
        /// m / (C_D · A) in kg/m²
        ballistic_coefficient: f64,
    },
    SolarRadiationPressure,
    ThirdBody,
}

impl Perturbation {
    /// Names accepted in [`PerturbationConfig::enabled`].
    pub const NAMES: [&'static str; 4] = [
        "oblateness",
        "atmospheric_drag",
        "solar_radiation_pressure",
        "third_body",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Perturbation::Oblateness => "oblateness",
            Perturbation::AtmosphericDrag { .. } => "atmospheric_drag",
            Perturbation::SolarRadiationPressure => "solar_radiation_pressure",
            Perturbation::ThirdBody => "third_body",
        }
    }

    pub fn is_implemented(&self) -> bool {
        matches!(
            self,
            Perturbation::Oblateness | Perturbation::AtmosphericDrag { .. }
        )
    }
}

// ── Configuration ──

/// Perturbation switches as they appear in a scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerturbationConfig {
    /// Perturbation name → enabled
    pub enabled: BTreeMap<String, bool>,
    /// Ballistic coefficient for drag (kg/m²)
    pub ballistic_coefficient: f64,
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        PerturbationConfig {
            enabled: BTreeMap::new(),
            ballistic_coefficient: DEFAULT_BALLISTIC_COEFFICIENT,
        }
    }
}

impl PerturbationConfig {
    /// Two-body motion only.
    pub fn none() -> Self {
        PerturbationConfig::default()
    }

    pub fn enable(mut self, name: &str) -> Self {
        self.enabled.insert(name.to_string(), true);
        self
    }

    pub fn with_ballistic_coefficient(mut self, bc: f64) -> Self {
        self.ballistic_coefficient = bc;
        self
    }

    /// Resolve the enabled entries into perturbations.
    ///
    /// Every name must be known, even when disabled. Enabling a perturbation
    /// that has no force model is an error rather than a silent no-op. Names
    /// are matched after trimming and lowercasing, and each may appear once.
    pub fn perturbations(&self) -> Result<Vec<Perturbation>, ConfigError> {
        let mut resolved = Vec::new();
        let mut seen = BTreeSet::new();
        for (name, &on) in &self.enabled {
            let normalized = name.trim().to_ascii_lowercase();
            let perturbation = match normalized.as_str() {
                "oblateness" => Perturbation::Oblateness,
                "atmospheric_drag" => Perturbation::AtmosphericDrag {
                    ballistic_coefficient: self.ballistic_coefficient,
                },
                "solar_radiation_pressure" => Perturbation::SolarRadiationPressure,
                "third_body" => Perturbation::ThirdBody,
                _ => return Err(ConfigError::UnknownPerturbation(name.clone())),
            };
            if !seen.insert(perturbation.name()) {
                return Err(ConfigError::DuplicatePerturbation(normalized));
            }
            if !on {
                continue;
            }
            if !perturbation.is_implemented() {
                return Err(ConfigError::PerturbationNotImplemented(perturbation.name()));
            }
            resolved.push(perturbation);
        }
        Ok(resolved)
    }
}

// ── Force model ──

/// A perturbation bound to the constants it needs.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Term {
    Oblateness { j2: f64 },
    Drag { ballistic_coefficient: f64 },
}

impl Term {
    fn name(&self) -> &'static str {
        match self {
            Term::Oblateness { .. } => "oblateness",
            Term::Drag { .. } => "atmospheric_drag",
        }
    }
}

/// Equations of motion for one propagation.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceModel {
    mu: f64,
    radius: f64,
    terms: Vec<Term>,
}

impl ForceModel {
    /// Keplerian motion about a point mass.
    pub fn two_body(mu: f64, radius: f64) -> Self {
        ForceModel {
            mu,
            radius,
            terms: Vec::new(),
        }
    }

    /// Assemble the force model, checking each perturbation against the body.
    pub fn new(body: &CentralBody, perturbations: &[Perturbation]) -> Result<Self, ConfigError> {
        let mut model = ForceModel::two_body(body.mu, body.radius);
        for p in perturbations {
            let term = match *p {
                Perturbation::Oblateness => {
                    let j2 = body.j2.ok_or_else(|| ConfigError::MissingBodyParameter {
                        perturbation: p.name(),
                        parameter: "J2",
                        body: body.name.clone(),
                    })?;
                    Term::Oblateness { j2 }
                }
                Perturbation::AtmosphericDrag { ballistic_coefficient } => {
                    if !body.is_earth() {
                        return Err(ConfigError::UnsupportedBody {
                            perturbation: p.name(),
                            body: body.name.clone(),
                        });
                    }
                    if !(ballistic_coefficient.is_finite() && ballistic_coefficient > 0.0) {
                        return Err(ConfigError::InvalidBallisticCoefficient(ballistic_coefficient));
                    }
                    Term::Drag { ballistic_coefficient }
                }
                Perturbation::SolarRadiationPressure | Perturbation::ThirdBody => {
                    return Err(ConfigError::PerturbationNotImplemented(p.name()));
                }
            };
            if model.terms.iter().any(|t| t.name() == term.name()) {
                return Err(ConfigError::DuplicatePerturbation(term.name().to_string()));
            }
            log::debug!("Adding force model: {} around {}", term.name(), body.name);
            model.terms.push(term);
        }
        Ok(model)
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// Names of the perturbations in this model, in evaluation order.
    pub fn perturbation_names(&self) -> Vec<&'static str> {
        self.terms.iter().map(Term::name).collect()
    }

    /// Total acceleration (km/s²).
    pub fn acceleration(&self, r: &Vector3<f64>, v: &Vector3<f64>) -> Vector3<f64> {
        self.terms
            .iter()
            .fold(two_body_acceleration(self.mu, r), |acc, term| {
                acc + self.term_acceleration(term, r, v)
            })
    }

    /// Acceleration of each contributor, central gravity first.
    pub fn breakdown(&self, r: &Vector3<f64>, v: &Vector3<f64>) -> Vec<(&'static str, Vector3<f64>)> {
        std::iter::once(("two_body", two_body_acceleration(self.mu, r)))
            .chain(
                self.terms
                    .iter()
                    .map(|term| (term.name(), self.term_acceleration(term, r, v))),
            )
            .collect()
    }

    /// dy/dt for `y = [x, y, z, vx, vy, vz]`. The model is autonomous, so `t` is unused.
    pub fn derivatives(&self, _t: f64, y: &State6) -> State6 {
        let r = Vector3::new(y[0], y[1], y[2]);
        let v = Vector3::new(y[3], y[4], y[5]);
        let a = self.acceleration(&r, &v);
        [y[3], y[4], y[5], a.x, a.y, a.z]
    }

    fn term_acceleration(&self, term: &Term, r: &Vector3<f64>, v: &Vector3<f64>) -> Vector3<f64> {
        match *term {
            Term::Oblateness { j2 } => j2_acceleration(self.mu, self.radius, j2, r),
            Term::Drag { ballistic_coefficient } => {
                drag_acceleration(r, v, self.radius, ballistic_coefficient)
            }
        }
    }
}

// ── Accelerations ──

/// Point-mass gravity, -μ r / |r|³.
pub fn two_body_acceleration(mu: f64, r: &Vector3<f64>) -> Vector3<f64> {
    let r_mag = r.norm();
    -mu / (r_mag * r_mag * r_mag) * r
}

/// J2 zonal-harmonic acceleration.
pub fn j2_acceleration(mu: f64, radius: f64, j2: f64, r: &Vector3<f64>) -> Vector3<f64> {
    let r_mag = r.norm();
    let z2_r2 = (r.z / r_mag).powi(2);
    let factor = -1.5 * j2 * mu * radius.powi(2) / r_mag.powi(5);
    Vector3::new(
        factor * r.x * (1.0 - 5.0 * z2_r2),
        factor * r.y * (1.0 - 5.0 * z2_r2),
        factor * r.z * (3.0 - 5.0 * z2_r2),
    )
}

/// Drag from the exponential atmosphere, with the atmosphere co-rotating
/// with Earth. Zero at or below the surface and above the model ceiling.
pub fn drag_acceleration(
    r: &Vector3<f64>,
    v: &Vector3<f64>,
    radius: f64,
    ballistic_coefficient: f64,
) -> Vector3<f64> {
    let alt = r.norm() - radius;
    if alt <= 0.0 || alt >= ATMOSPHERE_CEILING {
        return Vector3::zeros();
    }

    let omega = Vector3::new(0.0, 0.0, OMEGA_EARTH);
    let v_rel = v - omega.cross(r);
    let v_rel_mag = v_rel.norm();
    if v_rel_mag <= 1e-10 {
        return Vector3::zeros();
    }

    // ρ in kg/m³ and BC in kg/m², so work in m/s and convert back to km/s²
    let v_ms = v_rel_mag * 1000.0;
    let drag_accel = -0.5 * exponential_atmosphere(alt) * v_ms * v_ms / ballistic_coefficient;
    drag_accel / 1000.0 * v_rel / v_rel_mag
}

// ── Atmosphere ──

/// Piecewise exponential atmosphere.
///
/// Returns density in kg/m³ at a given altitude (km); zero at and above
/// 1000 km. Adequate for decay trends, not for precision reentry.
pub fn exponential_atmosphere(alt_km: f64) -> f64 {
    // (base altitude km, base density kg/m³, scale height km), Vallado Table 8-4
    const TABLE: &[(f64, f64, f64)] = &[
        (0.0, 1.225, 7.249),
        (25.0, 3.899e-2, 6.349),
        (30.0, 1.774e-2, 6.682),
        (40.0, 3.972e-3, 7.554),
        (50.0, 1.057e-3, 8.382),
        (60.0, 3.206e-4, 7.714),
        (70.0, 8.770e-5, 6.549),
        (80.0, 1.905e-5, 5.799),
        (90.0, 3.396e-6, 5.382),
        (100.0, 5.297e-7, 5.877),
        (110.0, 9.661e-8, 7.263),
        (120.0, 2.438e-8, 9.473),
        (130.0, 8.484e-9, 12.636),
        (140.0, 3.845e-9, 16.149),
        (150.0, 2.070e-9, 22.523),
        (180.0, 5.464e-10, 29.740),
        (200.0, 2.789e-10, 37.105),
        (250.0, 7.248e-11, 45.546),
        (300.0, 2.418e-11, 53.628),
        (350.0, 9.518e-12, 53.298),
        (400.0, 3.725e-12, 58.515),
        (450.0, 1.585e-12, 60.828),
        (500.0, 6.967e-13, 63.822),
        (600.0, 1.454e-13, 71.835),
        (700.0, 3.614e-14, 88.667),
        (800.0, 1.170e-14, 124.64),
        (900.0, 5.245e-15, 181.05),
        (1000.0, 3.019e-15, 268.00),
    ];

    if alt_km <= 0.0 {
        return TABLE[0].1;
    }
    if alt_km >= ATMOSPHERE_CEILING {
        return 0.0;
    }

    let idx = TABLE.partition_point(|&(h, _, _)| h <= alt_km) - 1;
    let (h0, rho0, scale_h) = TABLE[idx];
    rho0 * (-(alt_km - h0) / scale_h).exp()
}
