//! Error taxonomy.
//!
//! Configuration problems, degenerate geometry and integrator failures are
//! kept as separate enums so callers can match on the concern they care
//! about; [`Error`] wraps all three for the propagator API.

use thiserror::Error;

use crate::propagator::Status;

/// Invalid or contradictory scenario configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("no initial condition: supply either orbital elements or a state vector")]
    MissingInitialCondition,

    #[error("both orbital elements and a state vector were supplied")]
    ConflictingInitialCondition,

    #[error("unknown central body '{0}'")]
    UnknownBody(String),

    #[error("invalid central body '{name}': mu = {mu}, radius = {radius} (both must be positive)")]
    InvalidBody { name: String, mu: f64, radius: f64 },

    #[error("unknown perturbation '{0}'")]
    UnknownPerturbation(String),

    #[error("perturbation '{0}' is listed more than once")]
    DuplicatePerturbation(String),

    #[error("perturbation '{0}' is enabled but not implemented")]
    PerturbationNotImplemented(&'static str),

    #[error("perturbation '{perturbation}' needs the central body's {parameter}, which '{body}' does not define")]
    MissingBodyParameter {
        perturbation: &'static str,
        parameter: &'static str,
        body: String,
    },

    #[error("perturbation '{perturbation}' is not supported around '{body}'")]
    UnsupportedBody {
        perturbation: &'static str,
        body: String,
    },

    #[error("invalid ballistic coefficient {0} kg/m² (must be finite and positive)")]
    InvalidBallisticCoefficient(f64),

    #[error("unknown integrator method '{0}'")]
    UnknownIntegrator(String),

    #[error("invalid tolerances: atol = {atol}, rtol = {rtol} (must be finite and positive)")]
    InvalidTolerance { atol: f64, rtol: f64 },

    #[error("invalid {name} {value} s (must be finite and positive)")]
    InvalidStep { name: &'static str, value: f64 },

    #[error("invalid span {0} s (must be finite and positive)")]
    InvalidSpan(f64),

    #[error("invalid state vector {0:?}: position must be non-zero and all components finite")]
    InvalidState([f64; 6]),

    #[error("{positions} positions but {times} times")]
    LengthMismatch { positions: usize, times: usize },

    #[error("invalid reference epoch '{0}'")]
    InvalidEpoch(String),

    #[error("failed to parse scenario: {0}")]
    Parse(String),
}

/// Orbit geometry for which a requested quantity is undefined.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("rectilinear orbit: |h| = {h_mag:e} is below threshold {threshold:e} (r = {r:?}, v = {v:?})")]
    Rectilinear {
        h_mag: f64,
        threshold: f64,
        r: [f64; 3],
        v: [f64; 3],
    },

    #[error("degenerate conic: a(1 - e²) = {semi_latus_rectum} for a = {a}, e = {e}")]
    DegenerateConic {
        a: f64,
        e: f64,
        semi_latus_rectum: f64,
    },

    #[error("true anomaly {ta} rad lies beyond the asymptote of a conic with e = {e}")]
    BeyondAsymptote { e: f64, ta: f64 },

    #[error("open orbit has no period: specific energy {energy} km²/s² is not negative (r = {r:?}, v = {v:?})")]
    OpenOrbit {
        energy: f64,
        r: [f64; 3],
        v: [f64; 3],
    },

    #[error("right ascension quadrant is ambiguous for r = {r:?} (y component is exactly zero)")]
    AmbiguousRightAscension { r: [f64; 3] },
}

/// Numerical integration could not complete the requested span.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrationError {
    #[error("step size {step:e} s fell below the minimum {min_step:e} s at t = {t} s")]
    StepSizeUnderflow { t: f64, step: f64, min_step: f64 },

    #[error("exceeded {max_steps} steps at t = {t} s of {t_end} s")]
    MaxStepsExceeded { t: f64, t_end: f64, max_steps: usize },

    #[error("non-finite derivative at t = {t} s for state {state:?}")]
    NonFiniteDerivative { t: f64, state: [f64; 6] },
}

/// Any failure surfaced by the crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error("propagator is {0:?}; derived products need a completed trajectory")]
    NotPropagated(Status),

    #[error("propagator has already produced a trajectory")]
    AlreadyPropagated,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
