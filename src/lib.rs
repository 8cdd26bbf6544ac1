//! # orbitrack
//!
//! Spacecraft trajectory propagation around a central body.
//! Provides classical-element and state-vector conversion, numerical
//! propagation with optional J2 and drag perturbations, and ground tracks
//! over a rotating Earth.
//!
//! ```no_run
//! use orbitrack::{AngleUnit, ClassicalElements, Propagator, ScenarioConfig};
//!
//! let config = ScenarioConfig::from_elements(
//!     ClassicalElements::new(7136.63, 0.0, 98.43, 0.0, 0.0, 0.0),
//!     AngleUnit::Degrees,
//! );
//! let propagator = Propagator::new(config)?;
//! let track = propagator.ground_track()?;
//! # Ok::<(), orbitrack::Error>(())
//! ```

pub mod bodies;
pub mod config;
pub mod constants;
pub mod elements;
pub mod error;
pub mod groundtrack;
pub mod integrator;
pub mod perturbations;
pub mod propagator;
pub mod rotation;
pub mod state;

pub use bodies::CentralBody;
pub use config::{ScenarioConfig, Span};
pub use elements::{coe_from_sv, period_from_sv, sv_from_coe, ClassicalElements, ElementSet};
pub use error::{ConfigError, Error, GeometryError, IntegrationError, Result};
pub use groundtrack::{cart2lat, ra_and_dec_from_r, GroundTrackPoint, SiderealReference};
pub use perturbations::{Perturbation, PerturbationConfig};
pub use propagator::{propagate_batch, Propagator, Status, Trajectory};
pub use rotation::AngleUnit;
pub use state::StateVector;

#[cfg(feature = "python")]
mod pybridge;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn orbitrack(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pybridge::register(m)?;
    Ok(())
}
