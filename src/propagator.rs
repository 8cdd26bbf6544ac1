//! Trajectory propagation and derived products.
//!
//! A [`Propagator`] is built from a [`ScenarioConfig`], validated up front,
//! and integrated at most once:
//!
//! ```text
//! Configured ──propagate()──▶ Integrating ──▶ Complete
//!                                         └──▶ Failed
//! ```
//!
//! The resulting [`Trajectory`] is immutable. Its element history and
//! ground track are computed on first request and cached on the trajectory
//! itself, so they can never outlive or mix with another propagation.

use std::cell::OnceCell;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bodies::CentralBody;
use crate::config::ScenarioConfig;
use crate::elements::{coe_from_sv, ElementSet};
use crate::error::{Error, GeometryError, IntegrationError, Result};
use crate::groundtrack::{cart2lat, GroundTrackPoint, SiderealReference};
use crate::integrator::{Integrator, Solution};
use crate::perturbations::ForceModel;
use crate::rotation::AngleUnit;
use crate::state::StateVector;

// ── Lifecycle ──

/// Lifecycle of a [`Propagator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Configured,
    Integrating,
    Complete,
    Failed,
}

// ── Trajectory ──

/// Time-ordered states of one propagation.
#[derive(Debug)]
pub struct Trajectory {
    times: Vec<f64>,
    states: Vec<StateVector>,
    mu: f64,
    radius: f64,
    output_unit: AngleUnit,
    reference: SiderealReference,
    coes: OnceCell<Result<Vec<ElementSet>, GeometryError>>,
    ground_track: OnceCell<Result<Vec<GroundTrackPoint>>>,
}

impl Trajectory {
    fn new(
        solution: Solution,
        body: &CentralBody,
        output_unit: AngleUnit,
        reference: SiderealReference,
    ) -> Self {
        Trajectory {
            times: solution.times,
            states: solution.states.into_iter().map(StateVector::from_array).collect(),
            mu: body.mu,
            radius: body.radius,
            output_unit,
            reference,
            coes: OnceCell::new(),
            ground_track: OnceCell::new(),
        }
    }

    /// Sample times (s), strictly increasing from 0.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[StateVector] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// States as `[x, y, z, vx, vy, vz]` rows.
    pub fn state_rows(&self) -> Vec<[f64; 6]> {
        self.states.iter().map(StateVector::to_array).collect()
    }

    pub fn final_state(&self) -> Option<&StateVector> {
        self.states.last()
    }

    /// Height above the body's mean radius at each sample (km).
    pub fn altitudes(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.r_mag() - self.radius).collect()
    }

    /// Osculating elements at each sample, angles in the scenario's output unit.
    pub fn coe_history(&self) -> Result<&[ElementSet], GeometryError> {
        self.coes
            .get_or_init(|| {
                let history = self
                    .states
                    .iter()
                    .map(|s| coe_from_sv(s, self.mu, self.output_unit))
                    .collect::<Result<Vec<_>, _>>();
                if let Ok(sets) = &history {
                    let degenerate = sets.iter().filter(|s| s.degeneracy.any()).count();
                    if degenerate > 0 {
                        log::warn!(
                            "{} of {} samples have undefined angles; fallback values used",
                            degenerate,
                            sets.len()
                        );
                    }
                }
                history
            })
            .as_deref()
            .map_err(Clone::clone)
    }

    /// Sub-satellite point at each sample. Samples with an ambiguous right
    /// ascension have no longitude.
    pub fn ground_track(&self) -> Result<&[GroundTrackPoint]> {
        self.ground_track
            .get_or_init(|| {
                let positions: Vec<_> = self.states.iter().map(|s| s.r).collect();
                let track = cart2lat(&positions, &self.times, &self.reference);
                if let Ok(points) = &track {
                    let undefined = points.iter().filter(|p| p.lon.is_none()).count();
                    if undefined > 0 {
                        log::warn!(
                            "{} of {} ground-track samples have no defined longitude",
                            undefined,
                            points.len()
                        );
                    }
                }
                track
            })
            .as_deref()
            .map_err(Clone::clone)
    }
}

// ── Propagator ──

/// Propagates one scenario.
#[derive(Debug)]
pub struct Propagator {
    config: ScenarioConfig,
    body: CentralBody,
    initial: StateVector,
    span: f64,
    forces: ForceModel,
    integrator: Integrator,
    status: Status,
    trajectory: Option<Trajectory>,
    failure: Option<IntegrationError>,
}

impl Propagator {
    /// Validate `config` and prepare a propagation without running it.
    pub fn configure(config: ScenarioConfig) -> Result<Self> {
        let body = config.body()?;
        config.integrator.validate()?;
        let perturbations = config.perturbations.perturbations()?;
        let forces = ForceModel::new(&body, &perturbations)?;
        let initial = config.initial_state(body.mu)?;
        let span = config.span.resolve(&initial, body.mu)?;

        log::debug!(
            "Configured {} propagation around {} for {:.3} s with forces {:?}",
            config.integrator.method,
            body.name,
            span,
            forces.perturbation_names()
        );

        Ok(Propagator {
            integrator: Integrator::new(config.integrator),
            config,
            body,
            initial,
            span,
            forces,
            status: Status::Configured,
            trajectory: None,
            failure: None,
        })
    }

    /// Configure, then propagate unless the scenario says otherwise.
    pub fn new(config: ScenarioConfig) -> Result<Self> {
        let mut propagator = Propagator::configure(config)?;
        if propagator.config.propagate {
            propagator.propagate()?;
        }
        Ok(propagator)
    }

    /// Integrate the scenario. Runs at most once; a failed run reports the
    /// same error on every later call.
    pub fn propagate(&mut self) -> Result<&Trajectory> {
        if let Some(err) = &self.failure {
            return Err(err.clone().into());
        }
        if self.trajectory.is_some() {
            return Err(Error::AlreadyPropagated);
        }

        self.status = Status::Integrating;
        log::info!(
            "Propagating around {} for {:.3} s ({})",
            self.body.name,
            self.span,
            self.config.integrator.method
        );

        let forces = &self.forces;
        let result = self
            .integrator
            .integrate(|t, y| forces.derivatives(t, y), self.span, self.initial.to_array());

        match result {
            Ok(solution) => {
                log::info!(
                    "Propagation complete: {} samples, {} rejected steps, {} force evaluations",
                    solution.times.len(),
                    solution.rejected,
                    solution.evaluations
                );
                let trajectory = Trajectory::new(
                    solution,
                    &self.body,
                    self.config.output_unit,
                    self.config.sidereal_reference(),
                );
                self.status = Status::Complete;
                let trajectory: &Trajectory = self.trajectory.insert(trajectory);
                Ok(trajectory)
            }
            Err(err) => {
                log::error!("Propagation around {} failed: {}", self.body.name, err);
                self.status = Status::Failed;
                self.failure = Some(err.clone());
                Err(err.into())
            }
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Integration error of a failed run.
    pub fn failure(&self) -> Option<&IntegrationError> {
        self.failure.as_ref()
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn body(&self) -> &CentralBody {
        &self.body
    }

    pub fn initial_state(&self) -> &StateVector {
        &self.initial
    }

    /// Propagation span (s).
    pub fn span(&self) -> f64 {
        self.span
    }

    pub fn force_model(&self) -> &ForceModel {
        &self.forces
    }

    pub fn trajectory(&self) -> Result<&Trajectory> {
        self.trajectory
            .as_ref()
            .ok_or(Error::NotPropagated(self.status))
    }

    pub fn times(&self) -> Result<&[f64]> {
        Ok(self.trajectory()?.times())
    }

    pub fn states(&self) -> Result<&[StateVector]> {
        Ok(self.trajectory()?.states())
    }

    pub fn state_rows(&self) -> Result<Vec<[f64; 6]>> {
        Ok(self.trajectory()?.state_rows())
    }

    pub fn altitudes(&self) -> Result<Vec<f64>> {
        Ok(self.trajectory()?.altitudes())
    }

    pub fn coe_history(&self) -> Result<&[ElementSet]> {
        Ok(self.trajectory()?.coe_history()?)
    }

    pub fn ground_track(&self) -> Result<&[GroundTrackPoint]> {
        self.trajectory()?.ground_track()
    }
}

// ── Batch propagation ──

/// Propagate independent scenarios in parallel.
///
/// Each scenario is propagated regardless of its `propagate` flag; results
/// keep the input order.
pub fn propagate_batch(configs: Vec<ScenarioConfig>) -> Vec<Result<Propagator>> {
    configs
        .into_par_iter()
        .map(|config| -> Result<Propagator> {
            let mut propagator = Propagator::configure(config)?;
            propagator.propagate()?;
            Ok(propagator)
        })
        .collect()
}
