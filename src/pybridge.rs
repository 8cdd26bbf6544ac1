//! Python bindings via PyO3 for orbitrack.
//!
//! Trajectories cross the boundary as plain lists so the Python plotting
//! scripts can hand them straight to numpy and matplotlib.
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::bodies::CentralBody;
use crate::config::{ScenarioConfig, Span};
use crate::elements::{self, ClassicalElements};
use crate::error::Error;
use crate::groundtrack::split_at_antimeridian;
use crate::integrator::IntegratorConfig;
use crate::perturbations::PerturbationConfig;
use crate::propagator::Propagator;
use crate::rotation::AngleUnit;
use crate::state::StateVector;

fn to_py_err(err: Error) -> PyErr {
    match err {
        Error::Integration(_) | Error::NotPropagated(_) | Error::AlreadyPropagated => {
            PyRuntimeError::new_err(err.to_string())
        }
        Error::Config(_) | Error::Geometry(_) => PyValueError::new_err(err.to_string()),
    }
}

fn unit(degrees: bool) -> AngleUnit {
    if degrees {
        AngleUnit::Degrees
    } else {
        AngleUnit::Radians
    }
}

fn state_from_list(state: &[f64]) -> PyResult<StateVector> {
    let y: [f64; 6] = state.try_into().map_err(|_| {
        PyValueError::new_err("State vector must have 6 elements [x,y,z,vx,vy,vz]")
    })?;
    Ok(StateVector::from_array(y))
}

fn perturbations(oblateness: bool, drag: bool, ballistic_coefficient: f64) -> PerturbationConfig {
    let mut config = PerturbationConfig::none().with_ballistic_coefficient(ballistic_coefficient);
    if oblateness {
        config = config.enable("oblateness");
    }
    if drag {
        config = config.enable("atmospheric_drag");
    }
    config
}

// Propagator
#[pyclass(name = "Propagator")]
pub struct PyPropagator {
    inner: Propagator,
}

#[pymethods]
impl PyPropagator {
    /// Build from a JSON scenario.
    #[new]
    fn new(scenario: &str) -> PyResult<Self> {
        let config = ScenarioConfig::from_json(scenario).map_err(|e| to_py_err(e.into()))?;
        let inner = Propagator::new(config).map_err(to_py_err)?;
        Ok(PyPropagator { inner })
    }

    /// Orbit from elements in degrees, propagated for `periods` orbits.
    #[staticmethod]
    #[pyo3(signature = (a, e, i_deg, raan_deg, aop_deg, ta_deg, periods=1.0, body="earth", oblateness=false, drag=false, ballistic_coefficient=50.0, tol=1e-6))]
    #[allow(clippy::too_many_arguments)]
    fn from_elements(
        a: f64,
        e: f64,
        i_deg: f64,
        raan_deg: f64,
        aop_deg: f64,
        ta_deg: f64,
        periods: f64,
        body: &str,
        oblateness: bool,
        drag: bool,
        ballistic_coefficient: f64,
        tol: f64,
    ) -> PyResult<Self> {
        let config = ScenarioConfig::from_elements(
            ClassicalElements::new(a, e, i_deg, raan_deg, aop_deg, ta_deg),
            AngleUnit::Degrees,
        )
        .with_body(body)
        .with_span(Span::Periods(periods))
        .with_perturbations(perturbations(oblateness, drag, ballistic_coefficient))
        .with_integrator(IntegratorConfig::default().with_tolerance(tol, tol));
        let inner = Propagator::new(config).map_err(to_py_err)?;
        Ok(PyPropagator { inner })
    }

    /// State vector [x,y,z,vx,vy,vz] (km, km/s) propagated for `seconds`.
    #[staticmethod]
    #[pyo3(signature = (state, seconds, body="earth", oblateness=false, drag=false, ballistic_coefficient=50.0, tol=1e-6))]
    fn from_state(
        state: Vec<f64>,
        seconds: f64,
        body: &str,
        oblateness: bool,
        drag: bool,
        ballistic_coefficient: f64,
        tol: f64,
    ) -> PyResult<Self> {
        let config = ScenarioConfig::from_state(state_from_list(&state)?)
            .with_body(body)
            .with_span(Span::Seconds(seconds))
            .with_perturbations(perturbations(oblateness, drag, ballistic_coefficient))
            .with_integrator(IntegratorConfig::default().with_tolerance(tol, tol));
        let inner = Propagator::new(config).map_err(to_py_err)?;
        Ok(PyPropagator { inner })
    }

    fn propagate(&mut self) -> PyResult<()> {
        self.inner.propagate().map(|_| ()).map_err(to_py_err)
    }

    #[getter]
    fn status(&self) -> String {
        format!("{:?}", self.inner.status())
    }

    #[getter]
    fn span(&self) -> f64 {
        self.inner.span()
    }

    fn times(&self) -> PyResult<Vec<f64>> {
        self.inner.times().map(<[f64]>::to_vec).map_err(to_py_err)
    }

    /// Rows of [x, y, z, vx, vy, vz].
    fn states(&self) -> PyResult<Vec<[f64; 6]>> {
        self.inner.state_rows().map_err(to_py_err)
    }

    /// Rows of [a, e, i, raan, aop, ta], angles in degrees.
    fn coes(&self) -> PyResult<Vec<[f64; 6]>> {
        let history = self.inner.coe_history().map_err(to_py_err)?;
        Ok(history
            .iter()
            .map(|set| set.elements.convert(set.unit, AngleUnit::Degrees).to_array())
            .collect())
    }

    fn altitudes(&self) -> PyResult<Vec<f64>> {
        self.inner.altitudes().map_err(to_py_err)
    }

    /// (lon, lat) pairs in degrees; lon is NaN where it is undefined.
    fn ground_track(&self) -> PyResult<Vec<(f64, f64)>> {
        let track = self.inner.ground_track().map_err(to_py_err)?;
        Ok(track.iter().map(|p| (p.lon_or_nan(), p.lat)).collect())
    }

    /// Ground track split where it crosses ±180°, one list per drawable line.
    fn ground_track_segments(&self) -> PyResult<Vec<Vec<(f64, f64)>>> {
        let track = self.inner.ground_track().map_err(to_py_err)?;
        Ok(split_at_antimeridian(track)
            .into_iter()
            .map(|seg| seg.iter().map(|p| (p.lon_or_nan(), p.lat)).collect())
            .collect())
    }

    fn __repr__(&self) -> String {
        format!(
            "Propagator(body={}, span={:.1} s, status={:?})",
            self.inner.body().name,
            self.inner.span(),
            self.inner.status()
        )
    }
}

// Free functions
#[pyfunction]
#[pyo3(signature = (state, mu, degrees=true))]
fn coe_from_sv(state: Vec<f64>, mu: f64, degrees: bool) -> PyResult<[f64; 6]> {
    let sv = state_from_list(&state)?;
    let set = elements::coe_from_sv(&sv, mu, unit(degrees)).map_err(|e| to_py_err(e.into()))?;
    Ok(set.elements.to_array())
}

#[pyfunction]
#[pyo3(signature = (coes, mu, degrees=true))]
fn sv_from_coe(coes: [f64; 6], mu: f64, degrees: bool) -> PyResult<[f64; 6]> {
    let [a, e, i, raan, aop, ta] = coes;
    let coe = ClassicalElements::new(a, e, i, raan, aop, ta);
    let sv = elements::sv_from_coe(&coe, mu, unit(degrees)).map_err(|e| to_py_err(e.into()))?;
    Ok(sv.to_array())
}

/// (mu km³/s², radius km) of a built-in body.
#[pyfunction]
fn body_constants(name: &str) -> PyResult<(f64, f64)> {
    let body = CentralBody::by_name(name).map_err(|e| to_py_err(e.into()))?;
    Ok((body.mu, body.radius))
}

// Module registration
pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyPropagator>()?;
    m.add_function(wrap_pyfunction!(coe_from_sv, m)?)?;
    m.add_function(wrap_pyfunction!(sv_from_coe, m)?)?;
    m.add_function(wrap_pyfunction!(body_constants, m)?)?;
    Ok(())
}
