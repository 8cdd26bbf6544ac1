//! Scenario configuration.
//!
//! A scenario names the central body, one initial condition (elements or a
//! state vector), how long to propagate, and the integrator and
//! perturbation settings. Every field has a default, so a JSON scenario only
//! needs the initial condition:
//!
//! ```json
//! {
//!   "elements": { "a": 7136.63, "e": 0.0, "i": 98.43, "raan": 0.0, "aop": 0.0, "ta": 0.0 },
//!   "elements_unit": "degrees",
//!   "span": { "periods": 1.0 },
//!   "perturbations": { "enabled": { "oblateness": true } }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bodies::CentralBody;
use crate::elements::{period_from_sv, sv_from_coe, ClassicalElements};
use crate::error::{ConfigError, Result};
use crate::groundtrack::{default_reference_epoch, SiderealReference};
use crate::integrator::IntegratorConfig;
use crate::perturbations::PerturbationConfig;
use crate::rotation::AngleUnit;
use crate::state::StateVector;

/// Central body given by table name or by explicit constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BodySpec {
    Name(String),
    Custom(CentralBody),
}

impl Default for BodySpec {
    fn default() -> Self {
        BodySpec::Name("earth".to_string())
    }
}

impl BodySpec {
    pub fn resolve(&self) -> Result<CentralBody, ConfigError> {
        match self {
            BodySpec::Name(name) => CentralBody::by_name(name),
            BodySpec::Custom(body) => {
                let mut checked = CentralBody::new(body.name.clone(), body.mu, body.radius)?;
                if let Some(j2) = body.j2 {
                    checked = checked.with_j2(j2);
                }
                if let Some(soi) = body.soi {
                    checked = checked.with_soi(soi);
                }
                Ok(checked)
            }
        }
    }
}

/// How long to propagate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Span {
    Seconds(f64),
    /// Multiples of the initial osculating period
    Periods(f64),
}

impl Default for Span {
    fn default() -> Self {
        Span::Periods(1.0)
    }
}

impl Span {
    /// Duration in seconds for an orbit starting at `state`.
    pub fn resolve(&self, state: &StateVector, mu: f64) -> Result<f64> {
        let seconds = match *self {
            Span::Seconds(s) => s,
            Span::Periods(n) => {
                if !(n.is_finite() && n > 0.0) {
                    return Err(ConfigError::InvalidSpan(n).into());
                }
                n * period_from_sv(state, mu)?
            }
        };
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(ConfigError::InvalidSpan(seconds).into());
        }
        Ok(seconds)
    }
}

/// Everything needed to set up one propagation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    pub central_body: BodySpec,
    /// Initial classical elements, angles in `elements_unit`
    pub elements: Option<ClassicalElements>,
    pub elements_unit: AngleUnit,
    /// Initial state vector (km, km/s)
    pub state: Option<StateVector>,
    pub span: Span,
    pub integrator: IntegratorConfig,
    /// Propagate as soon as the propagator is built
    pub propagate: bool,
    pub perturbations: PerturbationConfig,
    /// UTC instant of t = 0 for ground tracks; `None` aligns Greenwich with
    /// the inertial x axis at t = 0.
    pub reference_epoch: Option<DateTime<Utc>>,
    /// Angle unit of the derived element history
    pub output_unit: AngleUnit,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            central_body: BodySpec::default(),
            elements: None,
            elements_unit: AngleUnit::Radians,
            state: None,
            span: Span::default(),
            integrator: IntegratorConfig::default(),
            propagate: true,
            perturbations: PerturbationConfig::default(),
            reference_epoch: Some(default_reference_epoch()),
            output_unit: AngleUnit::Degrees,
        }
    }
}

impl ScenarioConfig {
    /// Scenario starting from classical elements with angles in `unit`.
    pub fn from_elements(elements: ClassicalElements, unit: AngleUnit) -> Self {
        ScenarioConfig {
            elements: Some(elements),
            elements_unit: unit,
            ..ScenarioConfig::default()
        }
    }

    pub fn from_state(state: StateVector) -> Self {
        ScenarioConfig {
            state: Some(state),
            ..ScenarioConfig::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn with_body(mut self, name: &str) -> Self {
        self.central_body = BodySpec::Name(name.to_string());
        self
    }

    pub fn with_custom_body(mut self, body: CentralBody) -> Self {
        self.central_body = BodySpec::Custom(body);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_integrator(mut self, integrator: IntegratorConfig) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn with_perturbations(mut self, perturbations: PerturbationConfig) -> Self {
        self.perturbations = perturbations;
        self
    }

    pub fn with_reference_epoch(mut self, epoch: Option<DateTime<Utc>>) -> Self {
        self.reference_epoch = epoch;
        self
    }

    pub fn with_output_unit(mut self, unit: AngleUnit) -> Self {
        self.output_unit = unit;
        self
    }

    /// Set whether construction also propagates.
    pub fn with_propagate(mut self, propagate: bool) -> Self {
        self.propagate = propagate;
        self
    }

    pub fn body(&self) -> Result<CentralBody, ConfigError> {
        self.central_body.resolve()
    }

    /// Initial state from whichever initial condition was given.
    pub fn initial_state(&self, mu: f64) -> Result<StateVector> {
        let state = match (&self.elements, &self.state) {
            (None, None) => return Err(ConfigError::MissingInitialCondition.into()),
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingInitialCondition.into()),
            (Some(coe), None) => sv_from_coe(coe, mu, self.elements_unit)?,
            (None, Some(state)) => *state,
        };
        state.validate()?;
        Ok(state)
    }

    pub fn sidereal_reference(&self) -> SiderealReference {
        self.reference_epoch
            .map_or_else(SiderealReference::aligned, SiderealReference::from_epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, GeometryError};
    use crate::integrator::Method;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn leo() -> ClassicalElements {
        ClassicalElements::new(7000.0, 0.01, 45.0, 10.0, 20.0, 30.0)
    }

    #[test]
    fn test_defaults() {
        let config = ScenarioConfig::default();
        assert_eq!(config.body().unwrap(), CentralBody::earth());
        assert_eq!(config.span, Span::Periods(1.0));
        assert_eq!(config.integrator.method, Method::DormandPrince45);
        assert_eq!(config.integrator.atol, 1e-6);
        assert_eq!(config.integrator.rtol, 1e-6);
        assert!(config.propagate);
        assert_eq!(config.elements_unit, AngleUnit::Radians);
        assert_eq!(config.output_unit, AngleUnit::Degrees);
        assert_eq!(config.sidereal_reference(), SiderealReference::default());
    }

    #[test]
    fn test_from_json() {
        let config = ScenarioConfig::from_json(
            r#"{
                "central_body": "Earth",
                "elements": { "a": 7136.63, "e": 0.0, "i": 98.43, "raan": 0.0, "aop": 0.0, "ta": 0.0 },
                "elements_unit": "degrees",
                "span": { "seconds": 3600.0 },
                "integrator": { "method": "RK4", "atol": 1e-9, "rtol": 1e-9 },
                "perturbations": { "enabled": { "oblateness": true }, "ballistic_coefficient": 80.0 },
                "reference_epoch": null
            }"#,
        )
        .unwrap();

        assert_eq!(config.elements_unit, AngleUnit::Degrees);
        assert_eq!(config.span, Span::Seconds(3600.0));
        assert_eq!(config.integrator.method, Method::Rk4);
        assert_eq!(config.integrator.max_steps, 1_000_000);
        assert_eq!(config.perturbations.ballistic_coefficient, 80.0);
        assert_eq!(config.sidereal_reference(), SiderealReference::aligned());

        let state = config.initial_state(config.body().unwrap().mu).unwrap();
        assert_relative_eq!(state.r_mag(), 7136.63, max_relative = 1e-12);

        let reparsed = ScenarioConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = ScenarioConfig::from_json(r#"{ "tspan": 1.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(msg) if msg.contains("tspan")));
    }

    #[test]
    fn test_custom_body() {
        let config = ScenarioConfig::from_json(
            r#"{ "central_body": { "name": "ceres", "mu": 62.6, "radius": 470.0 } }"#,
        )
        .unwrap();
        let body = config.body().unwrap();
        assert_eq!(body.name, "ceres");
        assert_eq!(body.j2, None);

        let oblate = ScenarioConfig::from_json(
            r#"{ "central_body": { "name": "vesta", "mu": 17.8, "radius": 262.7, "j2": 0.0317, "soi": 1.0e5 } }"#,
        )
        .unwrap();
        let body = oblate.body().unwrap();
        assert_eq!(body.j2, Some(0.0317));
        assert_eq!(body.soi, Some(1.0e5));

        let bad = ScenarioConfig::default().with_custom_body(CentralBody {
            name: "void".into(),
            mu: -1.0,
            radius: 1.0,
            j2: None,
            soi: None,
        });
        assert!(matches!(bad.body(), Err(ConfigError::InvalidBody { .. })));
    }

    #[test]
    fn test_initial_condition_must_be_unique() {
        let mu = CentralBody::earth().mu;
        assert_eq!(
            ScenarioConfig::default().initial_state(mu),
            Err(ConfigError::MissingInitialCondition.into())
        );

        let mut both = ScenarioConfig::from_elements(leo(), AngleUnit::Degrees);
        both.state = Some(StateVector::from_array([7000.0, 0.0, 0.0, 0.0, 7.5, 0.0]));
        assert_eq!(
            both.initial_state(mu),
            Err(ConfigError::ConflictingInitialCondition.into())
        );
    }

    #[test]
    fn test_invalid_initial_state() {
        let config = ScenarioConfig::from_state(StateVector::new(Vector3::zeros(), Vector3::new(0.0, 7.5, 0.0)));
        assert!(matches!(
            config.initial_state(398600.4418),
            Err(Error::Config(ConfigError::InvalidState(_)))
        ));
    }

    #[test]
    fn test_span_resolution() {
        let mu = CentralBody::earth().mu;
        let config = ScenarioConfig::from_elements(leo(), AngleUnit::Degrees);
        let state = config.initial_state(mu).unwrap();
        let period = leo().period(mu).unwrap();

        assert_relative_eq!(Span::Periods(2.5).resolve(&state, mu).unwrap(), 2.5 * period, max_relative = 1e-9);
        assert_eq!(Span::Seconds(60.0).resolve(&state, mu), Ok(60.0));
        assert_eq!(Span::Seconds(-1.0).resolve(&state, mu), Err(ConfigError::InvalidSpan(-1.0).into()));
        assert_eq!(Span::Periods(0.0).resolve(&state, mu), Err(ConfigError::InvalidSpan(0.0).into()));

        let escape = StateVector::from_array([7000.0, 0.0, 0.0, 0.0, 12.0, 0.0]);
        assert!(matches!(
            Span::Periods(1.0).resolve(&escape, mu),
            Err(Error::Geometry(GeometryError::OpenOrbit { .. }))
        ));
        assert_eq!(Span::Seconds(600.0).resolve(&escape, mu), Ok(600.0));
    }
}
