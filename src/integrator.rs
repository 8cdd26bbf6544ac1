//! Adaptive Runge-Kutta integration of six-component first-order systems.
//!
//! Two methods share one step-size controller:
//! - `RK45`: Dormand-Prince 5(4), FSAL, local extrapolation (default)
//! - `RK4`: classical RK4 with step doubling and Richardson extrapolation
//!
//! Errors are measured in the max norm scaled by `atol + rtol·|y|`, and the
//! first step is chosen automatically unless configured.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, IntegrationError};

/// `[x, y, z, vx, vy, vz]`
pub type State6 = [f64; 6];

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
/// Both error estimates are O(h⁵).
const ERROR_EXPONENT: f64 = -1.0 / 5.0;

// ── Configuration ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Method {
    #[default]
    #[serde(rename = "RK45")]
    DormandPrince45,
    #[serde(rename = "RK4")]
    Rk4,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Method::DormandPrince45 => "RK45",
            Method::Rk4 => "RK4",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RK45" => Ok(Method::DormandPrince45),
            "RK4" => Ok(Method::Rk4),
            _ => Err(ConfigError::UnknownIntegrator(s.to_string())),
        }
    }
}

/// Configuration for the numerical integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegratorConfig {
    pub method: Method,
    /// Absolute tolerance.
    pub atol: f64,
    /// Relative tolerance.
    pub rtol: f64,
    /// First step (s); chosen from the derivatives when absent.
    pub initial_step: Option<f64>,
    /// Smallest step (s) tried before giving up.
    pub min_step: f64,
    /// Largest step (s); unbounded when absent.
    pub max_step: Option<f64>,
    /// Step attempts (accepted + rejected) allowed per integration.
    pub max_steps: usize,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        IntegratorConfig {
            method: Method::DormandPrince45,
            atol: 1e-6,
            rtol: 1e-6,
            initial_step: None,
            min_step: 1e-9,
            max_step: None,
            max_steps: 1_000_000,
        }
    }
}

impl IntegratorConfig {
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set both tolerances.
    pub fn with_tolerance(mut self, atol: f64, rtol: f64) -> Self {
        self.atol = atol;
        self.rtol = rtol;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |x: f64| x.is_finite() && x > 0.0;
        if !(positive(self.atol) && positive(self.rtol)) {
            return Err(ConfigError::InvalidTolerance {
                atol: self.atol,
                rtol: self.rtol,
            });
        }
        let steps = [
            ("initial step", self.initial_step),
            ("minimum step", Some(self.min_step)),
            ("maximum step", self.max_step),
        ];
        for (name, value) in steps {
            if let Some(value) = value.filter(|&v| !positive(v)) {
                return Err(ConfigError::InvalidStep { name, value });
            }
        }
        Ok(())
    }
}

// ── Step machinery ──

/// Accepted steps of one integration.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Strictly increasing, from 0 to the end time inclusive
    pub times: Vec<f64>,
    pub states: Vec<State6>,
    pub accepted: usize,
    pub rejected: usize,
    /// Right-hand-side evaluations
    pub evaluations: usize,
}

/// Right-hand side with evaluation counting and a finiteness check.
struct Rhs<F> {
    f: F,
    evaluations: usize,
}

impl<F: FnMut(f64, &State6) -> State6> Rhs<F> {
    fn eval(&mut self, t: f64, y: &State6) -> Result<State6, IntegrationError> {
        self.evaluations += 1;
        let dy = (self.f)(t, y);
        if dy.iter().all(|x| x.is_finite()) {
            Ok(dy)
        } else {
            Err(IntegrationError::NonFiniteDerivative { t, state: *y })
        }
    }
}

/// `y + h Σ cᵢ kᵢ`
fn combine(y: &State6, h: f64, terms: &[(f64, &State6)]) -> State6 {
    let mut out = *y;
    for (c, k) in terms {
        for i in 0..6 {
            out[i] += h * c * k[i];
        }
    }
    out
}

/// Scaled max-norm of `v`, using the larger of `y` and `y_new` for the relative part.
fn error_norm(v: &State6, y: &State6, y_new: &State6, atol: f64, rtol: f64) -> f64 {
    (0..6)
        .map(|i| v[i].abs() / (atol + rtol * y[i].abs().max(y_new[i].abs())))
        .fold(0.0, f64::max)
}

/// Result of one trial step.
struct Trial {
    y_new: State6,
    /// Derivative at the end of the step, when the method produced it
    k_end: Option<State6>,
    err: f64,
}

// ── Dormand-Prince 5(4) Integrator ──

/// Dormand-Prince 5(4) tableau.
mod dp45 {
    pub const C: [f64; 6] = [1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

    pub const A2: [f64; 1] = [1.0 / 5.0];
    pub const A3: [f64; 2] = [3.0 / 40.0, 9.0 / 40.0];
    pub const A4: [f64; 3] = [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0];
    pub const A5: [f64; 4] = [19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0];
    pub const A6: [f64; 5] = [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
    ];

    /// Fifth-order weights (k2 has weight zero)
    pub const B: [f64; 6] = [35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0];

    /// Fifth-order minus fourth-order weights, k1..k7
    pub const E: [f64; 7] = [
        71.0 / 57600.0,
        0.0,
        -71.0 / 16695.0,
        71.0 / 1920.0,
        -17253.0 / 339200.0,
        22.0 / 525.0,
        -1.0 / 40.0,
    ];
}

/// Adaptive integrator over `[0, t_end]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integrator {
    config: IntegratorConfig,
}

impl Integrator {
    pub fn new(config: IntegratorConfig) -> Self {
        Integrator { config }
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Integrate `dy/dt = f(t, y)` from `y0` at t = 0 to `t_end` > 0.
    ///
    /// Every accepted step is recorded; the last sample lands exactly on
    /// `t_end`.
    pub fn integrate<F>(&self, f: F, t_end: f64, y0: State6) -> Result<Solution, IntegrationError>
    where
        F: FnMut(f64, &State6) -> State6,
    {
        let IntegratorConfig {
            min_step,
            max_steps,
            ..
        } = self.config;
        let max_step = self.config.max_step.unwrap_or(f64::INFINITY);

        let mut rhs = Rhs { f, evaluations: 0 };
        let mut t = 0.0;
        let mut y = y0;
        let mut k1 = rhs.eval(t, &y)?;

        let mut h = match self.config.initial_step {
            Some(h) => h,
            None => self.select_initial_step(&mut rhs, &y, &k1, t_end)?,
        }
        .min(max_step);

        let mut times = vec![t];
        let mut states = vec![y];
        let mut accepted = 0;
        let mut rejected = 0;

        while t < t_end {
            if accepted + rejected >= max_steps {
                return Err(IntegrationError::MaxStepsExceeded { t, t_end, max_steps });
            }

            let remaining = t_end - t;
            let last = h >= remaining;
            if last {
                h = remaining;
            } else if h < min_step {
                return Err(IntegrationError::StepSizeUnderflow { t, step: h, min_step });
            }

            let trial = match self.config.method {
                Method::DormandPrince45 => self.dp45_step(&mut rhs, t, &y, &k1, h)?,
                Method::Rk4 => self.richardson_step(&mut rhs, t, &y, &k1, h)?,
            };

            if trial.err <= 1.0 {
                t = if last { t_end } else { t + h };
                y = trial.y_new;
                k1 = match trial.k_end {
                    Some(k) => k,
                    None => rhs.eval(t, &y)?,
                };
                times.push(t);
                states.push(y);
                accepted += 1;

                let factor = if trial.err == 0.0 {
                    MAX_FACTOR
                } else {
                    (SAFETY * trial.err.powf(ERROR_EXPONENT)).clamp(MIN_FACTOR, MAX_FACTOR)
                };
                h = (h * factor).min(max_step);
            } else {
                rejected += 1;
                let factor = if trial.err.is_finite() {
                    (SAFETY * trial.err.powf(ERROR_EXPONENT)).max(MIN_FACTOR)
                } else {
                    MIN_FACTOR
                };
                h *= factor;
            }
        }

        log::debug!(
            "{} reached t = {} s: {} accepted, {} rejected, {} evaluations",
            self.config.method,
            t_end,
            accepted,
            rejected,
            rhs.evaluations
        );

        Ok(Solution {
            times,
            states,
            accepted,
            rejected,
            evaluations: rhs.evaluations,
        })
    }

    /// Starting step from the size of the solution and its first two derivatives
    /// (Hairer, Nørsett & Wanner, II.4).
    fn select_initial_step<F>(
        &self,
        rhs: &mut Rhs<F>,
        y0: &State6,
        f0: &State6,
        t_end: f64,
    ) -> Result<f64, IntegrationError>
    where
        F: FnMut(f64, &State6) -> State6,
    {
        let IntegratorConfig { atol, rtol, .. } = self.config;
        let d0 = error_norm(y0, y0, y0, atol, rtol);
        let d1 = error_norm(f0, y0, y0, atol, rtol);

        let h0 = if d0 < 1e-5 || d1 < 1e-5 { 1e-6 } else { 0.01 * d0 / d1 };
        let h0 = h0.min(t_end);

        let y1 = combine(y0, h0, &[(1.0, f0)]);
        let f1 = rhs.eval(h0, &y1)?;
        let mut df = [0.0; 6];
        for i in 0..6 {
            df[i] = f1[i] - f0[i];
        }
        let d2 = error_norm(&df, y0, y0, atol, rtol) / h0;

        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / 5.0)
        };

        Ok((100.0 * h0).min(h1).min(t_end))
    }

    fn dp45_step<F>(
        &self,
        rhs: &mut Rhs<F>,
        t: f64,
        y: &State6,
        k1: &State6,
        h: f64,
    ) -> Result<Trial, IntegrationError>
    where
        F: FnMut(f64, &State6) -> State6,
    {
        use dp45::*;

        let k2 = rhs.eval(t + C[0] * h, &combine(y, h, &[(A2[0], k1)]))?;
        let k3 = rhs.eval(t + C[1] * h, &combine(y, h, &[(A3[0], k1), (A3[1], &k2)]))?;
        let k4 = rhs.eval(
            t + C[2] * h,
            &combine(y, h, &[(A4[0], k1), (A4[1], &k2), (A4[2], &k3)]),
        )?;
        let k5 = rhs.eval(
            t + C[3] * h,
            &combine(y, h, &[(A5[0], k1), (A5[1], &k2), (A5[2], &k3), (A5[3], &k4)]),
        )?;
        let k6 = rhs.eval(
            t + C[4] * h,
            &combine(
                y,
                h,
                &[(A6[0], k1), (A6[1], &k2), (A6[2], &k3), (A6[3], &k4), (A6[4], &k5)],
            ),
        )?;

        let y_new = combine(
            y,
            h,
            &[(B[0], k1), (B[2], &k3), (B[3], &k4), (B[4], &k5), (B[5], &k6)],
        );
        let k7 = rhs.eval(t + C[5] * h, &y_new)?;

        let err_vec = combine(
            &[0.0; 6],
            h,
            &[(E[0], k1), (E[2], &k3), (E[3], &k4), (E[4], &k5), (E[5], &k6), (E[6], &k7)],
        );
        let err = error_norm(&err_vec, y, &y_new, self.config.atol, self.config.rtol);

        Ok(Trial {
            y_new,
            k_end: Some(k7),
            err,
        })
    }

    /// One RK4 step of size h against two of size h/2, extrapolated to fifth order.
    fn richardson_step<F>(
        &self,
        rhs: &mut Rhs<F>,
        t: f64,
        y: &State6,
        k1: &State6,
        h: f64,
    ) -> Result<Trial, IntegrationError>
    where
        F: FnMut(f64, &State6) -> State6,
    {
        let y_full = rk4_step(rhs, t, y, k1, h)?;
        let y_half1 = rk4_step(rhs, t, y, k1, h / 2.0)?;
        let k_mid = rhs.eval(t + h / 2.0, &y_half1)?;
        let y_half2 = rk4_step(rhs, t + h / 2.0, &y_half1, &k_mid, h / 2.0)?;

        let mut y_new = [0.0; 6];
        let mut diff = [0.0; 6];
        for i in 0..6 {
            diff[i] = (y_half2[i] - y_full[i]) / 15.0;
            y_new[i] = y_half2[i] + diff[i];
        }
        let err = error_norm(&diff, y, &y_new, self.config.atol, self.config.rtol);

        Ok(Trial {
            y_new,
            k_end: None,
            err,
        })
    }
}

// ── Classical RK4 ──

/// Classical RK4 step with the first stage supplied.
fn rk4_step<F>(
    rhs: &mut Rhs<F>,
    t: f64,
    y: &State6,
    k1: &State6,
    h: f64,
) -> Result<State6, IntegrationError>
where
    F: FnMut(f64, &State6) -> State6,
{
    let k2 = rhs.eval(t + 0.5 * h, &combine(y, 0.5 * h, &[(1.0, k1)]))?;
    let k3 = rhs.eval(t + 0.5 * h, &combine(y, 0.5 * h, &[(1.0, &k2)]))?;
    let k4 = rhs.eval(t + h, &combine(y, h, &[(1.0, &k3)]))?;
    Ok(combine(
        y,
        h / 6.0,
        &[(1.0, k1), (2.0, &k2), (2.0, &k3), (1.0, &k4)],
    ))
}
