//! Cartesian state vector in an inertial frame centred on the central body.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Position (km) and velocity (km/s).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    /// Position (km)
    pub r: Vector3<f64>,
    /// Velocity (km/s)
    pub v: Vector3<f64>,
}

impl StateVector {
    pub fn new(r: Vector3<f64>, v: Vector3<f64>) -> Self {
        StateVector { r, v }
    }

    /// Build from `[x, y, z, vx, vy, vz]`.
    pub fn from_array(y: [f64; 6]) -> Self {
        StateVector {
            r: Vector3::new(y[0], y[1], y[2]),
            v: Vector3::new(y[3], y[4], y[5]),
        }
    }

    /// Flatten to `[x, y, z, vx, vy, vz]`.
    pub fn to_array(&self) -> [f64; 6] {
        [self.r.x, self.r.y, self.r.z, self.v.x, self.v.y, self.v.z]
    }

    /// Position magnitude (km).
    pub fn r_mag(&self) -> f64 {
        self.r.norm()
    }

    /// Velocity magnitude (km/s).
    pub fn v_mag(&self) -> f64 {
        self.v.norm()
    }

    /// Specific mechanical energy (km²/s²).
    pub fn energy(&self, mu: f64) -> f64 {
        self.v.norm_squared() / 2.0 - mu / self.r_mag()
    }

    /// Specific angular momentum vector h = r × v (km²/s).
    pub fn angular_momentum(&self) -> Vector3<f64> {
        self.r.cross(&self.v)
    }

    /// Reject a zero or non-finite position and a non-finite velocity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = self.to_array().iter().all(|x| x.is_finite());
        if !finite || self.r_mag() == 0.0 {
            return Err(ConfigError::InvalidState(self.to_array()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_array_layout() {
        let y = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let sv = StateVector::from_array(y);
        assert_eq!(sv.r, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(sv.v, Vector3::new(4.0, 5.0, 6.0));
        assert_eq!(sv.to_array(), y);
    }

    #[test]
    fn test_circular_energy() {
        let mu = 398600.4418;
        let r = 7000.0;
        let sv = StateVector::new(Vector3::new(r, 0.0, 0.0), Vector3::new(0.0, (mu / r).sqrt(), 0.0));
        assert_relative_eq!(sv.energy(mu), -mu / (2.0 * r), epsilon = 1e-12);
        assert_relative_eq!(sv.angular_momentum().z, (mu * r).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_validate() {
        assert!(StateVector::from_array([7000.0, 0.0, 0.0, 0.0, 7.5, 0.0]).validate().is_ok());
        assert!(matches!(
            StateVector::from_array([0.0, 0.0, 0.0, 0.0, 7.5, 0.0]).validate(),
            Err(ConfigError::InvalidState(_))
        ));
        assert!(matches!(
            StateVector::from_array([7000.0, 0.0, 0.0, f64::INFINITY, 7.5, 0.0]).validate(),
            Err(ConfigError::InvalidState(_))
        ));
    }
}
