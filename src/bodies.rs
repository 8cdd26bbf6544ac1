//! Central bodies and their physical constants.
//!
//! Values are in km and km³/s². The table covers the planets, the Moon,
//! Pluto and the Sun; scenarios refer to a body by name.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Physical constants of the body an orbit is propagated around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralBody {
    /// Lower-case body name
    pub name: String,
    /// Gravitational parameter (km³/s²)
    pub mu: f64,
    /// Mean equatorial radius (km)
    pub radius: f64,
    /// J2 zonal harmonic, if known
    pub j2: Option<f64>,
    /// Sphere-of-influence radius (km), if meaningful
    pub soi: Option<f64>,
}

// (name, mu, radius, j2, soi)
const TABLE: &[(&str, f64, f64, Option<f64>, Option<f64>)] = &[
    ("mercury", 2.2031868551e4, 2440.53, Some(50.3e-6), Some(1.1241e5)),
    ("venus", 3.24858592e5, 6051.8, Some(4.458e-6), Some(6.171832511e5)),
    ("earth", 398600.4418, 6378.137, Some(1.08262668e-3), Some(9.260066608e5)),
    ("moon", 4902.800066, 1737.4, Some(202.7e-6), Some(6.61e4)),
    ("mars", 4.282837362069909e4, 3397.0, Some(1960.45e-6), Some(0.578e6)),
    ("jupiter", 1.26686e8, 71490.0, Some(14736e-6), Some(48.2e6)),
    ("saturn", 3.7931187e7, 60268.0, Some(16298e-6), Some(54.787e6)),
    ("uranus", 5.793939e6, 25559.0, Some(3343.43e-6), Some(5.1785e7)),
    ("neptune", 6.836529e6, 24764.0, Some(3408.4e-6), Some(8.6589e7)),
    ("pluto", 869.6, 1188.0, None, None),
    ("sun", 1.3271244004193938e11, 695510.0, None, None),
];

impl CentralBody {
    /// Build a body from raw constants, rejecting non-positive μ or radius.
    pub fn new(name: impl Into<String>, mu: f64, radius: f64) -> Result<Self, ConfigError> {
        let name = name.into();
        if !(mu.is_finite() && mu > 0.0 && radius.is_finite() && radius > 0.0) {
            return Err(ConfigError::InvalidBody { name, mu, radius });
        }
        Ok(CentralBody {
            name,
            mu,
            radius,
            j2: None,
            soi: None,
        })
    }

    pub fn with_j2(mut self, j2: f64) -> Self {
        self.j2 = Some(j2);
        self
    }

    pub fn with_soi(mut self, soi: f64) -> Self {
        self.soi = Some(soi);
        self
    }

    /// Look up a body in the built-in table (case-insensitive).
    pub fn by_name(name: &str) -> Result<Self, ConfigError> {
        let key = name.trim().to_ascii_lowercase();
        TABLE
            .iter()
            .find(|(n, ..)| *n == key)
            .map(|&(n, mu, radius, j2, soi)| CentralBody {
                name: n.to_string(),
                mu,
                radius,
                j2,
                soi,
            })
            .ok_or_else(|| ConfigError::UnknownBody(name.to_string()))
    }

    /// Names of every body in the built-in table.
    pub fn names() -> impl Iterator<Item = &'static str> {
        TABLE.iter().map(|(n, ..)| *n)
    }

    pub fn earth() -> Self {
        // The table always contains Earth.
        let &(name, mu, radius, j2, soi) = &TABLE[2];
        CentralBody {
            name: name.to_string(),
            mu,
            radius,
            j2,
            soi,
        }
    }

    pub fn is_earth(&self) -> bool {
        self.name == "earth"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let earth = CentralBody::by_name(" Earth ").unwrap();
        assert_eq!(earth, CentralBody::earth());
        assert_eq!(earth.mu, 398600.4418);
        assert!(earth.j2.is_some());
    }

    #[test]
    fn test_every_table_entry_is_valid() {
        for name in CentralBody::names() {
            let body = CentralBody::by_name(name).unwrap();
            assert!(CentralBody::new(body.name.clone(), body.mu, body.radius).is_ok());
        }
    }

    #[test]
    fn test_unknown_body() {
        assert_eq!(
            CentralBody::by_name("vulcan"),
            Err(ConfigError::UnknownBody("vulcan".into()))
        );
    }

    #[test]
    fn test_rejects_non_positive_constants() {
        assert!(matches!(
            CentralBody::new("rock", 0.0, 10.0),
            Err(ConfigError::InvalidBody { .. })
        ));
        assert!(matches!(
            CentralBody::new("rock", 1.0, -1.0),
            Err(ConfigError::InvalidBody { .. })
        ));
        assert!(matches!(
            CentralBody::new("rock", f64::NAN, 1.0),
            Err(ConfigError::InvalidBody { .. })
        ));
    }
}
