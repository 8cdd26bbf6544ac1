//! Ground tracks: inertial positions projected onto Earth longitude and latitude.
//!
//! The Earth-fixed frame is reached by a single rotation about the z axis
//! through the Greenwich sidereal angle
//! `θ(t) = θ₀ + ω⊕·t`, where θ₀ is the Greenwich mean sidereal time of the
//! reference epoch and ω⊕ = 360°/86164.0905 s. Polar motion, precession and
//! nutation are ignored.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::constants::{EARTH_ROTATION_DEG_S, SOLAR_DAY, TAU};
use crate::error::{ConfigError, GeometryError, Result};
use crate::rotation::{r3, AngleUnit};

/// Unix timestamp of 2000-01-01T00:00:00 UTC.
const J2000_MIDNIGHT_UNIX: i64 = 946_684_800;

/// Julian date of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Julian date of J2000.0 (2000-01-01T12:00:00).
const J2000_JD: f64 = 2_451_545.0;

/// Sub-satellite point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundTrackPoint {
    /// Longitude in [-180, 180); `None` where the right ascension is ambiguous
    pub lon: Option<f64>,
    /// Latitude in [-90, 90]
    pub lat: f64,
}

impl GroundTrackPoint {
    /// Longitude with an undefined value as NaN, which plotting libraries draw as a gap.
    pub fn lon_or_nan(&self) -> f64 {
        self.lon.unwrap_or(f64::NAN)
    }
}

/// Default reference epoch, 2000-01-01T00:00:00 UTC.
pub fn default_reference_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default() + Duration::seconds(J2000_MIDNIGHT_UNIX)
}

/// Greenwich mean sidereal time (degrees) at `epoch`, IAU 1982 polynomial.
///
/// UTC is used in place of UT1.
pub fn gmst_deg(epoch: &DateTime<Utc>) -> f64 {
    let seconds = epoch.timestamp() as f64 + epoch.timestamp_subsec_nanos() as f64 * 1e-9;
    let jd = seconds / SOLAR_DAY + UNIX_EPOCH_JD;
    let d = jd - J2000_JD;
    let t = d / 36525.0;
    (280.46061837 + 360.98564736629 * d + 0.000387933 * t * t - t * t * t / 38_710_000.0)
        .rem_euclid(360.0)
}

/// Sidereal angle of Greenwich at propagation time zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiderealReference {
    epoch: Option<DateTime<Utc>>,
    gmst0_deg: f64,
}

impl Default for SiderealReference {
    fn default() -> Self {
        SiderealReference::from_epoch(default_reference_epoch())
    }
}

impl SiderealReference {
    /// Anchor t = 0 at `epoch`.
    pub fn from_epoch(epoch: DateTime<Utc>) -> Self {
        SiderealReference {
            epoch: Some(epoch),
            gmst0_deg: gmst_deg(&epoch),
        }
    }

    /// Greenwich aligned with the inertial x axis at t = 0.
    pub fn aligned() -> Self {
        SiderealReference {
            epoch: None,
            gmst0_deg: 0.0,
        }
    }

    /// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DDTHH:MM:SS[.f]` taken as UTC.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let text = text.trim();
        DateTime::parse_from_rfc3339(text)
            .map(|t| t.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").map(|t| t.and_utc())
            })
            .map(SiderealReference::from_epoch)
            .map_err(|_| ConfigError::InvalidEpoch(text.to_string()))
    }

    pub fn epoch(&self) -> Option<DateTime<Utc>> {
        self.epoch
    }

    /// Greenwich sidereal angle at t = 0 (degrees).
    pub fn gmst0_deg(&self) -> f64 {
        self.gmst0_deg
    }

    /// Greenwich sidereal angle (degrees, [0, 360)) `t` seconds after the reference.
    pub fn rotation_angle_deg(&self, t: f64) -> f64 {
        (self.gmst0_deg + EARTH_ROTATION_DEG_S * t).rem_euclid(360.0)
    }
}

/// Wrap a longitude in degrees into [-180, 180).
pub fn wrap_longitude(deg: f64) -> f64 {
    let lon = (deg + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if lon >= 180.0 { lon - 360.0 } else { lon }
}

/// Right ascension and declination of `r`, in `unit`.
///
/// Right ascension comes from the direction cosines; its quadrant is fixed
/// by the sign of the y cosine, so a position with y exactly zero is
/// reported as [`GeometryError::AmbiguousRightAscension`].
pub fn ra_and_dec_from_r(r: &Vector3<f64>, unit: AngleUnit) -> Result<(f64, f64), GeometryError> {
    let r_mag = r.norm();
    let (l, m) = (r.x / r_mag, r.y / r_mag);
    let dec = declination(r);

    if m == 0.0 {
        return Err(GeometryError::AmbiguousRightAscension { r: [r.x, r.y, r.z] });
    }
    let base = (l / dec.cos()).clamp(-1.0, 1.0).acos();
    let ra = if m > 0.0 { base } else { TAU - base };

    Ok((unit.from_radians(ra), unit.from_radians(dec)))
}

/// Declination of `r` in radians.
fn declination(r: &Vector3<f64>) -> f64 {
    (r.z / r.norm()).clamp(-1.0, 1.0).asin()
}

/// Project inertial positions sampled at `times` (s after the reference)
/// onto Earth longitude/latitude.
///
/// A sample whose Earth-fixed y component is exactly zero keeps its
/// latitude but gets no longitude; the other samples are unaffected.
pub fn cart2lat(
    positions: &[Vector3<f64>],
    times: &[f64],
    reference: &SiderealReference,
) -> Result<Vec<GroundTrackPoint>> {
    if positions.len() != times.len() {
        return Err(ConfigError::LengthMismatch {
            positions: positions.len(),
            times: times.len(),
        }
        .into());
    }

    positions
        .iter()
        .zip(times)
        .map(|(r, &t)| -> Result<GroundTrackPoint> {
            let theta = reference.rotation_angle_deg(t);
            let r_ecef = r3(theta, AngleUnit::Degrees) * r;
            match ra_and_dec_from_r(&r_ecef, AngleUnit::Degrees) {
                Ok((ra, dec)) => Ok(GroundTrackPoint {
                    lon: Some(wrap_longitude(ra)),
                    lat: dec,
                }),
                Err(GeometryError::AmbiguousRightAscension { .. }) => Ok(GroundTrackPoint {
                    lon: None,
                    lat: AngleUnit::Degrees.from_radians(declination(&r_ecef)),
                }),
                Err(err) => Err(err.into()),
            }
        })
        .collect()
}

/// Whether the track jumps across the ±180° meridian between two samples.
/// Never true when either longitude is undefined.
pub fn crosses_antimeridian(a: &GroundTrackPoint, b: &GroundTrackPoint) -> bool {
    match (a.lon, b.lon) {
        (Some(a), Some(b)) => (b - a).abs() > 180.0,
        _ => false,
    }
}

/// Split a track into runs that do not cross the antimeridian, for drawing.
///
/// Points without a longitude end the current run and are left out.
pub fn split_at_antimeridian(points: &[GroundTrackPoint]) -> Vec<&[GroundTrackPoint]> {
    let mut segments = Vec::new();
    let mut start: Option<usize> = None;
    for (i, point) in points.iter().enumerate() {
        if point.lon.is_none() {
            if let Some(s) = start.take() {
                segments.push(&points[s..i]);
            }
            continue;
        }
        match start {
            None => start = Some(i),
            Some(s) if crosses_antimeridian(&points[i - 1], point) => {
                segments.push(&points[s..i]);
                start = Some(i);
            }
            Some(_) => {}
        }
    }
    if let Some(s) = start {
        segments.push(&points[s..]);
    }
    segments
}
