//! Geodesy primitives
//!
//! Positions on a spherical earth with the handful of operations the
//! inference pipelines need: distance, great-circle bearing, cross-track and
//! along-track distance against a line, and rhumb-line translation.
//!
//! Ambiguous geometry is not an error. A point exactly 90° away from a
//! great circle has no defined along-track distance, and the result is
//! `f64::NAN`. Callers check with `is_nan()` before using such values.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Mean earth radius in meters
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Length of a nautical mile in meters
pub const NAUTICAL_MILE: f64 = 1852.0;

/// Knots to meters per second
pub const KN_TO_MS: f64 = NAUTICAL_MILE / 3600.0;

/// Meters per second to knots
pub const MS_TO_KN: f64 = 3600.0 / NAUTICAL_MILE;

#[inline]
pub fn knots_to_meters_per_second(knots: f64) -> f64 {
    knots * KN_TO_MS
}

#[inline]
pub fn meters_per_second_to_knots(ms: f64) -> f64 {
    ms * MS_TO_KN
}

#[inline]
pub fn meters_to_nautical_miles(meters: f64) -> f64 {
    meters / NAUTICAL_MILE
}

#[inline]
pub fn nautical_miles_to_meters(nm: f64) -> f64 {
    nm * NAUTICAL_MILE
}

/// Normalize an angle in degrees to [0, 360)
pub fn normalize_degrees(degrees: f64) -> f64 {
    let mut d = degrees % 360.0;
    if d < 0.0 {
        d += 360.0;
    }
    // -0.0 % 360 and values like -1e-15 + 360 can land on 360
    if d >= 360.0 {
        d -= 360.0;
    }
    d
}

/// Signed difference `to - from` in degrees, in (-180, 180]
pub fn angle_difference(to: f64, from: f64) -> f64 {
    let d = normalize_degrees(to - from);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Position { lat, lon }
    }

    /// True when both coordinates are finite and inside their ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && self.lat.abs() <= 90.0
            && self.lon.abs() <= 180.0
    }

    /// Great-circle distance in meters (haversine)
    pub fn distance_to(&self, other: &Position) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = phi2 - phi1;
        let d_lambda = (other.lon - self.lon).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Initial great-circle bearing toward `other`, degrees in [0, 360)
    pub fn bearing_to(&self, other: &Position) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_lambda = (other.lon - self.lon).to_radians();

        let y = d_lambda.sin() * phi2.cos();
        let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
        normalize_degrees(y.atan2(x).to_degrees())
    }

    /// Signed distance in meters from the great circle through `line_start`
    /// with initial bearing `line_bearing`. Positive is right of the line
    /// direction.
    pub fn cross_track_error(&self, line_start: &Position, line_bearing: f64) -> f64 {
        let delta13 = line_start.distance_to(self) / EARTH_RADIUS;
        let theta13 = line_start.bearing_to(self).to_radians();
        let theta12 = line_bearing.to_radians();
        (delta13.sin() * (theta13 - theta12).sin()).asin() * EARTH_RADIUS
    }

    /// Signed distance in meters from `line_start` to the foot of the
    /// perpendicular from this position onto the line. NaN when the position
    /// sits exactly 90° off the line.
    pub fn along_track_distance(&self, line_start: &Position, line_bearing: f64) -> f64 {
        let delta13 = line_start.distance_to(self) / EARTH_RADIUS;
        let theta13 = line_start.bearing_to(self).to_radians();
        let theta12 = line_bearing.to_radians();
        if delta13 == 0.0 {
            return 0.0;
        }
        // At the pole of the great circle every foot point is equally near
        let delta_xt = (delta13.sin() * (theta13 - theta12).sin()).asin();
        if PI / 2.0 - delta_xt.abs() < 1e-7 {
            return f64::NAN;
        }
        (delta13.tan() * (theta13 - theta12).cos()).atan() * EARTH_RADIUS
    }

    /// Unsigned distance to the great circle through `a` and `b`
    pub fn distance_to_line(&self, a: &Position, b: &Position) -> f64 {
        self.cross_track_error(a, a.bearing_to(b)).abs()
    }

    /// Distance to the segment `a`-`b`: perpendicular distance when the
    /// foot lies between the ends, distance to the nearer end otherwise
    pub fn distance_to_segment(&self, a: &Position, b: &Position) -> f64 {
        let bearing = a.bearing_to(b);
        let along = self.along_track_distance(a, bearing);
        if along.is_nan() {
            return f64::NAN;
        }
        if along <= 0.0 {
            self.distance_to(a)
        } else if along >= a.distance_to(b) {
            self.distance_to(b)
        } else {
            self.cross_track_error(a, bearing).abs()
        }
    }

    /// Position reached by sailing `distance` meters on a constant `bearing`
    pub fn translate_rhumb(&self, bearing: f64, distance: f64) -> Position {
        let delta = distance / EARTH_RADIUS;
        let phi1 = self.lat.to_radians();
        let lambda1 = self.lon.to_radians();
        let theta = bearing.to_radians();

        let d_phi = delta * theta.cos();
        let mut phi2 = phi1 + d_phi;
        // Over the pole
        if phi2.abs() > PI / 2.0 {
            phi2 = if phi2 > 0.0 { PI - phi2 } else { -PI - phi2 };
        }

        let d_psi = ((phi2 / 2.0 + PI / 4.0).tan() / (phi1 / 2.0 + PI / 4.0).tan()).ln();
        // E-W course is ill-conditioned with d_psi
        let q = if d_psi.abs() > 1e-12 {
            d_phi / d_psi
        } else {
            phi1.cos()
        };
        let d_lambda = delta * theta.sin() / q;
        let lambda2 = lambda1 + d_lambda;

        Position {
            lat: phi2.to_degrees(),
            lon: normalize_degrees(lambda2.to_degrees() + 180.0) - 180.0,
        }
    }

    /// Linear interpolation toward `other`; adequate for fixes seconds apart
    pub fn interpolate(&self, other: &Position, ratio: f64) -> Position {
        Position {
            lat: self.lat + (other.lat - self.lat) * ratio,
            lon: self.lon + (other.lon - self.lon) * ratio,
        }
    }
}

/// Speed over ground with course over ground
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedWithBearing {
    /// Speed in knots
    pub knots: f64,
    /// Course in degrees (0-360, true north)
    pub bearing: f64,
}

impl SpeedWithBearing {
    pub fn new(knots: f64, bearing: f64) -> Self {
        SpeedWithBearing {
            knots,
            bearing: normalize_degrees(bearing),
        }
    }

    pub fn meters_per_second(&self) -> f64 {
        knots_to_meters_per_second(self.knots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
    }

    #[test]
    fn test_angle_difference() {
        assert!((angle_difference(10.0, 350.0) - 20.0).abs() < 1e-9);
        assert!((angle_difference(350.0, 10.0) + 20.0).abs() < 1e-9);
        assert!((angle_difference(180.0, 0.0) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_one_minute_of_latitude() {
        let a = Position::new(54.0, 10.0);
        let b = Position::new(54.0 + 1.0 / 60.0, 10.0);
        // One minute of latitude is close to a nautical mile
        assert!((a.distance_to(&b) - NAUTICAL_MILE).abs() < 5.0);
    }

    #[test]
    fn test_bearing_cardinal() {
        let a = Position::new(54.0, 10.0);
        assert!((a.bearing_to(&Position::new(54.1, 10.0)) - 0.0).abs() < 1e-6);
        assert!((a.bearing_to(&Position::new(53.9, 10.0)) - 180.0).abs() < 1e-6);
        assert!((a.bearing_to(&Position::new(54.0, 10.1)) - 90.0).abs() < 0.1);
    }

    #[test]
    fn test_cross_track_sign() {
        // Line running north from origin
        let start = Position::new(0.0, 0.0);
        let east = Position::new(0.001, 0.001);
        let west = Position::new(0.001, -0.001);
        assert!(east.cross_track_error(&start, 0.0) > 0.0);
        assert!(west.cross_track_error(&start, 0.0) < 0.0);
        let xte = east.cross_track_error(&start, 0.0);
        assert!((xte - 111.2).abs() < 1.0);
    }

    #[test]
    fn test_along_track_and_segment() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(0.0, 0.01);
        let p = Position::new(0.001, 0.005);
        let along = p.along_track_distance(&a, a.bearing_to(&b));
        assert!((along - a.distance_to(&Position::new(0.0, 0.005))).abs() < 1.0);

        let inside = p.distance_to_segment(&a, &b);
        assert!((inside - p.distance_to_line(&a, &b)).abs() < 1e-6);

        let beyond = Position::new(0.0, 0.02);
        assert!((beyond.distance_to_segment(&a, &b) - beyond.distance_to(&b)).abs() < 1e-6);
    }

    #[test]
    fn test_along_track_ambiguous_is_nan() {
        // A quarter of the globe away, perpendicular to the line
        let start = Position::new(0.0, 0.0);
        let p = Position::new(0.0, 90.0);
        assert!(p.along_track_distance(&start, 0.0).is_nan());
        assert!(p.distance_to_segment(&start, &Position::new(1.0, 0.0)).is_nan());
    }

    #[test]
    fn test_translate_rhumb() {
        let a = Position::new(54.0, 10.0);
        let b = a.translate_rhumb(90.0, 1000.0);
        assert!((a.distance_to(&b) - 1000.0).abs() < 1.0);
        assert!((b.lat - a.lat).abs() < 1e-6);

        let c = a.translate_rhumb(0.0, NAUTICAL_MILE);
        assert!((c.lat - (54.0 + 1.0 / 60.0)).abs() < 1e-3);
    }

    #[test]
    fn test_unit_conversions() {
        assert!((knots_to_meters_per_second(1.0) - 0.514444).abs() < 1e-5);
        assert!((meters_per_second_to_knots(knots_to_meters_per_second(7.0)) - 7.0).abs() < 1e-9);
        assert!((meters_to_nautical_miles(3704.0) - 2.0).abs() < 1e-9);
        assert_eq!(nautical_miles_to_meters(1.0), NAUTICAL_MILE);
    }

    #[test]
    fn test_invalid_position() {
        assert!(Position::new(54.0, 10.0).is_valid());
        assert!(!Position::new(f64::NAN, 10.0).is_valid());
        assert!(!Position::new(91.0, 10.0).is_valid());
    }
}
