//! Geographic point type.

use serde::{Deserialize, Serialize};

/// Errors that can occur when validating a [`Point`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum PointError {
    /// Longitude is outside [-180, 180] or not finite.
    #[error("longitude must be a finite value between -180 and 180 (got {0})")]
    InvalidLongitude(f64),
    /// Latitude is outside [-90, 90] or not finite.
    #[error("latitude must be a finite value between -90 and 90 (got {0})")]
    InvalidLatitude(f64),
}

/// A WGS84 coordinate pair, longitude first (GeoJSON order).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Longitude in degrees, -180 to 180.
    pub longitude: f64,
    /// Latitude in degrees, -90 to 90.
    pub latitude: f64,
}

impl Point {
    /// Create a validated point.
    ///
    /// # Errors
    ///
    /// Returns `PointError` if either coordinate is non-finite or out of
    /// range.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, PointError> {
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(PointError::InvalidLongitude(longitude));
        }
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(PointError::InvalidLatitude(latitude));
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_points() {
        assert!(Point::new(0.0, 0.0).is_ok());
        assert!(Point::new(-180.0, -90.0).is_ok());
        assert!(Point::new(180.0, 90.0).is_ok());
        assert!(Point::new(37.6173, 55.7558).is_ok());
    }

    #[test]
    fn test_longitude_out_of_range() {
        assert_eq!(
            Point::new(181.0, 0.0),
            Err(PointError::InvalidLongitude(181.0))
        );
        assert!(Point::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_latitude_out_of_range() {
        assert_eq!(
            Point::new(0.0, 90.5),
            Err(PointError::InvalidLatitude(90.5))
        );
        assert!(Point::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let point = Point::new(2.3522, 48.8566).unwrap();
        let json = serde_json::to_string(&point).unwrap();
        let parsed: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, point);
    }
}
