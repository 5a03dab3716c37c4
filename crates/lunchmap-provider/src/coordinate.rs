use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ProviderError, Result};

/// A WGS84 latitude/longitude pair in degrees.
///
/// Immutable value type. [`Coordinate::new`] does not validate so that
/// provider data can be carried through as-is; use [`Coordinate::try_new`]
/// or [`Coordinate::is_valid`] at trust boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
}

impl Coordinate {
    /// Seoul City Hall, the default origin when the device location is unknown.
    pub const SEOUL_CITY_HALL: Self = Self::new(37.5665, 126.9780);

    #[inline]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Creates a coordinate, rejecting values outside the valid ranges.
    ///
    /// ```rust
    /// use lunchmap_provider::Coordinate;
    ///
    /// assert!(Coordinate::try_new(37.5665, 126.9780).is_ok());
    /// assert!(Coordinate::try_new(91.0, 0.0).is_err());
    /// ```
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self> {
        let coordinate = Self::new(latitude, longitude);
        if coordinate.is_valid() {
            Ok(coordinate)
        } else {
            Err(ProviderError::InvalidCoordinate {
                latitude,
                longitude,
            })
        }
    }

    /// Returns true if both components are finite and within range.
    #[inline]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}
