//! Geographic position value type.
//!
//! Coordinates are decimal degrees. The matching pipeline treats
//! (longitude, latitude) as planar Cartesian (x, y) coordinates; see
//! [`crate::geometry`].

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::ops::Add;

/// An immutable (latitude, longitude) pair in degrees.
///
/// Equality is exact field comparison with no tolerance. Node deduplication
/// and the degenerate-segment check both depend on this.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    /// Latitude in degrees (planar y)
    pub lat: f64,

    /// Longitude in degrees (planar x)
    pub lon: f64,
}

impl GeoPosition {
    /// Creates a new position from latitude and longitude.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns the position as a planar point `(x = lon, y = lat)`.
    #[inline]
    pub fn to_planar(self) -> Point2<f64> {
        Point2::new(self.lon, self.lat)
    }

    /// True if both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Component-wise sum.
///
/// Kept for compatibility with older tooling that offsets positions. The sum
/// of two geographic positions has no geographic meaning; matching logic
/// never uses it.
impl Add for GeoPosition {
    type Output = GeoPosition;

    fn add(self, rhs: GeoPosition) -> GeoPosition {
        GeoPosition::new(self.lat + rhs.lat, self.lon + rhs.lon)
    }
}

impl std::fmt::Display for GeoPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}
