//! Geographic coordinates.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A latitude/longitude pair in decimal degrees.
///
/// Both components are finite and within Earth ranges; the only way to build
/// one is [`GeoPoint::new`], which enforces that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct RawGeoPoint {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = CoreError;

    fn try_from(raw: RawGeoPoint) -> Result<Self, Self::Error> {
        Self::new(raw.lat, raw.lng)
    }
}

impl GeoPoint {
    /// Fallback map center used when no location has ever been stored.
    pub const DEFAULT_CENTER: GeoPoint = GeoPoint {
        lat: 40.734_718_8,
        lng: -73.962_839_1,
    };

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCoordinates`] when either component is not
    /// finite or lies outside `[-90, 90]` / `[-180, 180]`.
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoreError> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        if valid {
            Ok(Self { lat, lng })
        } else {
            Err(CoreError::InvalidCoordinates { lat, lng })
        }
    }

    #[must_use]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[must_use]
    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}
