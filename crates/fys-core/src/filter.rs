use serde::Serialize;

use crate::geo::GeoPoint;

/// Snapshot of the active listing filters.
///
/// Snapshots are values: every change produces a new `FilterState`, never an
/// in-place edit visible to other readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterState {
    pub distance: u32,
    pub search_text: String,
    pub center: GeoPoint,
}

impl FilterState {
    #[must_use]
    pub fn new(distance: u32, center: GeoPoint) -> Self {
        Self {
            distance,
            search_text: String::new(),
            center,
        }
    }

    /// Whether `other` would need a different directory fetch than `self`.
    ///
    /// Only distance and center are sent to the directory; search text is
    /// applied locally.
    #[must_use]
    pub fn fetch_params_differ(&self, other: &FilterState) -> bool {
        self.distance != other.distance || self.center != other.center
    }
}

/// Parses user or stored distance input. Anything that is not a non-negative
/// integer becomes `0`.
#[must_use]
pub fn parse_distance(raw: &str) -> u32 {
    raw.trim().parse::<u32>().unwrap_or(0)
}
