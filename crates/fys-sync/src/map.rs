//! Data handed to the external map renderer.

use fys_core::{GeoPoint, ServiceRecord};

/// Zoom level the map settles on once markers are placed.
pub const DEFAULT_ZOOM: u8 = 14;

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: i64,
    pub title: String,
    pub position: GeoPoint,
}

/// Map center plus one marker per visible listing.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub center: GeoPoint,
    pub zoom: u8,
    pub markers: Vec<Marker>,
}

impl MapView {
    #[must_use]
    pub fn from_records<'a>(
        center: GeoPoint,
        records: impl IntoIterator<Item = &'a ServiceRecord>,
    ) -> Self {
        let markers = records
            .into_iter()
            .map(|record| Marker {
                id: record.id,
                title: record.title.clone(),
                position: record.location,
            })
            .collect();
        Self {
            center,
            zoom: DEFAULT_ZOOM,
            markers,
        }
    }
}
