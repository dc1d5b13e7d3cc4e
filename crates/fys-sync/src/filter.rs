//! Filter state store.
//!
//! Single source of truth for the active `(distance, search_text, center)`.
//! Distance and center are persisted under their storage keys before the new
//! snapshot is published; search text lives only in memory.

use std::sync::Arc;

use fys_core::filter::parse_distance;
use fys_core::storage::keys;
use fys_core::{FilterState, GeoPoint, KeyValueStore};
use tokio::sync::watch;

use crate::error::SyncError;

pub struct FilterStore {
    storage: Arc<dyn KeyValueStore>,
    default_distance: u32,
    state: watch::Sender<FilterState>,
}

impl std::fmt::Debug for FilterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterStore")
            .field("default_distance", &self.default_distance)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl FilterStore {
    /// Builds the store from durable storage, falling back to
    /// `default_distance` and [`GeoPoint::DEFAULT_CENTER`].
    pub fn hydrate(storage: Arc<dyn KeyValueStore>, default_distance: u32) -> Self {
        let initial = load_state(storage.as_ref(), default_distance);
        tracing::debug!(
            distance = initial.distance,
            center = %initial.center,
            "hydrated filter state"
        );
        let (state, _) = watch::channel(initial);
        Self {
            storage,
            default_distance,
            state,
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn get(&self) -> FilterState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FilterState> {
        self.state.subscribe()
    }

    /// Persists and publishes a new distance.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] if the value cannot be persisted; the
    /// published state is left unchanged in that case.
    pub fn set_distance(&self, distance: u32) -> Result<(), SyncError> {
        tracing::debug!(distance, "setting distance");
        self.storage
            .set(keys::FILTER_DISTANCE, &distance.to_string())?;
        self.state.send_modify(|state| state.distance = distance);
        Ok(())
    }

    /// Same as [`FilterStore::set_distance`] for raw user input; anything
    /// that is not a non-negative integer becomes `0`.
    ///
    /// # Errors
    ///
    /// See [`FilterStore::set_distance`].
    pub fn set_distance_str(&self, raw: &str) -> Result<(), SyncError> {
        self.set_distance(parse_distance(raw))
    }

    pub fn set_search(&self, search_text: impl Into<String>) {
        let search_text = search_text.into();
        tracing::debug!(%search_text, "setting search text");
        self.state.send_modify(|state| state.search_text = search_text);
    }

    /// Persists and publishes a new map center.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] if the coordinates cannot be
    /// persisted. Both coordinates are written as one batch, so neither the
    /// stored nor the published center changes in that case.
    pub fn set_center(&self, center: GeoPoint) -> Result<(), SyncError> {
        tracing::debug!(%center, "setting center");
        let (lat, lng) = (center.lat().to_string(), center.lng().to_string());
        self.storage.apply(&[
            (keys::CENTER_LAT, Some(lat.as_str())),
            (keys::CENTER_LNG, Some(lng.as_str())),
        ])?;
        self.state.send_modify(|state| state.center = center);
        Ok(())
    }

    /// The persisted distance, or the configured default when nothing has
    /// been stored yet.
    #[must_use]
    pub fn stored_or_default_distance(&self) -> u32 {
        self.storage
            .get(keys::FILTER_DISTANCE)
            .map_or(self.default_distance, |raw| parse_distance(&raw))
    }

    /// Re-reads distance and center from storage and publishes the result,
    /// keeping the in-memory search text.
    pub fn rehydrate(&self) {
        let loaded = load_state(self.storage.as_ref(), self.default_distance);
        self.state.send_modify(|state| {
            state.distance = loaded.distance;
            state.center = loaded.center;
        });
    }
}

fn load_state(storage: &dyn KeyValueStore, default_distance: u32) -> FilterState {
    let distance = storage
        .get(keys::FILTER_DISTANCE)
        .map_or(default_distance, |raw| parse_distance(&raw));
    FilterState::new(distance, load_center(storage))
}

fn load_center(storage: &dyn KeyValueStore) -> GeoPoint {
    let parse = |key: &str| storage.get(key).and_then(|raw| raw.trim().parse::<f64>().ok());
    match (parse(keys::CENTER_LAT), parse(keys::CENTER_LNG)) {
        (Some(lat), Some(lng)) => GeoPoint::new(lat, lng).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "stored center is invalid; using default");
            GeoPoint::DEFAULT_CENTER
        }),
        _ => GeoPoint::DEFAULT_CENTER,
    }
}
