//! One-shot device location feeding the map center.

use std::future::Future;
use std::sync::Arc;

use fys_core::GeoPoint;

use crate::error::SyncError;
use crate::filter::FilterStore;
use crate::notice::{Notifier, Severity};

pub trait LocationProvider: Send + Sync {
    fn current_position(&self) -> impl Future<Output = Result<GeoPoint, SyncError>> + Send;
}

/// Always reports the same position, e.g. coordinates given on the command
/// line.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub GeoPoint);

impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<GeoPoint, SyncError> {
        Ok(self.0)
    }
}

/// No location source available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLocation;

impl LocationProvider for NoLocation {
    async fn current_position(&self) -> Result<GeoPoint, SyncError> {
        Err(SyncError::LocationUnavailable(
            "no location source configured".to_string(),
        ))
    }
}

pub struct LocationAdapter<P> {
    provider: P,
    filters: Arc<FilterStore>,
    notifier: Arc<dyn Notifier>,
}

impl<P: std::fmt::Debug> std::fmt::Debug for LocationAdapter<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationAdapter")
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl<P: LocationProvider> LocationAdapter<P> {
    pub fn new(provider: P, filters: Arc<FilterStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            provider,
            filters,
            notifier,
        }
    }

    /// Asks the provider for a position and, on success, makes it the map
    /// center. The stored (or default) distance is re-asserted first so the
    /// fetch triggered by the new center uses it.
    ///
    /// On failure a warning notice is emitted and the filter state is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns the provider's error, or [`SyncError::Storage`] if the new
    /// state cannot be persisted.
    pub async fn request_location(&self) -> Result<GeoPoint, SyncError> {
        let position = match self.provider.current_position().await {
            Ok(position) => position,
            Err(e) => {
                tracing::warn!(error = %e, "location request failed");
                self.notifier.notify("Location unavailable", Severity::Warning);
                return Err(e);
            }
        };
        tracing::info!(%position, "location acquired");
        self.filters
            .set_distance(self.filters.stored_or_default_distance())?;
        self.filters.set_center(position)?;
        Ok(position)
    }
}
