//! Reactive synchronization core for the service finder.
//!
//! - **filter**: the filter state store (distance, search text, map center)
//! - **engine**: turns filter changes into directory fetches and publishes
//!   the latest non-stale result set
//! - **session**: credential lifecycle and authorization-failure handling
//! - **location**: one-shot device location that feeds the map center
//! - **app**: wires the pieces together the way the binary uses them

pub mod app;
pub mod engine;
pub mod error;
pub mod filter;
pub mod location;
pub mod map;
pub mod notice;
pub mod ports;
pub mod session;

pub use app::App;
pub use engine::{
    EngineHandle, RefreshTrigger, ResultSet, SyncEngine, SyncPhase, SyncSnapshot, SyncState,
};
pub use error::SyncError;
pub use filter::FilterStore;
pub use location::{FixedLocation, LocationAdapter, LocationProvider, NoLocation};
pub use map::{MapView, Marker};
pub use notice::{Notifier, Severity, TracingNotifier};
pub use ports::{AuthApi, ServiceDirectory};
pub use session::{SessionState, SessionStore};
