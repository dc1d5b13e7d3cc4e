//! Startup wiring.
//!
//! Order matters: filters are hydrated before the engine subscribes, so the
//! first fetch already uses the persisted distance and center. The reload
//! listener is running before the location request, which may be slow; a new
//! center simply supersedes the first fetch.

use std::sync::Arc;
use std::time::Duration;

use fys_client::DirectoryClient;
use fys_core::{AppConfig, AuthHook, JsonFileStore, KeyValueStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::engine::{EngineHandle, SyncEngine, SyncSnapshot};
use crate::error::SyncError;
use crate::filter::FilterStore;
use crate::location::{LocationAdapter, LocationProvider};
use crate::notice::{Notifier, Severity};
use crate::ports::{AuthApi, ServiceDirectory};
use crate::session::{SessionState, SessionStore};

pub struct App<D> {
    directory: Arc<D>,
    filters: Arc<FilterStore>,
    session: SessionStore<D>,
    engine: EngineHandle,
    notifier: Arc<dyn Notifier>,
    reload_listener: JoinHandle<()>,
}

impl<D> std::fmt::Debug for App<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("filters", &self.filters)
            .field("session", &self.session)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl App<DirectoryClient> {
    /// Opens the state file, restores the session and starts against the
    /// configured directory.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] if the state file cannot be read and
    /// [`SyncError::Client`] if the HTTP client cannot be built.
    pub async fn connect<P: LocationProvider>(
        config: &AppConfig,
        notifier: Arc<dyn Notifier>,
        location: P,
    ) -> Result<Self, SyncError> {
        let storage: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(&config.state_path)?);
        let session = SessionState::hydrate(
            Arc::clone(&storage),
            Duration::from_millis(config.reload_delay_ms),
        );
        let hook: Arc<dyn AuthHook> = session.clone();
        let directory = DirectoryClient::from_config(config)?.with_auth_hook(hook);
        tracing::info!(
            api_url = %directory.base_url(),
            env = %config.env,
            state_path = %config.state_path.display(),
            "connecting"
        );
        Ok(Self::start(
            Arc::new(directory),
            storage,
            session,
            config.default_distance,
            notifier,
            location,
        )
        .await)
    }
}

impl<D: ServiceDirectory + AuthApi> App<D> {
    /// Brings the client core up: hydrate filters, validate any stored
    /// token in the background, start the engine and the reload listener,
    /// then request the device location once.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start<P: LocationProvider>(
        directory: Arc<D>,
        storage: Arc<dyn KeyValueStore>,
        session: Arc<SessionState>,
        default_distance: u32,
        notifier: Arc<dyn Notifier>,
        location: P,
    ) -> Self {
        let filters = Arc::new(FilterStore::hydrate(storage, default_distance));
        let session = SessionStore::new(session, Arc::clone(&directory));
        // Subscribed before anything can hit a 401 so no reload is missed.
        let reloads = session.state().subscribe_reload();

        if session.is_authenticated() {
            let validator = session.clone();
            tokio::spawn(async move { validator.validate().await });
        }

        let engine =
            SyncEngine::new(Arc::clone(&directory), Arc::clone(&notifier)).spawn(&filters);
        let reload_listener = spawn_reload_listener(reloads, &filters, &engine);

        let adapter = LocationAdapter::new(location, Arc::clone(&filters), Arc::clone(&notifier));
        if let Err(e) = adapter.request_location().await {
            tracing::debug!(error = %e, "continuing with stored center");
        }

        Self {
            directory,
            filters,
            session,
            engine,
            notifier,
            reload_listener,
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    #[must_use]
    pub fn filters(&self) -> &Arc<FilterStore> {
        &self.filters
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore<D> {
        &self.session
    }

    #[must_use]
    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    #[must_use]
    pub fn snapshot(&self) -> SyncSnapshot {
        self.engine.snapshot()
    }

    /// Logs in and keeps the credential.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Client`] if the directory rejects the login and
    /// [`SyncError::Storage`] if the credential cannot be stored.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), SyncError> {
        let credential = self.session.login(email, password).await?;
        self.session.persist(&credential)?;
        self.notifier.notify("Logged in", Severity::Success);
        Ok(())
    }

    /// # Errors
    ///
    /// See [`SessionStore::logout`].
    pub async fn logout(&self) -> Result<(), SyncError> {
        self.session.logout().await?;
        self.notifier.notify("Logged out", Severity::Info);
        Ok(())
    }

    pub async fn shutdown(self) {
        self.reload_listener.abort();
        self.engine.shutdown().await;
    }
}

/// Each reload rehydrates the filters from storage and re-fetches.
fn spawn_reload_listener(
    mut reloads: watch::Receiver<u64>,
    filters: &Arc<FilterStore>,
    engine: &EngineHandle,
) -> JoinHandle<()> {
    let filters = Arc::clone(filters);
    let refresh = engine.refresh_trigger();
    tokio::spawn(async move {
        while reloads.changed().await.is_ok() {
            let epoch = *reloads.borrow_and_update();
            tracing::info!(epoch, "reloading client state");
            filters.rehydrate();
            if !refresh.fire() {
                break;
            }
        }
    })
}
