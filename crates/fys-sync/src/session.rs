//! Credential lifecycle.
//!
//! [`SessionState`] owns the credential and is what the HTTP client sees
//! through [`AuthHook`]. [`SessionStore`] layers the remote login/logout
//! calls on top of it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use fys_core::storage::keys;
use fys_core::{AuthHook, Credential, KeyValueStore};
use tokio::sync::watch;

use crate::error::SyncError;
use crate::ports::AuthApi;

/// One-shot, debounced "reload everything" trigger.
#[derive(Debug)]
struct ReloadSignal {
    delay: Duration,
    pending: AtomicBool,
    epoch: watch::Sender<u64>,
}

impl ReloadSignal {
    fn schedule(self: &Arc<Self>) {
        if self.pending.swap(true, Ordering::AcqRel) {
            tracing::debug!("reload already pending");
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let signal = Arc::clone(self);
                handle.spawn(async move {
                    tokio::time::sleep(signal.delay).await;
                    signal.fire();
                });
            }
            Err(_) => self.fire(),
        }
    }

    fn fire(&self) {
        self.pending.store(false, Ordering::Release);
        self.epoch.send_modify(|epoch| *epoch += 1);
        tracing::info!(epoch = *self.epoch.borrow(), "client state reload requested");
    }
}

pub struct SessionState {
    storage: Arc<dyn KeyValueStore>,
    credential: Mutex<Credential>,
    reload: Arc<ReloadSignal>,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("authenticated", &self.is_authenticated())
            .field("reload", &self.reload)
            .finish_non_exhaustive()
    }
}

impl SessionState {
    /// Loads whatever credential was persisted by a previous run.
    ///
    /// `reload_delay` is how long [`AuthHook::on_unauthorized`] waits before
    /// signalling a reload.
    pub fn hydrate(storage: Arc<dyn KeyValueStore>, reload_delay: Duration) -> Arc<Self> {
        let credential = Credential {
            access_token: storage.get(keys::ACCESS_TOKEN),
            expires_at: storage.get(keys::EXPIRES_AT),
            token_type: storage.get(keys::TOKEN_TYPE),
        };
        tracing::debug!(
            authenticated = credential.is_present(),
            "hydrated session"
        );
        let (epoch, _) = watch::channel(0);
        Arc::new(Self {
            storage,
            credential: Mutex::new(credential),
            reload: Arc::new(ReloadSignal {
                delay: reload_delay,
                pending: AtomicBool::new(false),
                epoch,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Credential> {
        self.credential
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn credential(&self) -> Credential {
        self.lock().clone()
    }

    /// True when a non-empty access token is held. Expiry is left to the
    /// server.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock().is_present()
    }

    /// Stores the credential in memory and durable storage. Absent fields
    /// remove their key.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] if the credential cannot be written.
    /// All three keys go out as one batch; on failure neither storage nor
    /// the in-memory credential changes.
    pub fn persist(&self, credential: &Credential) -> Result<(), SyncError> {
        self.storage.apply(&[
            (keys::ACCESS_TOKEN, credential.access_token.as_deref()),
            (keys::EXPIRES_AT, credential.expires_at.as_deref()),
            (keys::TOKEN_TYPE, credential.token_type.as_deref()),
        ])?;
        *self.lock() = credential.clone();
        tracing::info!(authenticated = credential.is_present(), "session persisted");
        Ok(())
    }

    /// Forgets the credential.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] if the stored keys cannot be removed.
    /// The in-memory credential is cleared regardless.
    pub fn clear(&self) -> Result<(), SyncError> {
        *self.lock() = Credential::default();
        self.storage.apply(&[
            (keys::ACCESS_TOKEN, None),
            (keys::EXPIRES_AT, None),
            (keys::TOKEN_TYPE, None),
        ])?;
        tracing::info!("session cleared");
        Ok(())
    }

    /// Receiver whose value bumps each time a reload fires.
    #[must_use]
    pub fn subscribe_reload(&self) -> watch::Receiver<u64> {
        self.reload.epoch.subscribe()
    }

    #[must_use]
    pub fn reload_pending(&self) -> bool {
        self.reload.pending.load(Ordering::Acquire)
    }
}

impl AuthHook for SessionState {
    fn bearer_token(&self) -> Option<String> {
        self.lock().bearer_token().map(str::to_string)
    }

    fn on_unauthorized(&self) {
        tracing::warn!("authorization rejected; invalidating session");
        if let Err(e) = self.clear() {
            tracing::error!(error = %e, "failed to clear persisted session");
        }
        self.reload.schedule();
    }
}

/// Session operations that talk to the directory.
pub struct SessionStore<A> {
    state: Arc<SessionState>,
    api: Arc<A>,
}

impl<A> std::fmt::Debug for SessionStore<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<A> Clone for SessionStore<A> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            api: Arc::clone(&self.api),
        }
    }
}

impl<A: AuthApi> SessionStore<A> {
    pub fn new(state: Arc<SessionState>, api: Arc<A>) -> Self {
        Self { state, api }
    }

    #[must_use]
    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Exchanges credentials for a token. Nothing is stored; call
    /// [`SessionStore::persist`] to keep it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Client`] on rejected credentials or transport
    /// failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<Credential, SyncError> {
        let credential = self.api.login(email, password).await?;
        Ok(credential)
    }

    /// # Errors
    ///
    /// See [`SessionState::persist`].
    pub fn persist(&self, credential: &Credential) -> Result<(), SyncError> {
        self.state.persist(credential)
    }

    /// # Errors
    ///
    /// See [`SessionState::clear`].
    pub fn clear(&self) -> Result<(), SyncError> {
        self.state.clear()
    }

    /// Best-effort remote logout followed by an unconditional local clear.
    ///
    /// # Errors
    ///
    /// Only local storage failures are returned; the remote outcome is
    /// logged and otherwise ignored.
    pub async fn logout(&self) -> Result<(), SyncError> {
        if let Err(e) = self.api.logout().await {
            tracing::warn!(error = %e, "remote logout failed");
        }
        self.state.clear()
    }

    /// Checks a stored credential against the directory. A rejected token
    /// is invalidated through the client's auth hook.
    pub async fn validate(&self) {
        if !self.state.is_authenticated() {
            return;
        }
        match self.api.validate().await {
            Ok(()) => tracing::debug!("stored credential accepted"),
            Err(e) if e.is_unauthorized() => {
                tracing::info!("stored credential rejected");
            }
            Err(e) => tracing::warn!(error = %e, "could not validate stored credential"),
        }
    }
}

#[cfg(test)]
mod tests {
    use fys_core::storage::Change;
    use fys_core::{MemoryStore, StorageError};

    use super::*;

    /// Rejects any batch that touches `poisoned`.
    struct RejectingStore {
        inner: MemoryStore,
        poisoned: &'static str,
    }

    impl KeyValueStore for RejectingStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn apply(&self, changes: &[Change<'_>]) -> Result<(), StorageError> {
            if changes.iter().any(|(key, _)| *key == self.poisoned) {
                return Err(StorageError::Io {
                    path: "rejecting".to_string(),
                    source: std::io::Error::other("write refused"),
                });
            }
            self.inner.apply(changes)
        }
    }

    fn credential(token: &str) -> Credential {
        Credential {
            access_token: Some(token.to_string()),
            expires_at: Some("2030-01-01 00:00:00".to_string()),
            token_type: Some("bearer".to_string()),
        }
    }

    fn state() -> (Arc<dyn KeyValueStore>, Arc<SessionState>) {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let state = SessionState::hydrate(Arc::clone(&storage), Duration::from_millis(100));
        (storage, state)
    }

    #[test]
    fn starts_unauthenticated_on_empty_storage() {
        let (_, state) = state();
        assert!(!state.is_authenticated());
        assert_eq!(state.bearer_token(), None);
    }

    #[test]
    fn persist_writes_all_keys_and_survives_rehydrate() {
        let (storage, state) = state();
        state.persist(&credential("abc")).unwrap();

        assert_eq!(storage.get(keys::ACCESS_TOKEN).as_deref(), Some("abc"));
        assert_eq!(storage.get(keys::TOKEN_TYPE).as_deref(), Some("bearer"));

        let restarted = SessionState::hydrate(storage, Duration::from_millis(100));
        assert!(restarted.is_authenticated());
        assert_eq!(restarted.credential(), credential("abc"));
    }

    #[test]
    fn persist_removes_absent_fields() {
        let (storage, state) = state();
        state.persist(&credential("abc")).unwrap();
        state
            .persist(&Credential {
                access_token: Some("def".to_string()),
                ..Credential::default()
            })
            .unwrap();
        assert_eq!(storage.get(keys::EXPIRES_AT), None);
        assert_eq!(storage.get(keys::TOKEN_TYPE), None);
    }

    #[test]
    fn failed_persist_keeps_previous_credential() {
        let inner = MemoryStore::new();
        inner.set(keys::ACCESS_TOKEN, "old").unwrap();
        inner.set(keys::TOKEN_TYPE, "bearer").unwrap();
        let storage: Arc<dyn KeyValueStore> = Arc::new(RejectingStore {
            inner,
            poisoned: keys::TOKEN_TYPE,
        });
        let state = SessionState::hydrate(Arc::clone(&storage), Duration::from_millis(100));

        let err = state.persist(&credential("new")).unwrap_err();

        assert!(matches!(err, SyncError::Storage(_)));
        assert_eq!(state.bearer_token().as_deref(), Some("old"));
        assert_eq!(storage.get(keys::ACCESS_TOKEN).as_deref(), Some("old"));
        assert_eq!(storage.get(keys::EXPIRES_AT), None);

        let restarted = SessionState::hydrate(storage, Duration::from_millis(100));
        assert_eq!(restarted.bearer_token().as_deref(), Some("old"));
    }

    #[test]
    fn failed_clear_still_forgets_in_memory() {
        let inner = MemoryStore::new();
        inner.set(keys::ACCESS_TOKEN, "old").unwrap();
        let storage: Arc<dyn KeyValueStore> = Arc::new(RejectingStore {
            inner,
            poisoned: keys::ACCESS_TOKEN,
        });
        let state = SessionState::hydrate(storage, Duration::from_millis(100));

        assert!(state.clear().is_err());
        assert!(!state.is_authenticated());
    }

    #[test]
    fn empty_token_is_not_authenticated() {
        let (_, state) = state();
        state.persist(&credential("")).unwrap();
        assert!(!state.is_authenticated());
        assert_eq!(state.bearer_token(), None);
    }

    #[test]
    fn clear_removes_everything() {
        let (storage, state) = state();
        state.persist(&credential("abc")).unwrap();
        state.clear().unwrap();
        assert!(!state.is_authenticated());
        assert_eq!(storage.get(keys::ACCESS_TOKEN), None);
        assert_eq!(storage.get(keys::EXPIRES_AT), None);
    }

    #[test]
    fn unauthorized_outside_runtime_reloads_immediately() {
        let (_, state) = state();
        state.persist(&credential("abc")).unwrap();
        let reload = state.subscribe_reload();

        state.on_unauthorized();

        assert!(!state.is_authenticated());
        assert_eq!(*reload.borrow(), 1);
        assert!(!state.reload_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_reload_is_debounced() {
        let (_, state) = state();
        state.persist(&credential("abc")).unwrap();
        let mut reload = state.subscribe_reload();

        state.on_unauthorized();
        state.on_unauthorized();
        state.on_unauthorized();
        assert!(!state.is_authenticated());
        assert!(state.reload_pending());
        assert_eq!(*reload.borrow(), 0);

        tokio::time::sleep(Duration::from_millis(99)).await;
        assert_eq!(*reload.borrow(), 0);

        reload.changed().await.unwrap();
        assert_eq!(*reload.borrow_and_update(), 1);
        assert!(!state.reload_pending());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!reload.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn new_failure_after_reload_schedules_again() {
        let (_, state) = state();
        let mut reload = state.subscribe_reload();

        state.on_unauthorized();
        reload.changed().await.unwrap();
        state.on_unauthorized();
        reload.changed().await.unwrap();
        assert_eq!(*reload.borrow(), 2);
    }
}
