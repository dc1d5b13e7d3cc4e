//! Synchronization engine.
//!
//! [`SyncState`] is the pure state machine: it decides when a filter change
//! needs a directory fetch and which completions may be published.
//! [`SyncEngine`] drives it from a single tokio task, so the state is owned
//! by one task and never shared.
//!
//! Every issued fetch gets the next generation number. A completion is only
//! published when its generation is still the latest issued one; anything
//! older was superseded while in flight and is dropped.

use std::sync::Arc;

use fys_client::ClientError;
use fys_core::{FilterState, GeoPoint, ServiceRecord};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::filter::FilterStore;
use crate::map::MapView;
use crate::notice::{Notifier, Severity};
use crate::ports::ServiceDirectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Nothing fetched yet and nothing in flight.
    Idle,
    Fetching { generation: u64 },
    Settled { generation: u64 },
}

/// Listings produced by one completed fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub generation: u64,
    pub records: Arc<[ServiceRecord]>,
}

/// What the presentation layer sees after every engine step.
#[derive(Debug, Clone)]
pub struct SyncSnapshot {
    pub phase: SyncPhase,
    pub loading: bool,
    pub filter: FilterState,
    /// Last published result set; survives failed fetches.
    pub results: Option<ResultSet>,
    /// Latest generation issued.
    pub issued: u64,
    /// Latest generation whose completion (success or failure) was accepted.
    pub completed: u64,
    pub stale_discarded: u64,
}

impl SyncSnapshot {
    #[must_use]
    pub fn records(&self) -> &[ServiceRecord] {
        self.results.as_ref().map_or(&[][..], |r| &*r.records)
    }

    /// Published records narrowed by the current search text.
    #[must_use]
    pub fn visible(&self) -> Vec<&ServiceRecord> {
        self.records()
            .iter()
            .filter(|record| record.matches_search(&self.filter.search_text))
            .collect()
    }

    #[must_use]
    pub fn map_view(&self) -> MapView {
        MapView::from_records(self.filter.center, self.visible())
    }
}

/// Parameters of one directory fetch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchRequest {
    pub generation: u64,
    pub distance: u32,
    pub center: GeoPoint,
}

/// How the state machine treated a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Published,
    Failed,
    Stale,
    /// Arrived after the engine was closed.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct SyncState {
    last_seen: Option<FilterState>,
    snapshot: SyncSnapshot,
    closed: bool,
}

impl SyncState {
    #[must_use]
    pub fn new(filter: FilterState) -> Self {
        Self {
            last_seen: None,
            snapshot: SyncSnapshot {
                phase: SyncPhase::Idle,
                loading: false,
                filter,
                results: None,
                issued: 0,
                completed: 0,
                stale_discarded: 0,
            },
            closed: false,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> &SyncSnapshot {
        &self.snapshot
    }

    /// Applies a filter snapshot. Returns a fetch to issue when this is the
    /// first snapshot seen or when distance or center differ from the last
    /// one; search-only changes just update the visible subset.
    pub fn on_filter(&mut self, filter: FilterState) -> Option<FetchRequest> {
        if self.closed {
            return None;
        }
        let needs_fetch = self
            .last_seen
            .as_ref()
            .is_none_or(|previous| previous.fetch_params_differ(&filter));
        self.snapshot.filter = filter.clone();
        self.last_seen = Some(filter);
        needs_fetch.then(|| self.issue())
    }

    /// Re-issues a fetch for the current filter.
    pub fn refresh(&mut self) -> Option<FetchRequest> {
        if self.closed {
            return None;
        }
        Some(self.issue())
    }

    fn issue(&mut self) -> FetchRequest {
        self.snapshot.issued += 1;
        let generation = self.snapshot.issued;
        self.snapshot.phase = SyncPhase::Fetching { generation };
        self.snapshot.loading = true;
        FetchRequest {
            generation,
            distance: self.snapshot.filter.distance,
            center: self.snapshot.filter.center,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.snapshot.issued
    }

    pub fn on_success(&mut self, generation: u64, records: Vec<ServiceRecord>) -> Completion {
        if self.closed {
            return Completion::Ignored;
        }
        if !self.is_current(generation) {
            self.snapshot.stale_discarded += 1;
            return Completion::Stale;
        }
        self.snapshot.completed = generation;
        self.snapshot.results = Some(ResultSet {
            generation,
            records: records.into(),
        });
        self.snapshot.phase = SyncPhase::Settled { generation };
        self.snapshot.loading = false;
        Completion::Published
    }

    /// A failed fetch keeps the previous result set visible.
    pub fn on_failure(&mut self, generation: u64) -> Completion {
        if self.closed {
            return Completion::Ignored;
        }
        if !self.is_current(generation) {
            self.snapshot.stale_discarded += 1;
            return Completion::Stale;
        }
        self.snapshot.completed = generation;
        self.snapshot.loading = false;
        self.snapshot.phase = self
            .snapshot
            .results
            .as_ref()
            .map_or(SyncPhase::Idle, |r| SyncPhase::Settled {
                generation: r.generation,
            });
        Completion::Failed
    }

    /// After closing, every completion is ignored and nothing is issued.
    pub fn close(&mut self) {
        self.closed = true;
        self.snapshot.loading = false;
    }
}

#[derive(Debug)]
enum Command {
    Refresh(oneshot::Sender<Option<u64>>),
    Shutdown,
}

#[derive(Debug)]
struct FetchDone {
    generation: u64,
    result: Result<Vec<ServiceRecord>, ClientError>,
}

/// Runs [`SyncState`] against a live [`FilterStore`] and directory.
pub struct SyncEngine<D> {
    directory: Arc<D>,
    notifier: Arc<dyn Notifier>,
}

impl<D: ServiceDirectory> SyncEngine<D> {
    pub fn new(directory: Arc<D>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            directory,
            notifier,
        }
    }

    /// Starts the engine task. The first fetch for the store's current state
    /// is issued immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self, filters: &FilterStore) -> EngineHandle {
        let mut filter_rx = filters.subscribe();
        let initial = filter_rx.borrow_and_update().clone();
        let mut state = SyncState::new(initial.clone());
        let first = state.on_filter(initial);

        let (snapshot_tx, snapshot_rx) = watch::channel(state.snapshot().clone());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(state, first, filter_rx, command_rx, snapshot_tx));

        EngineHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            task,
        }
    }

    async fn run(
        self,
        mut state: SyncState,
        first: Option<FetchRequest>,
        mut filters: watch::Receiver<FilterState>,
        mut commands: mpsc::UnboundedReceiver<Command>,
        snapshots: watch::Sender<SyncSnapshot>,
    ) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<FetchDone>();
        if let Some(request) = first {
            self.issue(request, &done_tx);
        }

        loop {
            tokio::select! {
                biased;

                changed = filters.changed() => {
                    if changed.is_err() {
                        tracing::debug!("filter store dropped; stopping sync engine");
                        break;
                    }
                    let next = filters.borrow_and_update().clone();
                    if let Some(request) = state.on_filter(next) {
                        self.issue(request, &done_tx);
                    }
                }
                command = commands.recv() => match command {
                    Some(Command::Refresh(reply)) => {
                        let generation = state.refresh().map(|request| {
                            let generation = request.generation;
                            self.issue(request, &done_tx);
                            generation
                        });
                        // The caller may have stopped waiting.
                        let _ = reply.send(generation);
                    }
                    Some(Command::Shutdown) | None => break,
                },
                Some(done) = done_rx.recv() => self.complete(&mut state, done),
            }
            snapshots.send_replace(state.snapshot().clone());
        }

        state.close();
        snapshots.send_replace(state.snapshot().clone());
        tracing::debug!("sync engine stopped");
    }

    fn issue(&self, request: FetchRequest, done: &mpsc::UnboundedSender<FetchDone>) {
        tracing::debug!(
            generation = request.generation,
            distance = request.distance,
            center = %request.center,
            "issuing directory fetch"
        );
        let directory = Arc::clone(&self.directory);
        let done = done.clone();
        tokio::spawn(async move {
            let result = directory
                .list_services(request.distance, request.center)
                .await;
            let completion = FetchDone {
                generation: request.generation,
                result,
            };
            if done.send(completion).is_err() {
                tracing::trace!(
                    generation = request.generation,
                    "engine stopped before fetch completed"
                );
            }
        });
    }

    fn complete(&self, state: &mut SyncState, done: FetchDone) {
        let generation = done.generation;
        match done.result {
            Ok(records) => {
                let count = records.len();
                match state.on_success(generation, records) {
                    Completion::Published => {
                        tracing::info!(generation, count, "published services");
                    }
                    Completion::Stale => {
                        tracing::debug!(generation, "discarded stale fetch result");
                    }
                    Completion::Failed | Completion::Ignored => {}
                }
            }
            Err(err) => match state.on_failure(generation) {
                Completion::Failed if err.is_unauthorized() => {
                    // The session hook has already invalidated the credential.
                    tracing::warn!(generation, "directory fetch rejected as unauthorized");
                }
                Completion::Failed => {
                    tracing::warn!(generation, error = %err, "directory fetch failed");
                    self.notifier
                        .notify("Unable to fetch services", Severity::Error);
                }
                Completion::Stale => {
                    tracing::debug!(generation, error = %err, "discarded stale fetch failure");
                }
                Completion::Published | Completion::Ignored => {}
            },
        }
    }
}

/// Handle to a running [`SyncEngine`].
#[derive(Debug)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SyncSnapshot>,
    task: JoinHandle<()>,
}

impl EngineHandle {
    #[must_use]
    pub fn snapshot(&self) -> SyncSnapshot {
        self.snapshots.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.snapshots.clone()
    }

    /// Re-fetches the current filter. Returns the issued generation, or
    /// `None` once the engine has stopped.
    pub async fn refresh(&self) -> Option<u64> {
        let (reply, response) = oneshot::channel();
        if self.commands.send(Command::Refresh(reply)).is_err() {
            return None;
        }
        response.await.ok().flatten()
    }

    /// Detached trigger for callers that cannot hold the handle.
    #[must_use]
    pub fn refresh_trigger(&self) -> RefreshTrigger {
        RefreshTrigger {
            commands: self.commands.clone(),
        }
    }

    /// Waits until no fetch is outstanding.
    pub async fn wait_idle(&self) -> SyncSnapshot {
        self.wait_until(|s| !s.loading).await
    }

    /// Waits until `generation`, or something newer, has completed.
    pub async fn wait_for_generation(&self, generation: u64) -> SyncSnapshot {
        self.wait_until(|s| s.completed >= generation).await
    }

    async fn wait_until(&self, predicate: impl FnMut(&SyncSnapshot) -> bool) -> SyncSnapshot {
        let mut rx = self.snapshots.clone();
        let result = rx.wait_for(predicate).await.map(|s| s.clone());
        result.unwrap_or_else(|_| self.snapshot())
    }

    /// Stops the engine. In-flight fetches keep running but their
    /// completions are dropped.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "sync engine task ended abnormally");
        }
    }
}

/// Fire-and-forget refresh, usable from other tasks.
#[derive(Debug, Clone)]
pub struct RefreshTrigger {
    commands: mpsc::UnboundedSender<Command>,
}

impl RefreshTrigger {
    /// Returns `false` once the engine has stopped.
    pub fn fire(&self) -> bool {
        let (reply, _) = oneshot::channel();
        self.commands.send(Command::Refresh(reply)).is_ok()
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
