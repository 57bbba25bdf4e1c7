//! Remote descriptor polling.
//!
//! The poller lists a bucket prefix, parses every object, layers the result
//! over the local seed mapping and publishes it. A cycle that yields nothing
//! usable leaves the published snapshot alone, so readers keep serving the
//! last good catalog while the remote side is broken.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use streamcat_common::StreamDescription;

use crate::error::{CatalogError, Result};
use crate::parser::DescriptorParser;
use crate::snapshot::{DescriptionMap, Snapshot, SnapshotOrigin, SnapshotStore};
use crate::source::DescriptorSource;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub prefix: String,
    pub interval: Duration,
    pub initial_load_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Init,
    Loading,
    /// `stale` is set while the published snapshot predates a failed cycle.
    Ready { stale: bool },
    Refreshing,
    Stopped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollerStats {
    pub cycles: u64,
    pub refreshes: u64,
    pub stale_cycles: u64,
    pub last_error: Option<String>,
}

/// Result of one poll cycle.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Published(Arc<Snapshot>),
    /// The listing matched the previous cycle object for object.
    Unchanged,
    /// Nothing was published; the previous snapshot stays visible.
    Retained { reason: String },
}

#[derive(Debug)]
struct PollResult {
    tables: DescriptionMap,
    /// False when every listed object was reused and none disappeared.
    changed: bool,
}

/// Last parse of one object. `None` records an object that failed to parse
/// at this version, so it is not fetched again until it changes.
#[derive(Debug)]
struct CachedObject {
    version: Option<String>,
    description: Option<Arc<StreamDescription>>,
}

enum Fetched {
    Parsed(StreamDescription),
    Malformed,
    Unreadable,
}

#[derive(Debug)]
struct PollerInner {
    source: Arc<dyn DescriptorSource>,
    parser: DescriptorParser,
    config: PollerConfig,
    seed: Arc<DescriptionMap>,
    store: Arc<SnapshotStore>,
    /// Held from listing through publish, so cycles never interleave.
    cycle: Mutex<()>,
    objects: Mutex<HashMap<String, CachedObject>>,
    state: watch::Sender<PollerState>,
    stats: watch::Sender<PollerStats>,
    shutdown_token: CancellationToken,
}

/// Layers `remote` over `seed`. Whole descriptions are replaced; fields are
/// never merged across sources.
pub fn merge(seed: &DescriptionMap, remote: DescriptionMap) -> DescriptionMap {
    let mut merged = seed.clone();
    for (name, description) in remote {
        let remote_stream = description.stream_name().to_string();
        if let Some(local) = merged.insert(name.clone(), description) {
            info!(
                table = %name,
                local_stream = local.stream_name(),
                remote_stream = %remote_stream,
                "remote table description overrides local definition"
            );
        }
    }
    merged
}

#[derive(Debug)]
pub struct RemotePoller {
    inner: Arc<PollerInner>,
    handle: Option<JoinHandle<()>>,
}

impl RemotePoller {
    pub fn new(
        source: Arc<dyn DescriptorSource>,
        parser: DescriptorParser,
        config: PollerConfig,
        seed: DescriptionMap,
        store: Arc<SnapshotStore>,
    ) -> Self {
        let (state, _) = watch::channel(PollerState::Init);
        let (stats, _) = watch::channel(PollerStats::default());
        Self {
            inner: Arc::new(PollerInner {
                source,
                parser,
                config,
                seed: Arc::new(seed),
                store,
                cycle: Mutex::new(()),
                objects: Mutex::new(HashMap::new()),
                state,
                stats,
                shutdown_token: CancellationToken::new(),
            }),
            handle: None,
        }
    }

    pub fn state(&self) -> PollerState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PollerState> {
        self.inner.state.subscribe()
    }

    pub fn stats(&self) -> PollerStats {
        self.inner.stats.borrow().clone()
    }

    /// Runs the first cycle, bounded by the initial-load timeout, and
    /// publishes its result.
    ///
    /// When the remote side cannot be read in time, a non-empty seed is
    /// published on its own and the poller reports itself stale. With no
    /// seed to fall back on the failure is fatal.
    pub async fn initial_load(&self) -> Result<Arc<Snapshot>> {
        let inner = &self.inner;
        let _cycle = inner.cycle.lock().await;
        inner.state.send_replace(PollerState::Loading);

        let fetched = match tokio::time::timeout(inner.config.initial_load_timeout, inner.poll_once()).await {
            Ok(result) => result,
            Err(_) => Err(CatalogError::unavailable(
                inner.source.name(),
                format!("initial load timed out after {:?}", inner.config.initial_load_timeout),
            )),
        };
        inner.record_cycle();

        match fetched {
            Ok(PollResult { tables: candidate, .. }) => {
                let snapshot = if candidate.is_empty() && inner.seed.is_empty() {
                    info!(source = inner.source.name(), "remote source holds no table descriptions");
                    inner.store.current()
                } else {
                    inner.publish(candidate)
                };
                inner.state.send_replace(PollerState::Ready { stale: false });
                Ok(snapshot)
            }
            Err(e) if !inner.seed.is_empty() => {
                warn!(
                    source = inner.source.name(),
                    error = %e,
                    "initial remote load failed, serving local table descriptions only"
                );
                inner.record_stale(e.to_string());
                let snapshot = inner
                    .store
                    .publish(Snapshot::new(SnapshotOrigin::Local, (*inner.seed).clone()));
                inner.state.send_replace(PollerState::Ready { stale: true });
                Ok(snapshot)
            }
            Err(e) => {
                inner.record_stale(e.to_string());
                inner.state.send_replace(PollerState::Stopped);
                Err(match e {
                    e @ CatalogError::SourceUnavailable { .. } => e,
                    other => CatalogError::unavailable(inner.source.name(), other),
                })
            }
        }
    }

    /// Runs a single steady-state cycle immediately. Waits for any cycle the
    /// background task has in flight.
    pub async fn refresh(&self) -> CycleOutcome {
        self.inner.refresh().await
    }

    /// Starts ticking every `interval`, the first tick one interval from now.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let inner = Arc::clone(&self.inner);
        info!(
            source = inner.source.name(),
            prefix = %inner.config.prefix,
            interval = ?inner.config.interval,
            "starting table description poller"
        );
        self.handle = Some(tokio::spawn(async move {
            PollerInner::run(inner).await;
        }));
    }

    /// Cancels the schedule, waits for the task to exit and releases the source.
    pub async fn shutdown(mut self) {
        self.inner.shutdown_token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(source = self.inner.source.name(), error = %e, "table description poller task failed");
            }
        }
        self.inner.state.send_replace(PollerState::Stopped);
        info!(source = self.inner.source.name(), "table description poller stopped");
    }
}

impl Drop for RemotePoller {
    fn drop(&mut self) {
        self.inner.shutdown_token.cancel();
    }
}

impl PollerInner {
    async fn run(inner: Arc<PollerInner>) {
        let period = inner.config.interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        // A slow cycle should not cause back-to-back refreshes
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = inner.shutdown_token.cancelled() => {
                    debug!("poller received shutdown signal");
                    break;
                }
                _ = interval.tick() => {
                    tokio::select! {
                        _ = inner.shutdown_token.cancelled() => {
                            debug!("poller cancelled during refresh");
                            break;
                        }
                        outcome = inner.refresh() => {
                            if let CycleOutcome::Published(snapshot) = outcome {
                                debug!(generation = snapshot.generation(), tables = snapshot.len(), "published refreshed snapshot");
                            }
                        }
                    }
                }
            }
        }
    }

    async fn refresh(&self) -> CycleOutcome {
        let _cycle = self.cycle.lock().await;
        if self.shutdown_token.is_cancelled() {
            return CycleOutcome::Retained {
                reason: "poller stopped".to_string(),
            };
        }
        self.state.send_replace(PollerState::Refreshing);
        let fetched = self.poll_once().await;
        self.record_cycle();

        let reason = match fetched {
            Ok(PollResult { tables, changed }) if !tables.is_empty() => {
                if self.shutdown_token.is_cancelled() {
                    return CycleOutcome::Retained {
                        reason: "poller stopped".to_string(),
                    };
                }
                self.state.send_replace(PollerState::Ready { stale: false });
                if !changed {
                    debug!(source = self.source.name(), "remote table descriptions unchanged");
                    return CycleOutcome::Unchanged;
                }
                return CycleOutcome::Published(self.publish(tables));
            }
            Ok(_) => "no table descriptions could be parsed".to_string(),
            Err(e) => e.to_string(),
        };

        warn!(
            source = self.source.name(),
            reason = %reason,
            generation = self.store.current().generation(),
            "table description refresh failed, keeping previous snapshot"
        );
        self.record_stale(reason.clone());
        if !self.shutdown_token.is_cancelled() {
            self.state.send_replace(PollerState::Ready { stale: true });
        }
        CycleOutcome::Retained { reason }
    }

    /// Lists and parses everything under the prefix. Objects whose version is
    /// unchanged since the last cycle are reused without fetching.
    async fn poll_once(&self) -> Result<PollResult> {
        let entries = self.source.list(&self.config.prefix).await?;

        let mut objects = self.objects.lock().await;
        let mut next_objects = HashMap::with_capacity(entries.len());
        let mut candidate = DescriptionMap::new();
        let mut changed = false;

        for entry in entries.into_iter().filter(|e| !e.key.ends_with('/')) {
            let cached = objects
                .remove(&entry.key)
                .filter(|cached| entry.version.is_some() && cached.version == entry.version);

            let description = match cached {
                Some(cached) => cached.description,
                None => {
                    changed = true;
                    match self.fetch_and_parse(&entry.key).await {
                        Fetched::Parsed(description) => Some(Arc::new(description)),
                        Fetched::Malformed => None,
                        Fetched::Unreadable => continue,
                    }
                }
            };

            if let Some(description) = &description {
                let name = description.schema_table_name();
                if candidate.insert(name.clone(), Arc::clone(description)).is_some() {
                    warn!(table = %name, key = %entry.key, "table described by more than one remote object, last key wins");
                }
            }
            next_objects.insert(
                entry.key,
                CachedObject {
                    version: entry.version,
                    description,
                },
            );
        }

        // Anything left over was deleted from the bucket since the last cycle
        changed |= !objects.is_empty();
        *objects = next_objects;
        Ok(PollResult {
            tables: candidate,
            changed,
        })
    }

    async fn fetch_and_parse(&self, key: &str) -> Fetched {
        let bytes = match self.source.fetch(key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "skipping unreadable remote table description");
                return Fetched::Unreadable;
            }
        };
        match self.parser.parse(key, &bytes) {
            Ok(description) => {
                debug!(key = %key, table = %description.schema_table_name(), "fetched remote table description");
                Fetched::Parsed(description)
            }
            Err(e) => {
                warn!(error = %e, "skipping malformed remote table description");
                Fetched::Malformed
            }
        }
    }

    fn publish(&self, candidate: DescriptionMap) -> Arc<Snapshot> {
        let origin = if self.seed.is_empty() {
            SnapshotOrigin::Remote
        } else if candidate.is_empty() {
            SnapshotOrigin::Local
        } else {
            SnapshotOrigin::Merged
        };
        let merged = merge(&self.seed, candidate);
        let snapshot = self.store.publish(Snapshot::new(origin, merged));
        self.stats.send_modify(|stats| {
            stats.refreshes += 1;
            stats.last_error = None;
        });
        info!(
            generation = snapshot.generation(),
            tables = snapshot.len(),
            "published table descriptions"
        );
        snapshot
    }

    fn record_cycle(&self) {
        self.stats.send_modify(|stats| stats.cycles += 1);
    }

    fn record_stale(&self, reason: String) {
        self.stats.send_modify(|stats| {
            stats.stale_cycles += 1;
            stats.last_error = Some(reason);
        });
    }
}
