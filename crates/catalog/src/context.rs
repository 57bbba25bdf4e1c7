//! Startup wiring for the catalog.
//!
//! [`CatalogContext`] is built once by the caller, owns the poller (if any)
//! and hands out [`TableDescriptionSupplier`] handles. Dropping or shutting it
//! down stops all background polling.

use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::error::{CatalogError, Result};
use crate::loader::{add_placeholders, LocalDirectoryLoader};
use crate::parser::DescriptorParser;
use crate::poller::{PollerConfig, PollerState, PollerStats, RemotePoller};
use crate::snapshot::{DescriptionMap, Snapshot, SnapshotOrigin, SnapshotStore};
use crate::source::{DescriptorSource, LocalFileSource, ObjectStoreSource};
use crate::supplier::TableDescriptionSupplier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStrategy {
    LocalOnly,
    RemoteOnly,
    LocalAndRemote,
}

impl SourceStrategy {
    fn select(local: bool, remote: bool) -> Result<Self> {
        match (local, remote) {
            (true, false) => Ok(SourceStrategy::LocalOnly),
            (false, true) => Ok(SourceStrategy::RemoteOnly),
            (true, true) => Ok(SourceStrategy::LocalAndRemote),
            (false, false) => Err(CatalogError::Config(
                "no table description source configured".to_string(),
            )),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::select(
            settings.table_description_dir.is_some(),
            settings.table_descriptions_remote.is_some(),
        )
    }
}

#[derive(Debug)]
pub struct CatalogContext {
    settings: Settings,
    strategy: SourceStrategy,
    supplier: TableDescriptionSupplier,
    poller: Option<RemotePoller>,
}

impl CatalogContext {
    /// Builds the sources named in `settings` and performs the initial load.
    pub async fn start(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let local = match &settings.table_description_dir {
            Some(dir) => Some(Arc::new(LocalFileSource::open(dir)?) as Arc<dyn DescriptorSource>),
            None => None,
        };
        let remote = match settings.remote_location()? {
            Some(location) => Some(
                Arc::new(ObjectStoreSource::for_location(&location, &settings)?) as Arc<dyn DescriptorSource>,
            ),
            None => None,
        };

        Self::start_with_sources(settings, local, remote).await
    }

    /// Starts from explicitly provided sources. The remote key prefix still
    /// comes from `table_descriptions_remote` when it is set.
    ///
    /// Returns once the first snapshot is published; with a remote source the
    /// poller keeps running in the background until [`CatalogContext::shutdown`].
    pub async fn start_with_sources(
        settings: Settings,
        local: Option<Arc<dyn DescriptorSource>>,
        remote: Option<Arc<dyn DescriptorSource>>,
    ) -> Result<Self> {
        settings.validate_options()?;
        let strategy = SourceStrategy::select(local.is_some(), remote.is_some())?;
        let parser = DescriptorParser::new(settings.default_schema.clone());

        let mut seed = match local {
            Some(source) => LocalDirectoryLoader::new(source, parser.clone()).load().await?,
            None => DescriptionMap::new(),
        };
        add_placeholders(&mut seed, &settings.configured_table_names()?);

        let store = Arc::new(SnapshotStore::new());
        let poller = match remote {
            Some(source) => {
                let prefix = settings
                    .remote_location()?
                    .map(|location| location.prefix().to_string())
                    .unwrap_or_default();
                let config = PollerConfig {
                    prefix,
                    interval: settings.poll_interval(),
                    initial_load_timeout: settings.initial_load_timeout(),
                };
                let mut poller = RemotePoller::new(source, parser, config, seed, Arc::clone(&store));
                poller.initial_load().await?;
                poller.start();
                Some(poller)
            }
            None => {
                if !seed.is_empty() {
                    store.publish(Snapshot::new(SnapshotOrigin::Local, seed));
                }
                None
            }
        };

        info!(
            strategy = ?strategy,
            tables = store.current().len(),
            "table description catalog ready"
        );
        Ok(Self {
            settings,
            strategy,
            supplier: TableDescriptionSupplier::new(store),
            poller,
        })
    }

    pub fn supplier(&self) -> TableDescriptionSupplier {
        self.supplier.clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn strategy(&self) -> SourceStrategy {
        self.strategy
    }

    /// Passed through to consumers; the catalog itself does not act on it.
    pub fn hide_internal_columns(&self) -> bool {
        self.settings.hide_internal_columns
    }

    pub fn poller_state(&self) -> Option<PollerState> {
        self.poller.as_ref().map(RemotePoller::state)
    }

    pub fn poller_stats(&self) -> Option<PollerStats> {
        self.poller.as_ref().map(RemotePoller::stats)
    }

    pub async fn shutdown(self) {
        if let Some(poller) = self.poller {
            poller.shutdown().await;
        }
    }
}
