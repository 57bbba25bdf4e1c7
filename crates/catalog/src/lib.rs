//! Catalog crate
//!
//! Resolves `(schema, table)` names to stream descriptions loaded from a local
//! directory and, optionally, refreshed from an object store bucket without a
//! restart.
//!
//! ```no_run
//! # async fn run() -> streamcat_catalog::Result<()> {
//! use streamcat_catalog::{CatalogContext, Settings};
//!
//! let context = CatalogContext::start(Settings::new()?).await?;
//! let tables = context.supplier().get();
//! println!("{} tables", tables.len());
//! context.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod loader;
pub mod location;
pub mod parser;
pub mod poller;
pub mod snapshot;
pub mod source;
pub mod supplier;

pub use config::Settings;
pub use context::{CatalogContext, SourceStrategy};
pub use error::{CatalogError, Result};
pub use loader::LocalDirectoryLoader;
pub use location::RemoteLocation;
pub use parser::DescriptorParser;
pub use poller::{CycleOutcome, PollerConfig, PollerState, PollerStats, RemotePoller};
pub use snapshot::{DescriptionMap, Snapshot, SnapshotOrigin, SnapshotStore};
pub use source::{DescriptorSource, LocalFileSource, ObjectEntry, ObjectStoreSource};
pub use supplier::TableDescriptionSupplier;
