//! Storage capability the loader and poller read descriptors through.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::Result;

pub mod local;
pub mod remote;

pub use local::LocalFileSource;
pub use remote::ObjectStoreSource;

/// One listed descriptor object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    /// Opaque change marker (entity tag or modification stamp), if the store reports one.
    pub version: Option<String>,
}

#[async_trait]
pub trait DescriptorSource: Send + Sync + Debug {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Lists objects under `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>>;

    async fn fetch(&self, key: &str) -> Result<Vec<u8>>;
}
