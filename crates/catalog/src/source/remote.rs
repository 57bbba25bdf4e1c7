use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{path::Path as ObjectPath, ObjectStore};
use std::sync::Arc;

use super::{DescriptorSource, ObjectEntry};
use crate::config::Settings;
use crate::error::Result;
use crate::location::RemoteLocation;

/// Descriptors kept in an object store bucket.
#[derive(Debug, Clone)]
pub struct ObjectStoreSource {
    name: String,
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreSource {
    pub fn new(name: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// Builds the store for a configured location. S3 credentials and region
    /// come from the standard `AWS_*` environment variables.
    pub fn for_location(location: &RemoteLocation, settings: &Settings) -> Result<Self> {
        let store: Arc<dyn ObjectStore> = match location {
            RemoteLocation::S3 { bucket, .. } => {
                let mut builder = AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .with_allow_http(settings.remote_allow_http);
                if let Some(endpoint) = &settings.remote_endpoint {
                    // S3-compatible stores such as MinIO want path-style requests
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_virtual_hosted_style_request(false);
                }
                Arc::new(builder.build()?)
            }
            RemoteLocation::Memory { .. } => Arc::new(InMemory::new()),
            RemoteLocation::File { root } => Arc::new(LocalFileSystem::new_with_prefix(root)?),
        };
        Ok(Self::new(location.to_string(), store))
    }
}

#[async_trait]
impl DescriptorSource for ObjectStoreSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>> {
        let prefix = (!prefix.is_empty()).then(|| ObjectPath::from(prefix));
        let mut entries: Vec<ObjectEntry> = self
            .store
            .list(prefix.as_ref())
            .map_ok(|meta| ObjectEntry {
                key: meta.location.to_string(),
                version: meta
                    .e_tag
                    .or_else(|| Some(meta.last_modified.to_rfc3339())),
            })
            .try_collect()
            .await?;
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let path = ObjectPath::from(key);
        let result = self.store.get(&path).await?;
        let bytes = result.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_under_prefix() {
        let store = Arc::new(InMemory::new());
        store
            .put(&ObjectPath::from("descriptors/b.json"), "b".into())
            .await
            .unwrap();
        store
            .put(&ObjectPath::from("descriptors/a.json"), "a".into())
            .await
            .unwrap();
        store
            .put(&ObjectPath::from("other/c.json"), "c".into())
            .await
            .unwrap();

        let source = ObjectStoreSource::new("memory", store);
        let entries = source.list("descriptors").await.unwrap();
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["descriptors/a.json", "descriptors/b.json"]);
        assert!(entries.iter().all(|e| e.version.is_some()));

        assert_eq!(source.list("").await.unwrap().len(), 3);
        assert_eq!(source.fetch("other/c.json").await.unwrap(), b"c".to_vec());
    }

    #[tokio::test]
    async fn test_memory_location_starts_empty() {
        let location = RemoteLocation::parse("memory://descriptors").unwrap();
        let source = ObjectStoreSource::for_location(&location, &Settings::default()).unwrap();
        assert_eq!(source.name(), "memory://descriptors");
        assert!(source.list(location.prefix()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_missing_object() {
        let source = ObjectStoreSource::new("memory", Arc::new(InMemory::new()));
        assert!(source.fetch("missing.json").await.is_err());
    }

    #[tokio::test]
    async fn test_version_changes_on_overwrite() {
        let store = Arc::new(InMemory::new());
        let path = ObjectPath::from("t.json");
        store.put(&path, "one".into()).await.unwrap();
        let source = ObjectStoreSource::new("memory", store.clone());
        let first = source.list("").await.unwrap()[0].version.clone();

        store.put(&path, "two".into()).await.unwrap();
        let second = source.list("").await.unwrap()[0].version.clone();
        assert_ne!(first, second);
    }
}
