//! Published catalog snapshots.
//!
//! A [`Snapshot`] is built completely before it is handed to the
//! [`SnapshotStore`], which swaps it in as a single `Arc`. Readers clone the
//! `Arc` and keep a consistent view for as long as they hold it.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

use streamcat_common::{SchemaTableName, StreamDescription};

pub type DescriptionMap = HashMap<SchemaTableName, Arc<StreamDescription>>;

/// Which sources contributed to a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    Empty,
    Local,
    Remote,
    Merged,
}

#[derive(Debug)]
pub struct Snapshot {
    generation: u64,
    origin: SnapshotOrigin,
    built_at: DateTime<Utc>,
    tables: DescriptionMap,
}

impl Snapshot {
    pub fn new(origin: SnapshotOrigin, tables: DescriptionMap) -> Self {
        Self {
            generation: 0,
            origin,
            built_at: Utc::now(),
            tables,
        }
    }

    pub fn empty() -> Self {
        Self::new(SnapshotOrigin::Empty, DescriptionMap::new())
    }

    /// Zero until published; each publication increments it.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn origin(&self) -> SnapshotOrigin {
        self.origin
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn tables(&self) -> &DescriptionMap {
        &self.tables
    }

    pub fn get(&self, name: &SchemaTableName) -> Option<&Arc<StreamDescription>> {
        self.tables.get(name)
    }

    pub fn contains(&self, name: &SchemaTableName) -> bool {
        self.tables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SchemaTableName, &Arc<StreamDescription>)> {
        self.tables.iter()
    }
}

/// Holds the visible snapshot. One writer publishes, any number of readers
/// call [`SnapshotStore::current`].
#[derive(Debug)]
pub struct SnapshotStore {
    tx: watch::Sender<Arc<Snapshot>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// Starts out holding an empty snapshot at generation 0.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Snapshot::empty()));
        Self { tx }
    }

    /// Replaces the visible snapshot and returns it with its generation assigned.
    pub fn publish(&self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        let mut published = None;
        self.tx.send_modify(|current| {
            snapshot.generation = current.generation + 1;
            let next = Arc::new(snapshot);
            published = Some(Arc::clone(&next));
            *current = next;
        });
        published.unwrap_or_else(|| self.current())
    }

    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.tx.borrow())
    }

    /// Receiver that is marked changed on every publication.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn snapshot_with(streams: &[(&str, &str)], stream_suffix: &str) -> Snapshot {
        let tables = streams
            .iter()
            .map(|(schema, table)| {
                let name = SchemaTableName::new(*schema, *table);
                let description = StreamDescription::new(
                    *schema,
                    *table,
                    format!("{}_{}", table, stream_suffix),
                    None,
                );
                (name, Arc::new(description))
            })
            .collect();
        Snapshot::new(SnapshotOrigin::Local, tables)
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = SnapshotStore::new();
        let current = store.current();
        assert!(current.is_empty());
        assert_eq!(current.generation(), 0);
        assert_eq!(current.origin(), SnapshotOrigin::Empty);
    }

    #[test]
    fn test_publish_replaces_and_bumps_generation() {
        let store = SnapshotStore::new();
        let held = store.current();

        let published = store.publish(snapshot_with(&[("prod", "a"), ("prod", "b")], "v1"));
        assert_eq!(published.generation(), 1);
        assert_eq!(store.current().len(), 2);
        assert!(held.is_empty(), "earlier readers keep their snapshot");

        store.publish(snapshot_with(&[("prod", "a")], "v2"));
        let current = store.current();
        assert_eq!(current.generation(), 2);
        assert_eq!(
            current.get(&SchemaTableName::new("prod", "a")).unwrap().stream_name(),
            "a_v2"
        );
        assert!(!current.contains(&SchemaTableName::new("prod", "b")));
    }

    #[tokio::test]
    async fn test_subscribers_see_publications() {
        let store = SnapshotStore::new();
        let mut rx = store.subscribe();
        store.publish(snapshot_with(&[("prod", "a")], "v1"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().generation(), 1);
    }

    #[test]
    fn test_concurrent_readers_never_see_mixed_snapshots() {
        let tables: Vec<(String, String)> = (0..50)
            .map(|i| ("prod".to_string(), format!("t{}", i)))
            .collect();
        let names: Vec<(&str, &str)> = tables.iter().map(|(s, t)| (s.as_str(), t.as_str())).collect();

        let store = Arc::new(SnapshotStore::new());
        store.publish(snapshot_with(&names, "gen0"));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let snapshot = store.current();
                        assert_eq!(snapshot.len(), 50);
                        let suffixes: std::collections::HashSet<&str> = snapshot
                            .iter()
                            .map(|(_, d)| d.stream_name().rsplit('_').next().unwrap_or(""))
                            .collect();
                        assert_eq!(suffixes.len(), 1, "snapshot mixes generations: {:?}", suffixes);
                    }
                })
            })
            .collect();

        for generation in 1..200 {
            store.publish(snapshot_with(&names, &format!("gen{}", generation)));
        }

        for reader in readers {
            reader.join().expect("reader panicked");
        }
        assert_eq!(store.current().generation(), 200);
    }
}
