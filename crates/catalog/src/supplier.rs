use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;

use streamcat_common::{SchemaTableName, StreamDescription};

use crate::snapshot::{Snapshot, SnapshotStore};

/// Read-only view of the catalog handed to connector code.
///
/// Cheap to clone; every clone reads the same store.
#[derive(Debug, Clone)]
pub struct TableDescriptionSupplier {
    store: Arc<SnapshotStore>,
}

impl TableDescriptionSupplier {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    /// The snapshot published most recently. Never blocks on a refresh.
    pub fn get(&self) -> Arc<Snapshot> {
        self.store.current()
    }

    pub fn describe(&self, name: &SchemaTableName) -> Option<Arc<StreamDescription>> {
        self.get().get(name).cloned()
    }

    pub fn table_names(&self) -> Vec<SchemaTableName> {
        let mut names: Vec<SchemaTableName> = self.get().tables().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn schema_names(&self) -> Vec<String> {
        self.get()
            .tables()
            .keys()
            .map(|name| name.schema().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.store.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{DescriptionMap, SnapshotOrigin};

    fn supplier_with(names: &[(&str, &str)]) -> TableDescriptionSupplier {
        let store = Arc::new(SnapshotStore::new());
        let tables: DescriptionMap = names
            .iter()
            .map(|(schema, table)| {
                let name = SchemaTableName::new(*schema, *table);
                (name.clone(), Arc::new(StreamDescription::placeholder(&name)))
            })
            .collect();
        store.publish(Snapshot::new(SnapshotOrigin::Local, tables));
        TableDescriptionSupplier::new(store)
    }

    #[test]
    fn test_get_before_any_publication_is_empty() {
        let supplier = TableDescriptionSupplier::new(Arc::new(SnapshotStore::new()));
        assert!(supplier.get().is_empty());
        assert!(supplier.table_names().is_empty());
    }

    #[test]
    fn test_lookups() {
        let supplier = supplier_with(&[("prod", "orders"), ("dev", "orders"), ("prod", "clicks")]);

        assert_eq!(
            supplier.table_names(),
            vec![
                SchemaTableName::new("dev", "orders"),
                SchemaTableName::new("prod", "clicks"),
                SchemaTableName::new("prod", "orders"),
            ]
        );
        assert_eq!(supplier.schema_names(), vec!["dev".to_string(), "prod".to_string()]);
        assert_eq!(
            supplier
                .describe(&SchemaTableName::new("prod", "clicks"))
                .unwrap()
                .stream_name(),
            "clicks"
        );
        assert!(supplier.describe(&SchemaTableName::new("PROD", "clicks")).is_none());
    }

    #[test]
    fn test_clones_share_the_store() {
        let store = Arc::new(SnapshotStore::new());
        let supplier = TableDescriptionSupplier::new(Arc::clone(&store));
        let clone = supplier.clone();
        store.publish(Snapshot::new(SnapshotOrigin::Remote, DescriptionMap::new()));
        assert_eq!(clone.get().generation(), 1);
        assert_eq!(supplier.get().origin(), SnapshotOrigin::Remote);
    }
}
