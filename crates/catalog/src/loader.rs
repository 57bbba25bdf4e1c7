use std::sync::Arc;
use tracing::{debug, info, warn};

use streamcat_common::{SchemaTableName, StreamDescription};

use crate::error::{CatalogError, Result};
use crate::parser::DescriptorParser;
use crate::snapshot::DescriptionMap;
use crate::source::DescriptorSource;

const DESCRIPTOR_EXTENSION: &str = ".json";

/// Builds the seed mapping from a directory of descriptor files.
#[derive(Debug, Clone)]
pub struct LocalDirectoryLoader {
    source: Arc<dyn DescriptorSource>,
    parser: DescriptorParser,
}

impl LocalDirectoryLoader {
    pub fn new(source: Arc<dyn DescriptorSource>, parser: DescriptorParser) -> Self {
        Self { source, parser }
    }

    /// Parses every `*.json` file in name order. Files that fail to read or
    /// parse are logged and skipped; only an unreadable directory is an error.
    pub async fn load(&self) -> Result<DescriptionMap> {
        let entries = self
            .source
            .list("")
            .await
            .map_err(|e| CatalogError::unavailable(self.source.name(), e))?;

        let mut tables = DescriptionMap::new();
        for entry in entries.iter().filter(|e| e.key.ends_with(DESCRIPTOR_EXTENSION)) {
            let bytes = match self.source.fetch(&entry.key).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(file = %entry.key, error = %e, "skipping unreadable table description");
                    continue;
                }
            };
            let description = match self.parser.parse(&entry.key, &bytes) {
                Ok(description) => description,
                Err(e) => {
                    warn!(error = %e, "skipping malformed table description");
                    continue;
                }
            };

            let name = description.schema_table_name();
            debug!(table = %name, file = %entry.key, stream = description.stream_name(), "loaded table description");
            if tables.insert(name.clone(), Arc::new(description)).is_some() {
                warn!(table = %name, file = %entry.key, "table described more than once, later file wins");
            }
        }

        info!(source = self.source.name(), tables = tables.len(), "loaded local table descriptions");
        Ok(tables)
    }
}

/// Adds placeholder descriptions for configured tables nobody described.
pub fn add_placeholders(tables: &mut DescriptionMap, names: &[SchemaTableName]) {
    for name in names {
        if !tables.contains_key(name) {
            debug!(table = %name, "adding placeholder for configured table");
            tables.insert(name.clone(), Arc::new(StreamDescription::placeholder(name)));
        }
    }
}
