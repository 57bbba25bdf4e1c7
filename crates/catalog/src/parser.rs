//! Descriptor parsing and validation.
//!
//! A descriptor is one JSON document per file or object:
//!
//! ```json
//! {
//!   "tableName": "test_table",
//!   "schemaName": "prod",
//!   "streamName": "test_kinesis_stream",
//!   "message": {
//!     "dataFormat": "json",
//!     "fields": [{ "name": "id", "type": "bigint", "mapping": "id" }]
//!   }
//! }
//! ```

use serde::Deserialize;
use std::collections::HashSet;

use streamcat_common::{Error, FieldDescription, FieldGroup, Result, StreamDescription};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    table_name: Option<String>,
    schema_name: Option<String>,
    stream_name: Option<String>,
    message: Option<RawFieldGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFieldGroup {
    data_format: Option<String>,
    #[serde(default)]
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawField {
    name: Option<String>,
    #[serde(rename = "type")]
    type_name: Option<String>,
    mapping: Option<String>,
    comment: Option<String>,
    data_format: Option<String>,
    #[serde(default)]
    hidden: bool,
}

fn required(value: Option<String>, key: &str, what: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::malformed(key, format!("missing or empty {}", what))),
    }
}

/// Turns descriptor bytes into validated stream descriptions.
#[derive(Debug, Clone)]
pub struct DescriptorParser {
    default_schema: String,
}

impl DescriptorParser {
    pub fn new(default_schema: impl Into<String>) -> Self {
        Self {
            default_schema: default_schema.into(),
        }
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    /// Parses one descriptor. `key` names the file or object in errors.
    pub fn parse(&self, key: &str, bytes: &[u8]) -> Result<StreamDescription> {
        let raw: RawDescriptor =
            serde_json::from_slice(bytes).map_err(|e| Error::malformed(key, e.to_string()))?;

        let table_name = required(raw.table_name, key, "tableName")?;
        let stream_name = required(raw.stream_name, key, "streamName")?;
        let schema_name = raw
            .schema_name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.default_schema.clone());

        let message = raw
            .message
            .map(|group| Self::parse_field_group(key, group))
            .transpose()?;

        Ok(StreamDescription::new(schema_name, table_name, stream_name, message))
    }

    fn parse_field_group(key: &str, group: RawFieldGroup) -> Result<FieldGroup> {
        let data_format = required(group.data_format, key, "message.dataFormat")?;
        if group.fields.is_empty() {
            return Err(Error::malformed(key, "message declares no fields"));
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(group.fields.len());
        for (position, raw) in group.fields.into_iter().enumerate() {
            let name = required(raw.name, key, &format!("name for field {}", position))?;
            let type_name = required(raw.type_name, key, &format!("type for field {}", name))?;
            if !seen.insert(name.clone()) {
                return Err(Error::malformed(key, format!("duplicate field name '{}'", name)));
            }

            let mut field = FieldDescription::new(name, type_name).with_hidden(raw.hidden);
            if let Some(mapping) = raw.mapping {
                field = field.with_mapping(mapping);
            }
            if let Some(comment) = raw.comment {
                field = field.with_comment(comment);
            }
            if let Some(data_format) = raw.data_format {
                field = field.with_data_format(data_format);
            }
            fields.push(field);
        }

        Ok(FieldGroup::new(data_format, fields))
    }

    /// Writes a description back out in descriptor form.
    pub fn to_json(description: &StreamDescription) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(description)
            .map_err(|e| Error::malformed(description.schema_table_name().to_string(), e.to_string()))
    }
}
