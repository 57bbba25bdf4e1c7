use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Catalog key for a stream-backed table. Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaTableName {
    schema: String,
    table: String,
}

impl SchemaTableName {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Parses `schema.table`, or a bare `table` placed in `default_schema`.
    pub fn parse(name: &str, default_schema: &str) -> Result<Self> {
        let name = name.trim();
        match name.split_once('.') {
            Some((schema, table)) if !schema.is_empty() && !table.is_empty() => {
                Ok(Self::new(schema, table))
            }
            None if !name.is_empty() && !default_schema.is_empty() => {
                Ok(Self::new(default_schema, name))
            }
            _ => Err(Error::InvalidTableName(name.to_string())),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl fmt::Display for SchemaTableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// A column decoded from the stream payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescription {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mapping: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_format: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    hidden: bool,
}

impl FieldDescription {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            mapping: None,
            comment: None,
            data_format: None,
            hidden: false,
        }
    }

    pub fn with_mapping(mut self, mapping: impl Into<String>) -> Self {
        self.mapping = Some(mapping.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_data_format(mut self, data_format: impl Into<String>) -> Self {
        self.data_format = Some(data_format.into());
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type as declared in the descriptor, e.g. `varchar(64)`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Path into the decoded record, e.g. `customer/id`.
    pub fn mapping(&self) -> Option<&str> {
        self.mapping.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Per-field format hint such as a date pattern.
    pub fn data_format(&self) -> Option<&str> {
        self.data_format.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Maps the declared type onto an Arrow type.
    pub fn arrow_data_type(&self) -> Result<DataType> {
        declared_type_to_arrow(&self.type_name).ok_or_else(|| Error::UnsupportedType {
            field: self.name.clone(),
            type_name: self.type_name.clone(),
        })
    }
}

fn declared_type_to_arrow(declared: &str) -> Option<DataType> {
    let lowered = declared.trim().to_ascii_lowercase();
    let (base, args) = match lowered.split_once('(') {
        Some((base, rest)) => (base.trim(), Some(rest.trim_end_matches(')').trim())),
        None => (lowered.as_str(), None),
    };

    let data_type = match (base, args) {
        ("varchar" | "char", _) | ("json", None) => DataType::Utf8,
        ("bigint", None) => DataType::Int64,
        ("integer" | "int", None) => DataType::Int32,
        ("smallint", None) => DataType::Int16,
        ("tinyint", None) => DataType::Int8,
        ("double", None) => DataType::Float64,
        ("real", None) => DataType::Float32,
        ("boolean", None) => DataType::Boolean,
        ("date", None) => DataType::Date32,
        ("timestamp", None) => DataType::Timestamp(TimeUnit::Millisecond, None),
        ("varbinary", None) => DataType::Binary,
        ("decimal", Some(args)) => {
            let (precision, scale) = args.split_once(',').unwrap_or((args, "0"));
            let precision: u8 = precision.trim().parse().ok()?;
            let scale: i8 = scale.trim().parse().ok()?;
            if precision == 0 || precision > 38 || scale < 0 || (scale as u8) > precision {
                return None;
            }
            DataType::Decimal128(precision, scale)
        }
        _ => return None,
    };
    Some(data_type)
}

/// Ordered fields plus the serialization family of the stream payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldGroup {
    data_format: String,
    fields: Vec<FieldDescription>,
}

impl FieldGroup {
    pub fn new(data_format: impl Into<String>, fields: Vec<FieldDescription>) -> Self {
        Self {
            data_format: data_format.into(),
            fields,
        }
    }

    pub fn data_format(&self) -> &str {
        &self.data_format
    }

    pub fn fields(&self) -> &[FieldDescription] {
        &self.fields
    }
}

/// Everything a connector needs to expose a stream as a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescription {
    table_name: String,
    schema_name: String,
    stream_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<FieldGroup>,
}

impl StreamDescription {
    pub fn new(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        stream_name: impl Into<String>,
        message: Option<FieldGroup>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            schema_name: schema_name.into(),
            stream_name: stream_name.into(),
            message,
        }
    }

    /// A description with no decoded fields, reading from a stream named after the table.
    pub fn placeholder(name: &SchemaTableName) -> Self {
        Self::new(name.schema(), name.table(), name.table(), None)
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    pub fn message(&self) -> Option<&FieldGroup> {
        self.message.as_ref()
    }

    pub fn schema_table_name(&self) -> SchemaTableName {
        SchemaTableName::new(&self.schema_name, &self.table_name)
    }

    /// Builds the Arrow schema for the message fields, in declaration order.
    ///
    /// Hidden fields are left out when `hide_internal_columns` is set. A
    /// description without a message yields an empty schema.
    pub fn arrow_schema(&self, hide_internal_columns: bool) -> Result<SchemaRef> {
        let mut fields = Vec::new();
        if let Some(message) = &self.message {
            for field in message.fields() {
                if hide_internal_columns && field.is_hidden() {
                    continue;
                }
                fields.push(Field::new(field.name(), field.arrow_data_type()?, true));
            }
        }
        Ok(Arc::new(Schema::new(fields)))
    }
}
