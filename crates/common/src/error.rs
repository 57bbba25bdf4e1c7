use thiserror::Error;

/// Unified error type for stream descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("malformed descriptor {key}: {cause}")]
    MalformedDescriptor { key: String, cause: String },

    #[error("unsupported type '{type_name}' for field {field}")]
    UnsupportedType { field: String, type_name: String },

    #[error("invalid table name '{0}', expected schema.table or table")]
    InvalidTableName(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn malformed(key: impl Into<String>, cause: impl Into<String>) -> Self {
        Error::MalformedDescriptor {
            key: key.into(),
            cause: cause.into(),
        }
    }
}
