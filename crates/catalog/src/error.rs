use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Descriptor(#[from] streamcat_common::Error),

    #[error("Failed to load configuration")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid descriptor location '{uri}': {reason}")]
    InvalidLocation { uri: String, reason: String },

    /// Nothing could be loaded from a source that the catalog depends on.
    #[error("Descriptor source {source_name} unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("Object store error")]
    ObjectStore(#[from] object_store::Error),
}

impl CatalogError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        CatalogError::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
