use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use streamcat_common::SchemaTableName;

use crate::error::{CatalogError, Result};
use crate::location::RemoteLocation;

const DEFAULT_CONFIG_PATH: &str = "crates/streamcat/config/default.toml";
const ENV_PREFIX: &str = "STREAMCAT";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Directory of `*.json` descriptors loaded once at startup.
    #[serde(default)]
    pub table_description_dir: Option<PathBuf>,
    /// Remote descriptor location, polled on `poll_interval_secs`.
    #[serde(default)]
    pub table_descriptions_remote: Option<String>,
    #[serde(default = "default_schema")]
    pub default_schema: String,
    #[serde(default = "default_hide_internal_columns")]
    pub hide_internal_columns: bool,
    /// Tables exposed even without a descriptor, as `schema.table` or `table`.
    #[serde(default)]
    pub table_names: Vec<String>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_initial_load_timeout_secs")]
    pub initial_load_timeout_secs: u64,
    #[serde(default)]
    pub remote_endpoint: Option<String>,
    #[serde(default)]
    pub remote_allow_http: bool,
}

fn default_schema() -> String {
    "default".to_string()
}

fn default_hide_internal_columns() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_initial_load_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            table_description_dir: None,
            table_descriptions_remote: None,
            default_schema: default_schema(),
            hide_internal_columns: default_hide_internal_columns(),
            table_names: Vec::new(),
            poll_interval_secs: default_poll_interval_secs(),
            initial_load_timeout_secs: default_initial_load_timeout_secs(),
            remote_endpoint: None,
            remote_allow_http: false,
        }
    }
}

impl Settings {
    /// Loads `STREAMCAT_CONFIG_PATH` (or `crates/streamcat/config/default.toml` when present),
    /// overridden by `STREAMCAT__*` environment variables.
    pub fn new() -> std::result::Result<Self, config::ConfigError> {
        match std::env::var("STREAMCAT_CONFIG_PATH") {
            Ok(path) => Self::load(config::File::with_name(&path).required(true)),
            Err(_) => Self::load(config::File::with_name(DEFAULT_CONFIG_PATH).required(false)),
        }
    }

    pub fn from_file(path: &Path) -> std::result::Result<Self, config::ConfigError> {
        Self::load(config::File::from(path).required(true))
    }

    pub fn from_toml(contents: &str) -> std::result::Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn load<T>(file: T) -> std::result::Result<Self, config::ConfigError>
    where
        T: config::Source + Send + Sync + 'static,
    {
        let s = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("table_names"),
            )
            .build()?;
        s.try_deserialize()
    }

    /// Checks everything, including that at least one descriptor source is configured.
    pub fn validate(&self) -> Result<()> {
        if self.table_description_dir.is_none() && self.table_descriptions_remote.is_none() {
            return Err(CatalogError::Config(
                "either table_description_dir or table_descriptions_remote must be set".to_string(),
            ));
        }
        self.validate_options()
    }

    /// Checks option values without requiring a configured source.
    pub fn validate_options(&self) -> Result<()> {
        if self.default_schema.trim().is_empty() {
            return Err(CatalogError::Config("default_schema must not be empty".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(CatalogError::Config("poll_interval_secs must be positive".to_string()));
        }
        if self.initial_load_timeout_secs == 0 {
            return Err(CatalogError::Config(
                "initial_load_timeout_secs must be positive".to_string(),
            ));
        }
        self.remote_location()?;
        self.configured_table_names()?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn initial_load_timeout(&self) -> Duration {
        Duration::from_secs(self.initial_load_timeout_secs)
    }

    pub fn remote_location(&self) -> Result<Option<RemoteLocation>> {
        self.table_descriptions_remote
            .as_deref()
            .map(RemoteLocation::parse)
            .transpose()
    }

    pub fn configured_table_names(&self) -> Result<Vec<SchemaTableName>> {
        let names = self
            .table_names
            .iter()
            .map(|name| SchemaTableName::parse(name, &self.default_schema))
            .collect::<streamcat_common::Result<Vec<_>>>()?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let settings = Settings::from_toml(r#"table_description_dir = "etc/streamcat""#).unwrap();
        assert_eq!(settings.table_description_dir, Some(PathBuf::from("etc/streamcat")));
        assert_eq!(settings.default_schema, "default");
        assert!(settings.hide_internal_columns);
        assert_eq!(settings.poll_interval(), Duration::from_secs(60));
        assert_eq!(settings.initial_load_timeout(), Duration::from_secs(30));
        assert!(settings.table_names.is_empty());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_full_settings() {
        let settings = Settings::from_toml(
            r#"
            table_description_dir = "etc/kinesis"
            table_descriptions_remote = "s3://stitchfix.aa.config/unit-test/presto-kinesis"
            default_schema = "kinesis"
            hide_internal_columns = false
            table_names = ["prod.clicks", "views"]
            poll_interval_secs = 5
            initial_load_timeout_secs = 2
            "#,
        )
        .unwrap();

        assert!(settings.validate().is_ok());
        assert!(!settings.hide_internal_columns);
        assert_eq!(settings.remote_location().unwrap().unwrap().prefix(), "unit-test/presto-kinesis");
        assert_eq!(
            settings.configured_table_names().unwrap(),
            vec![
                SchemaTableName::new("prod", "clicks"),
                SchemaTableName::new("kinesis", "views"),
            ]
        );
    }

    #[test]
    fn test_validate_requires_a_source() {
        let settings = Settings::default();
        assert!(matches!(settings.validate(), Err(CatalogError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings {
            table_description_dir: Some(PathBuf::from("etc")),
            ..Settings::default()
        };
        settings.poll_interval_secs = 0;
        assert!(settings.validate().is_err());

        settings.poll_interval_secs = 10;
        settings.table_descriptions_remote = Some("ftp://host/path".to_string());
        assert!(matches!(settings.validate(), Err(CatalogError::InvalidLocation { .. })));

        settings.table_descriptions_remote = None;
        settings.table_names = vec!["schema.".to_string()];
        assert!(matches!(settings.validate(), Err(CatalogError::Descriptor(_))));
    }
}
