use std::fmt;
use std::path::PathBuf;
use url::Url;

use crate::error::{CatalogError, Result};

/// Where remote descriptors live, parsed from a `s3://bucket/prefix`,
/// `memory://prefix` or `file:///dir` URI.
///
/// A memory location starts out empty and lives only as long as the process.
/// It is meant for local runs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteLocation {
    S3 { bucket: String, prefix: String },
    Memory { prefix: String },
    File { root: PathBuf },
}

impl RemoteLocation {
    pub fn parse(uri: &str) -> Result<Self> {
        let invalid = |reason: &str| CatalogError::InvalidLocation {
            uri: uri.to_string(),
            reason: reason.to_string(),
        };
        let url = Url::parse(uri).map_err(|e| invalid(&e.to_string()))?;

        match url.scheme() {
            "s3" => {
                let bucket = url
                    .host_str()
                    .filter(|host| !host.is_empty())
                    .ok_or_else(|| invalid("missing bucket"))?;
                let prefix = url.path().trim_matches('/');
                Ok(RemoteLocation::S3 {
                    bucket: bucket.to_string(),
                    prefix: prefix.to_string(),
                })
            }
            "memory" => {
                let prefix = format!("{}{}", url.host_str().unwrap_or(""), url.path());
                Ok(RemoteLocation::Memory {
                    prefix: prefix.trim_matches('/').to_string(),
                })
            }
            "file" => {
                let root = url
                    .to_file_path()
                    .map_err(|_| invalid("not an absolute file path"))?;
                Ok(RemoteLocation::File { root })
            }
            other => Err(invalid(&format!("unsupported scheme '{}'", other))),
        }
    }

    /// Key prefix to list under; file locations list their whole root.
    pub fn prefix(&self) -> &str {
        match self {
            RemoteLocation::S3 { prefix, .. } | RemoteLocation::Memory { prefix } => prefix,
            RemoteLocation::File { .. } => "",
        }
    }
}

impl fmt::Display for RemoteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteLocation::S3 { bucket, prefix } if prefix.is_empty() => write!(f, "s3://{}", bucket),
            RemoteLocation::S3 { bucket, prefix } => write!(f, "s3://{}/{}", bucket, prefix),
            RemoteLocation::Memory { prefix } => write!(f, "memory://{}", prefix),
            RemoteLocation::File { root } => write!(f, "file://{}", root.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s3_uri_values() {
        let cases = [
            ("s3://our.data.warehouse/prod/client_actions", "our.data.warehouse", "prod/client_actions"),
            ("s3://some.big.bucket/long/complex/path", "some.big.bucket", "long/complex/path"),
            ("s3://stitchfix.aa.config/unit-test/presto-kinesis", "stitchfix.aa.config", "unit-test/presto-kinesis"),
        ];
        for (uri, bucket, prefix) in cases {
            let location = RemoteLocation::parse(uri).unwrap();
            assert_eq!(
                location,
                RemoteLocation::S3 {
                    bucket: bucket.to_string(),
                    prefix: prefix.to_string()
                }
            );
            assert_eq!(location.prefix(), prefix);
            assert_eq!(location.to_string(), uri);
        }
    }

    #[test]
    fn test_s3_uri_without_prefix() {
        let location = RemoteLocation::parse("s3://descriptors/").unwrap();
        assert_eq!(location.prefix(), "");
        assert_eq!(location.to_string(), "s3://descriptors");
    }

    #[test]
    fn test_file_uri() {
        let location = RemoteLocation::parse("file:///var/lib/streamcat").unwrap();
        assert_eq!(
            location,
            RemoteLocation::File {
                root: PathBuf::from("/var/lib/streamcat")
            }
        );
        assert_eq!(location.prefix(), "");
    }

    #[test]
    fn test_memory_uri() {
        let location = RemoteLocation::parse("memory://descriptors/prefix").unwrap();
        assert_eq!(
            location,
            RemoteLocation::Memory {
                prefix: "descriptors/prefix".to_string()
            }
        );
        assert_eq!(location.prefix(), "descriptors/prefix");
        assert_eq!(location.to_string(), "memory://descriptors/prefix");

        assert_eq!(RemoteLocation::parse("memory://").unwrap().prefix(), "");
    }

    #[test]
    fn test_invalid_locations() {
        assert!(matches!(
            RemoteLocation::parse("gs://bucket/prefix"),
            Err(CatalogError::InvalidLocation { .. })
        ));
        assert!(RemoteLocation::parse("not a uri").is_err());
        assert!(RemoteLocation::parse("s3:///prefix-only").is_err());
    }
}
