//! Configuration manager for postwall.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::adapters::identity_toolkit::DEFAULT_ENDPOINT;
use crate::domain::DEFAULT_DATE_FORMAT;
use crate::gateway::post::DEFAULT_COLLECTION;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_LOG_FILTER: &str = "info";
const API_KEY_ENV: &str = "IDENTITY_API_KEY";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors raised while reading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL `{url}`: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Collection holding posts.
    pub posts_collection: String,
    /// `strftime` format of post creation dates.
    pub date_format: String,
    #[serde(skip_deserializing)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to identity provider configuration.
    #[serde(skip_serializing)]
    pub identity: Option<Identity>,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to logging.
    pub log: Log,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: "postwall".into(),
            posts_collection: DEFAULT_COLLECTION.into(),
            date_format: DEFAULT_DATE_FORMAT.into(),
            version: VERSION.to_owned(),
            path: PathBuf::default(),
            identity: None,
            postgres: None,
            log: Log::default(),
        }
    }
}

/// Identity Toolkit configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Project API key. `IDENTITY_API_KEY` takes precedence.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL of the REST API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Tenant on multi-tenant projects.
    pub tenant_id: Option<String>,
    /// URI reported to federated providers.
    pub request_uri: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_owned()
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    /// `tracing` filter directive. `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(url: &str) -> Result<String, ConfigError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url =
            Url::parse(&url_with_scheme).map_err(|source| ConfigError::Url {
                url: url.to_owned(),
                source,
            })?;
        Ok(parsed_url.to_string().trim_end_matches('/').to_owned())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Arc<Self>, ConfigError> {
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        let config = match File::open(file_path) {
            Ok(file) => {
                match serde_yaml::from_reader::<_, Configuration>(file) {
                    Ok(config) => config,
                    Err(err) => self.error(err),
                }
            },
            Err(err) => self.error(err),
        };

        Ok(Arc::new(config.finish(std::env::var(API_KEY_ENV).ok())?))
    }

    /// Apply environment overrides and normalize URLs.
    fn finish(mut self, api_key: Option<String>) -> Result<Self, ConfigError> {
        self.version = VERSION.to_owned();

        if let Some(key) = api_key.filter(|key| !key.is_empty()) {
            let identity = self.identity.get_or_insert_with(|| Identity {
                api_key: None,
                endpoint: default_endpoint(),
                tenant_id: None,
                request_uri: None,
            });
            identity.api_key = Some(key);
        }

        if let Some(identity) = self.identity.as_mut() {
            identity.api_key =
                identity.api_key.take().filter(|key| !key.is_empty());
            identity.endpoint = Self::normalize_url(&identity.endpoint)?;
            identity.request_uri = identity
                .request_uri
                .as_deref()
                .map(Self::normalize_url)
                .transpose()?;
        }

        Ok(self)
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(
            error = %err,
            "`config.yaml` file not found or invalid"
        );
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_partial_file() {
        let config: Configuration =
            serde_yaml::from_str("name: blog\n").unwrap();

        assert_eq!(config.name, "blog");
        assert_eq!(config.posts_collection, "posts");
        assert_eq!(config.date_format, "%d/%m/%Y");
        assert_eq!(config.log.filter, "info");
        assert!(config.identity.is_none());
        assert!(config.postgres.is_none());
    }

    #[test]
    fn test_identity_section() {
        let config: Configuration = serde_yaml::from_str(
            r#"
identity:
  api_key: abc
  endpoint: localhost:9099/identitytoolkit.googleapis.com/v1
postgres:
  address: localhost:5432
  pool_size: 4
"#,
        )
        .unwrap();
        let config = config.finish(None).unwrap();

        let identity = config.identity.unwrap();
        assert_eq!(identity.api_key.as_deref(), Some("abc"));
        assert_eq!(
            identity.endpoint,
            "https://localhost:9099/identitytoolkit.googleapis.com/v1"
        );
        assert_eq!(config.postgres.unwrap().pool_size, Some(4));
    }

    #[test]
    fn test_env_api_key_wins() {
        let config = Configuration::default()
            .finish(Some("from-env".into()))
            .unwrap();

        let identity = config.identity.unwrap();
        assert_eq!(identity.api_key.as_deref(), Some("from-env"));
        assert_eq!(identity.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_empty_api_key_is_unset() {
        let config: Configuration =
            serde_yaml::from_str("identity:\n  api_key: \"\"\n").unwrap();
        let config = config.finish(None).unwrap();

        assert_eq!(config.identity.unwrap().api_key, None);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = Configuration::default()
            .path(PathBuf::from("does/not/exist.yaml"))
            .read()
            .unwrap();

        assert_eq!(config.posts_collection, "posts");
        assert_eq!(config.version(), VERSION);
        assert!(config.postgres.is_none());
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut config = Configuration::default();
        config.identity = Some(Identity {
            api_key: None,
            endpoint: "http://[::1".into(),
            tenant_id: None,
            request_uri: None,
        });

        assert!(matches!(config.finish(None), Err(ConfigError::Url { .. })));
    }
}
