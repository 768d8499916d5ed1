//! Connection settings for the Cosmos DB account.
//!
//! Settings are loaded from (in priority order):
//! 1. Environment variables (`AzureCosmosDb__Endpoint`, `AzureCosmosDb__AuthKey`, ...)
//! 2. The settings file (`appsettings.json` in the working directory)
//!
//! The file nests every key under an `AzureCosmosDb` object:
//!
//! ```json
//! {
//!   "AzureCosmosDb": {
//!     "Endpoint": "https://my-account.documents.azure.com:443/",
//!     "AuthKey": "<primary key>",
//!     "DatabaseName": "graphdb",
//!     "GraphName": "Persons",
//!     "OfferThroughput": 400
//!   }
//! }
//! ```

use std::fmt;
use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

/// Default settings file, resolved against the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "appsettings.json";

/// Section every setting lives under.
pub const SECTION: &str = "AzureCosmosDb";

/// Partition key used when the settings do not name one.
pub const DEFAULT_PARTITION_KEY_PATH: &str = "/pk";

/// Vertex properties the Gremlin API will not partition on.
const RESERVED_PARTITION_KEYS: [&str; 2] = ["id", "label"];

/// Typed connection settings.
///
/// Built once at startup and handed by reference to whatever needs it.
/// `Debug` never prints the auth key.
#[derive(Clone, PartialEq, Eq)]
pub struct CosmosSettings {
    /// Account endpoint, e.g. `https://my-account.documents.azure.com:443/`.
    pub endpoint: String,
    /// Primary or secondary master key (base64).
    pub auth_key: String,
    pub database_name: String,
    pub graph_name: String,
    /// Request units per second requested when the graph container is created.
    pub offer_throughput: u32,
    /// Explicit Gremlin WebSocket endpoint; derived from `endpoint` when absent.
    pub gremlin_endpoint: Option<String>,
    /// Partition key path for a newly created graph container.
    pub partition_key_path: String,
}

impl fmt::Debug for CosmosSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosmosSettings")
            .field("endpoint", &self.endpoint)
            .field("auth_key", &"<redacted>")
            .field("database_name", &self.database_name)
            .field("graph_name", &self.graph_name)
            .field("offer_throughput", &self.offer_throughput)
            .field("gremlin_endpoint", &self.gremlin_endpoint)
            .field("partition_key_path", &self.partition_key_path)
            .finish()
    }
}

/// The section as written, before validation.
///
/// The config crate lower-cases every key it stores, hence the aliases.
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(rename = "Endpoint", alias = "endpoint")]
    endpoint: Option<String>,
    #[serde(rename = "AuthKey", alias = "authkey")]
    auth_key: Option<String>,
    #[serde(rename = "DatabaseName", alias = "databasename")]
    database_name: Option<String>,
    #[serde(rename = "GraphName", alias = "graphname")]
    graph_name: Option<String>,
    #[serde(rename = "OfferThroughput", alias = "offerthroughput")]
    offer_throughput: Option<String>,
    #[serde(rename = "GremlinEndpoint", alias = "gremlinendpoint")]
    gremlin_endpoint: Option<String>,
    #[serde(rename = "PartitionKeyPath", alias = "partitionkeypath")]
    partition_key_path: Option<String>,
}

impl RawSettings {
    /// Read `key` as a section, treating an absent section as empty.
    fn read(cfg: &Config, key: &str) -> Result<Self, ConfigError> {
        match cfg.get::<RawSettings>(key) {
            Ok(raw) => Ok(raw),
            Err(config::ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// `AzureCosmosDb__<Key>` environment overrides.
fn environment() -> Environment {
    Environment::with_prefix(SECTION)
        .prefix_separator("__")
        .separator("__")
        .keep_prefix(true)
}

impl CosmosSettings {
    /// Load settings from `path`, with `AzureCosmosDb__*` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_with(path.as_ref(), environment())
    }

    fn load_with(path: &Path, env: Environment) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let cfg = Config::builder()
            .add_source(File::from(path.to_path_buf()).format(FileFormat::Json))
            .add_source(env)
            .build()?;

        let settings = Self::from_config(&cfg)?;
        tracing::debug!(
            path = %path.display(),
            database = %settings.database_name,
            graph = %settings.graph_name,
            "Loaded settings"
        );
        Ok(settings)
    }

    /// Build settings from an already-assembled [`Config`].
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let raw = RawSettings::read(cfg, SECTION)?;

        let endpoint = required(raw.endpoint, "Endpoint")?;
        validate_endpoint(&endpoint)?;

        let auth_key = required(raw.auth_key, "AuthKey")?;
        let database_name = required(raw.database_name, "DatabaseName")?;
        let graph_name = required(raw.graph_name, "GraphName")?;

        let raw_throughput = required(raw.offer_throughput, "OfferThroughput")?;
        let offer_throughput = parse_throughput(&raw_throughput)?;

        let gremlin_endpoint = optional(raw.gremlin_endpoint);
        let partition_key_path = optional(raw.partition_key_path)
            .unwrap_or_else(|| DEFAULT_PARTITION_KEY_PATH.to_string());
        validate_partition_key_path(&partition_key_path)?;

        Ok(Self {
            endpoint,
            auth_key,
            database_name,
            graph_name,
            offer_throughput,
            gremlin_endpoint,
            partition_key_path,
        })
    }
}

fn key_path(key: &str) -> String {
    format!("{SECTION}:{key}")
}

/// Blank counts as unset.
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Absent is missing; present but blank is invalid.
fn required(value: Option<String>, key: &str) -> Result<String, ConfigError> {
    let value = value.ok_or_else(|| ConfigError::MissingKey(key_path(key)))?;
    optional(Some(value)).ok_or_else(|| ConfigError::invalid(&key_path(key), "must not be empty"))
}

fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let key = key_path("Endpoint");
    let url = Url::parse(endpoint)
        .map_err(|e| ConfigError::invalid(&key, format!("{endpoint:?} is not an absolute URI: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            &key,
            format!("expected an http(s) URI, got {endpoint:?}"),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::invalid(&key, format!("{endpoint:?} has no host")));
    }
    Ok(())
}

fn validate_partition_key_path(path: &str) -> Result<(), ConfigError> {
    let key = key_path("PartitionKeyPath");
    let Some(property) = path.strip_prefix('/') else {
        return Err(ConfigError::invalid(&key, "must start with '/'"));
    };
    if property.is_empty() || property.contains('/') {
        return Err(ConfigError::invalid(
            &key,
            format!("{path:?} must name a single top-level property"),
        ));
    }
    if RESERVED_PARTITION_KEYS.contains(&property) {
        return Err(ConfigError::invalid(
            &key,
            format!("{path:?} is not supported by the Gremlin API"),
        ));
    }
    Ok(())
}

fn parse_throughput(raw: &str) -> Result<u32, ConfigError> {
    let key = key_path("OfferThroughput");
    let value: i64 = raw
        .parse()
        .map_err(|_| ConfigError::invalid(&key, format!("expected an integer, got {raw:?}")))?;
    if value <= 0 {
        return Err(ConfigError::invalid(&key, format!("must be positive, got {value}")));
    }
    u32::try_from(value).map_err(|_| ConfigError::invalid(&key, format!("{value} is too large")))
}
