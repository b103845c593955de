//! # Data Availability Configuration
//!
//! Declarative description of the DA graph, loaded from TOML with `DA_*`
//! environment overrides.
//!
//! ```toml
//! enable = true
//! role = "server"
//! request_timeout_ms = 10000
//!
//! [[backends]]
//! name = "disk"
//! kind = "local-file"
//! sync_from = true
//! [backends.connection]
//! data_dir = "./data/da"
//!
//! [rest_aggregator]
//! enable = true
//! urls = ["http://peer-a:9876", "http://peer-b:9876"]
//! quorum_threshold = 1
//!
//! [fallback]
//! enable = true
//! retention_period_secs = 1814400
//! ```
//!
//! ## Role Rules
//!
//! | Role | Requires | Forbids |
//! |------|----------|---------|
//! | `server` | a backend, the REST aggregator or a cache | store aggregator |
//! | `node` | a backend or the REST aggregator | signing key, cache, replication, store aggregator, eager fallback |
//! | `batch-poster` | store and REST aggregators | local backends, signing key |

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors. Fatal at startup only.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// File I/O error.
    #[error("Failed to read {path}: {error}")]
    Io { path: String, error: String },

    /// TOML parsing error.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// Environment override with an unusable value.
    #[error("Invalid value for {var}: {value}")]
    Env { var: String, value: String },

    /// Contradictory or incomplete options.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which node this graph serves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    /// Committee member: reader plus certifying writer.
    Server,
    /// Rollup full node: reader only.
    #[default]
    Node,
    /// Writes through the store aggregator, reads through the REST aggregator.
    BatchPoster,
}

impl std::str::FromStr for NodeRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "server" => Ok(Self::Server),
            "node" => Ok(Self::Node),
            "batch-poster" => Ok(Self::BatchPoster),
            other => Err(other.to_string()),
        }
    }
}

/// Physical medium behind a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    Memory,
    LocalFile,
    Database,
    ObjectStore,
    ContentStore,
}

/// Where and how to reach a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionParams {
    pub data_dir: Option<PathBuf>,
    pub url: Option<String>,
    /// Backend-specific options passed through to the factory.
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub name: String,
    pub kind: BackendKind,
    #[serde(default = "enabled")]
    pub enable: bool,
    #[serde(default)]
    pub connection: ConnectionParams,
    #[serde(default)]
    pub discard_after_timeout: bool,
    /// Replication source.
    #[serde(default)]
    pub sync_from: bool,
    /// Replication destination.
    #[serde(default)]
    pub sync_to: bool,
}

impl BackendConfig {
    pub fn memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: BackendKind::Memory,
            enable: true,
            connection: ConnectionParams::default(),
            discard_after_timeout: false,
            sync_from: false,
            sync_to: false,
        }
    }
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestAggregatorConfig {
    pub enable: bool,
    pub urls: Vec<String>,
    pub quorum_threshold: usize,
    pub request_timeout_ms: u64,
    pub health_check_interval_secs: u64,
}

impl Default for RestAggregatorConfig {
    fn default() -> Self {
        Self {
            enable: false,
            urls: Vec::new(),
            quorum_threshold: 1,
            request_timeout_ms: 5_000,
            health_check_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerConfig {
    pub url: String,
    pub index: usize,
    /// Hex-encoded 48-byte BLS public key.
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreAggregatorConfig {
    pub enable: bool,
    pub signers: Vec<SignerConfig>,
    pub quorum_threshold: usize,
    pub timeout_ms: u64,
    pub committee_height: u64,
}

impl Default for StoreAggregatorConfig {
    fn default() -> Self {
        Self {
            enable: false,
            signers: Vec::new(),
            quorum_threshold: 1,
            timeout_ms: 10_000,
            committee_height: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheKind {
    /// In-process LRU.
    #[default]
    Local,
    /// Host-supplied shared cache.
    External,
    /// Local LRU in front of the external cache.
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enable: bool,
    pub kind: CacheKind,
    pub capacity: usize,
    pub expiration_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable: false,
            kind: CacheKind::Local,
            capacity: 1_000,
            expiration_secs: 3_600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enable: bool,
    pub eager: bool,
    pub retention_period_secs: u64,
    /// Also disables backfilling backup hits into local storage.
    pub ignore_write_errors: bool,
    pub eager_start_height: u64,
    pub eager_poll_interval_secs: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enable: false,
            eager: false,
            retention_period_secs: 21 * 24 * 3_600,
            ignore_write_errors: false,
            eager_start_height: 0,
            eager_poll_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Hex-encoded 32-byte BLS secret key.
    pub key_material: Option<String>,
    pub signer_index: usize,
    pub require_chain_authorization: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub enable: bool,
    pub quorum_threshold: usize,
    pub allow_hash_reads: bool,
    pub chain_timeout_ms: u64,
    pub committee_cache_size: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enable: false,
            quorum_threshold: 1,
            allow_hash_reads: false,
            chain_timeout_ms: 5_000,
            committee_cache_size: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    pub enable: bool,
    pub interval_secs: u64,
    pub batch_size: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            enable: false,
            interval_secs: 60,
            batch_size: 100,
        }
    }
}

/// Complete DA configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataAvailabilityConfig {
    pub enable: bool,
    pub role: NodeRole,
    pub request_timeout_ms: u64,
    pub backends: Vec<BackendConfig>,
    pub rest_aggregator: RestAggregatorConfig,
    pub store_aggregator: StoreAggregatorConfig,
    pub cache: CacheConfig,
    pub fallback: FallbackConfig,
    pub signing: SigningConfig,
    pub validation: ValidationConfig,
    pub replication: ReplicationConfig,
}

impl Default for DataAvailabilityConfig {
    fn default() -> Self {
        Self {
            enable: false,
            role: NodeRole::Node,
            request_timeout_ms: 10_000,
            backends: Vec::new(),
            rest_aggregator: RestAggregatorConfig::default(),
            store_aggregator: StoreAggregatorConfig::default(),
            cache: CacheConfig::default(),
            fallback: FallbackConfig::default(),
            signing: SigningConfig::default(),
            validation: ValidationConfig::default(),
            replication: ReplicationConfig::default(),
        }
    }
}

impl DataAvailabilityConfig {
    /// A server with one in-memory backend.
    pub fn for_testing() -> Self {
        Self {
            enable: true,
            role: NodeRole::Server,
            request_timeout_ms: 2_000,
            backends: vec![BackendConfig::memory("memory")],
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Enabled backends, in declaration order.
    pub fn enabled_backends(&self) -> impl Iterator<Item = &BackendConfig> {
        self.backends.iter().filter(|b| b.enable)
    }

    pub fn has_backends(&self) -> bool {
        self.enabled_backends().next().is_some()
    }

    /// Apply `DA_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply `DA_*` overrides read through `lookup`.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `DA_ENABLE` | `enable` |
    /// | `DA_ROLE` | `role` |
    /// | `DA_REQUEST_TIMEOUT_MS` | `request_timeout_ms` |
    /// | `DA_REST_URLS` | `rest_aggregator.urls` (comma separated, enables it) |
    /// | `DA_REST_QUORUM` | `rest_aggregator.quorum_threshold` |
    /// | `DA_SIGNING_KEY` | `signing.key_material` |
    /// | `DA_REPLICATION_INTERVAL_SECS` | `replication.interval_secs` |
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DA_ENABLE") {
            self.enable = parse_env("DA_ENABLE", &v)?;
        }
        if let Some(v) = lookup("DA_ROLE") {
            self.role = v.parse().map_err(|value| ConfigError::Env {
                var: "DA_ROLE".into(),
                value,
            })?;
        }
        if let Some(v) = lookup("DA_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = parse_env("DA_REQUEST_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("DA_REST_URLS") {
            self.rest_aggregator.urls = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            self.rest_aggregator.enable = !self.rest_aggregator.urls.is_empty();
        }
        if let Some(v) = lookup("DA_REST_QUORUM") {
            self.rest_aggregator.quorum_threshold = parse_env("DA_REST_QUORUM", &v)?;
        }
        if let Some(v) = lookup("DA_SIGNING_KEY") {
            self.signing.key_material = Some(v);
        }
        if let Some(v) = lookup("DA_REPLICATION_INTERVAL_SECS") {
            self.replication.interval_secs = parse_env("DA_REPLICATION_INTERVAL_SECS", &v)?;
        }
        Ok(())
    }

    /// Check role rules and cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enable {
            return Ok(());
        }
        if self.request_timeout_ms == 0 {
            return invalid("request_timeout_ms must be non-zero");
        }

        self.validate_backends()?;
        self.validate_aggregators()?;

        let has_backends = self.has_backends();
        let rest = self.rest_aggregator.enable;
        let signing = self.signing.key_material.is_some();

        match self.role {
            NodeRole::Server => {
                if !has_backends && !rest && !self.cache.enable {
                    return invalid("server needs a backend, the REST aggregator or a cache");
                }
                if signing && !has_backends {
                    return invalid("signing key requires a local backend to store into");
                }
                if self.store_aggregator.enable {
                    return invalid("server must not enable the store aggregator");
                }
            }
            NodeRole::Node => {
                if signing {
                    return invalid("node must not hold a signing key");
                }
                if self.cache.enable {
                    return invalid("node must not enable a cache");
                }
                if self.replication.enable {
                    return invalid("node must not enable replication");
                }
                if self.store_aggregator.enable {
                    return invalid("node must not enable the store aggregator");
                }
                if self.fallback.eager {
                    return invalid("node must not enable eager fallback");
                }
                if !has_backends && !rest {
                    return invalid("node needs a backend or the REST aggregator");
                }
            }
            NodeRole::BatchPoster => {
                if !self.store_aggregator.enable || !rest {
                    return invalid("batch poster requires the store and REST aggregators");
                }
                if has_backends {
                    return invalid("batch poster must not configure local backends");
                }
                if signing {
                    return invalid("batch poster must not hold a signing key");
                }
            }
        }

        if self.fallback.enable {
            if !rest || !has_backends {
                return invalid("fallback needs local backends and the REST aggregator as backup");
            }
            if self.fallback.eager && self.fallback.eager_poll_interval_secs == 0 {
                return invalid("eager fallback poll interval must be non-zero");
            }
        } else if self.fallback.eager {
            return invalid("eager fallback requires fallback.enable");
        } else if rest && has_backends {
            return invalid("REST aggregator alongside local backends requires fallback");
        }

        if self.replication.enable {
            let sources = self.enabled_backends().filter(|b| b.sync_from).count();
            let destinations = self.enabled_backends().filter(|b| b.sync_to).count();
            if sources == 0 || destinations == 0 {
                return invalid("replication needs a sync_from and a sync_to backend");
            }
            if self.replication.interval_secs == 0 || self.replication.batch_size == 0 {
                return invalid("replication interval and batch size must be non-zero");
            }
        }

        if self.cache.enable && self.cache.kind != CacheKind::External && self.cache.capacity == 0
        {
            return invalid("local cache capacity must be non-zero");
        }

        if let Some(key) = &self.signing.key_material {
            let bytes = hex::decode(key.strip_prefix("0x").unwrap_or(key))
                .map_err(|e| ConfigError::Invalid(format!("signing key: {}", e)))?;
            if bytes.len() != 32 {
                return invalid("signing key must be 32 bytes");
            }
            if self.signing.signer_index >= 64 {
                return invalid("signer_index must be below 64");
            }
        } else if self.signing.require_chain_authorization {
            return invalid("chain authorization requires a signing key");
        }

        if self.validation.enable && self.validation.chain_timeout_ms == 0 {
            return invalid("validation chain_timeout_ms must be non-zero");
        }

        Ok(())
    }

    fn validate_backends(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for backend in self.enabled_backends() {
            if backend.name.is_empty() {
                return invalid("backend name must not be empty");
            }
            if !names.insert(backend.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate backend name {}",
                    backend.name
                )));
            }
            if matches!(backend.kind, BackendKind::LocalFile | BackendKind::Database)
                && backend.connection.data_dir.is_none()
            {
                return Err(ConfigError::Invalid(format!(
                    "backend {} needs connection.data_dir",
                    backend.name
                )));
            }
        }
        Ok(())
    }

    fn validate_aggregators(&self) -> Result<(), ConfigError> {
        let rest = &self.rest_aggregator;
        if rest.enable {
            if rest.urls.is_empty() {
                return invalid("REST aggregator needs at least one url");
            }
            if rest.quorum_threshold == 0 || rest.quorum_threshold > rest.urls.len() {
                return Err(ConfigError::Invalid(format!(
                    "REST quorum {} must be between 1 and {}",
                    rest.quorum_threshold,
                    rest.urls.len()
                )));
            }
            if rest.request_timeout_ms == 0 {
                return invalid("REST request_timeout_ms must be non-zero");
            }
        }

        let store = &self.store_aggregator;
        if store.enable {
            if store.signers.is_empty() {
                return invalid("store aggregator needs at least one signer");
            }
            if store.quorum_threshold == 0 || store.quorum_threshold > store.signers.len() {
                return Err(ConfigError::Invalid(format!(
                    "signing quorum {} must be between 1 and {}",
                    store.quorum_threshold,
                    store.signers.len()
                )));
            }
            for signer in &store.signers {
                let key = signer.public_key.strip_prefix("0x").unwrap_or(&signer.public_key);
                if hex::decode(key).map_or(true, |b| b.len() != 48) {
                    return Err(ConfigError::Invalid(format!(
                        "signer {} public key must be 48 hex-encoded bytes",
                        signer.url
                    )));
                }
            }
        }
        Ok(())
    }
}

fn invalid<T>(reason: &str) -> Result<T, ConfigError> {
    Err(ConfigError::Invalid(reason.to_string()))
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var: var.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rest(urls: usize) -> RestAggregatorConfig {
        RestAggregatorConfig {
            enable: true,
            urls: (0..urls).map(|i| format!("http://peer-{}", i)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_is_disabled_and_valid() {
        let config = DataAvailabilityConfig::default();
        assert!(!config.enable);
        assert!(config.validate().is_ok());
        assert!(DataAvailabilityConfig::for_testing().validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config = DataAvailabilityConfig::parse(
            r#"
            enable = true
            role = "server"

            [[backends]]
            name = "disk"
            kind = "local-file"
            sync_from = true
            [backends.connection]
            data_dir = "/tmp/da"

            [[backends]]
            name = "mem"
            kind = "memory"
            sync_to = true

            [replication]
            enable = true
            interval_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.role, NodeRole::Server);
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.backends[0].kind, BackendKind::LocalFile);
        assert!(config.backends[1].enable);
        assert_eq!(config.replication.batch_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            DataAvailabilityConfig::parse("role = 5"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = DataAvailabilityConfig::default();
        let vars: BTreeMap<&str, &str> = [
            ("DA_ENABLE", "true"),
            ("DA_ROLE", "node"),
            ("DA_REST_URLS", "http://a, http://b"),
            ("DA_REST_QUORUM", "2"),
        ]
        .into_iter()
        .collect();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert!(config.enable);
        assert_eq!(config.rest_aggregator.urls, vec!["http://a", "http://b"]);
        assert!(config.rest_aggregator.enable);
        assert_eq!(config.rest_aggregator.quorum_threshold, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = DataAvailabilityConfig::default();
        let err = config
            .apply_overrides(|k| (k == "DA_ROLE").then(|| "miner".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { .. }));
    }

    #[test]
    fn test_node_rejects_signing_key() {
        let mut config = DataAvailabilityConfig::for_testing();
        config.role = NodeRole::Node;
        config.signing.key_material = Some(hex::encode([1u8; 32]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_signing_server_needs_local_backend() {
        let mut config = DataAvailabilityConfig::for_testing();
        config.backends.clear();
        config.rest_aggregator = rest(1);
        config.signing.key_material = Some(hex::encode([1u8; 32]));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref reason) if reason.contains("local backend")));

        config.signing.key_material = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_node_rejects_cache_and_eager() {
        let mut config = DataAvailabilityConfig::for_testing();
        config.role = NodeRole::Node;
        config.cache.enable = true;
        assert!(config.validate().is_err());

        let mut config = DataAvailabilityConfig::for_testing();
        config.role = NodeRole::Node;
        config.rest_aggregator = rest(1);
        config.fallback.enable = true;
        config.fallback.eager = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_batch_poster_rules() {
        let mut config = DataAvailabilityConfig {
            enable: true,
            role: NodeRole::BatchPoster,
            rest_aggregator: rest(2),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.store_aggregator = StoreAggregatorConfig {
            enable: true,
            signers: vec![SignerConfig {
                url: "http://signer".into(),
                index: 0,
                public_key: hex::encode([2u8; 48]),
            }],
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.backends.push(BackendConfig::memory("local"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rest_quorum_bounds() {
        let mut config = DataAvailabilityConfig {
            enable: true,
            rest_aggregator: rest(2),
            ..Default::default()
        };
        config.rest_aggregator.quorum_threshold = 3;
        assert!(config.validate().is_err());
        config.rest_aggregator.quorum_threshold = 0;
        assert!(config.validate().is_err());
        config.rest_aggregator.quorum_threshold = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_replication_needs_both_ends() {
        let mut config = DataAvailabilityConfig::for_testing();
        config.replication.enable = true;
        config.backends[0].sync_from = true;
        assert!(config.validate().is_err());

        let mut dest = BackendConfig::memory("replica");
        dest.sync_to = true;
        config.backends.push(dest);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rest_with_backends_needs_fallback() {
        let mut config = DataAvailabilityConfig::for_testing();
        config.rest_aggregator = rest(1);
        assert!(config.validate().is_err());
        config.fallback.enable = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_backend_names() {
        let mut config = DataAvailabilityConfig::for_testing();
        config.backends.push(BackendConfig::memory("memory"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_signing_key_length() {
        let mut config = DataAvailabilityConfig::for_testing();
        config.signing.key_material = Some("abcd".into());
        assert!(config.validate().is_err());
        config.signing.key_material = Some(hex::encode([3u8; 32]));
        assert!(config.validate().is_ok());
    }
}
