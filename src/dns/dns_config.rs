//! Server configuration: the validated, in-memory shape the zone updater and
//! UDP handler both run against, plus the factory that builds one from CLI
//! flags merged with an optional `--config` file.
//!
//! Grounded on the original system's config factory: total validation (any
//! invalid field fails construction entirely, never a partially-built
//! config), and the same field set (hosted zone, alias zones, name servers,
//! per-subdomain IP resolutions, optional signing key).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dns::dnssec_key::{DnssecAlgorithm, ExtPrivateKey};
use crate::dns::validation::{is_valid_ip, is_valid_port, is_valid_subdomain};
use crate::dns::zone_origins::{ZoneOrigins, ZoneOriginsError};

/// Every IP configured for one subdomain, sharing a single health-check
/// port — matches the wire shape `{subdomain: {ips: [...], health_port}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionEntry {
    pub ips: Vec<String>,
    pub health_port: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("zone origins: {0}")]
    ZoneOrigins(#[from] ZoneOriginsError),
    #[error("invalid name server '{name}': {source}")]
    InvalidNameServer {
        name: String,
        #[source]
        source: crate::dns::validation::ValidationError,
    },
    #[error("at least one name server is required")]
    NoNameServers,
    #[error("zone_resolutions must contain at least one subdomain")]
    NoZoneResolutions,
    #[error("subdomain '{subdomain}' in zone_resolutions has an empty ips list")]
    EmptyIpList { subdomain: String },
    #[error("invalid subdomain '{name}' in zone_resolutions: {source}")]
    InvalidSubdomain {
        name: String,
        #[source]
        source: crate::dns::validation::ValidationError,
    },
    #[error("invalid IP '{ip}' for subdomain '{subdomain}': {source}")]
    InvalidIp {
        subdomain: String,
        ip: String,
        source: crate::dns::validation::ValidationError,
    },
    #[error("invalid port {port} for subdomain '{subdomain}': {source}")]
    InvalidPort {
        subdomain: String,
        port: u32,
        source: crate::dns::validation::ValidationError,
    },
    #[error("operator minimum interval must be > 0")]
    NonPositiveMinInterval,
    #[error("connection timeout must be > 0")]
    NonPositiveTimeout,
    #[error("failed to read private key file '{path}': {source}")]
    KeyFileUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load private key: {0}")]
    KeyLoad(#[from] crate::dns::dnssec_key::DnssecKeyError),
    #[error("failed to parse JSON argument '{field}': {source}")]
    JsonParse {
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read config file '{path}': {source}")]
    ConfigFileUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {reason}")]
    ConfigFileParse { path: String, reason: String },
}

/// Raw, mergeable fields: every field optional so a `--config` file can
/// supply some and CLI flags can override the rest. `None` means "not
/// supplied here" at this layer, not "disabled".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConfig {
    pub hosted_zone: Option<String>,
    pub alias_zones: Option<Vec<String>>,
    pub name_servers: Option<Vec<String>>,
    pub zone_resolutions: Option<HashMap<String, ResolutionEntry>>,
    pub port: Option<u16>,
    pub test_min_interval: Option<u32>,
    pub test_timeout: Option<u32>,
    pub priv_key_path: Option<PathBuf>,
    pub priv_key_alg: Option<String>,
    pub log_level: Option<String>,
}

impl RawConfig {
    /// Loads a TOML or JSON file, dispatching on extension (`.json` parses
    /// as JSON, everything else as TOML) — the operator picks the format,
    /// the loader just has to recognize it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ConfigFileUnreadable {
            path: path.display().to_string(),
            source,
        })?;

        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::ConfigFileParse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::ConfigFileParse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        }
    }

    /// Merges `self` under `overrides`: any field set in `overrides` wins,
    /// `self` (the file layer) only fills gaps. Explicit flags always beat
    /// the config file.
    pub fn merged_under(self, overrides: RawConfig) -> RawConfig {
        RawConfig {
            hosted_zone: overrides.hosted_zone.or(self.hosted_zone),
            alias_zones: overrides.alias_zones.or(self.alias_zones),
            name_servers: overrides.name_servers.or(self.name_servers),
            zone_resolutions: overrides.zone_resolutions.or(self.zone_resolutions),
            port: overrides.port.or(self.port),
            test_min_interval: overrides.test_min_interval.or(self.test_min_interval),
            test_timeout: overrides.test_timeout.or(self.test_timeout),
            priv_key_path: overrides.priv_key_path.or(self.priv_key_path),
            priv_key_alg: overrides.priv_key_alg.or(self.priv_key_alg),
            log_level: overrides.log_level.or(self.log_level),
        }
    }
}

/// The validated, fully-resolved server configuration. Immutable once
/// built — shared as `Arc<Config>` between the updater and every UDP
/// handler task.
#[derive(Debug)]
pub struct Config {
    pub origins: ZoneOrigins,
    pub name_servers: Vec<String>,
    pub zone_resolutions: HashMap<String, ResolutionEntry>,
    pub port: u16,
    pub operator_min_interval: u32,
    pub connection_timeout: u32,
    pub signing_key: Option<ExtPrivateKey>,
}

pub const DEFAULT_PORT: u16 = 53053;
pub const DEFAULT_MIN_INTERVAL: u32 = 30;
pub const DEFAULT_TIMEOUT: u32 = 2;

impl Config {
    /// Builds and fully validates a `Config` from merged raw fields. Total
    /// validation: the first invalid field fails the whole construction,
    /// matching the factory's "parse everything or return nothing"
    /// contract.
    pub fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let hosted_zone = raw.hosted_zone.unwrap_or_default();
        let alias_zones = raw.alias_zones.unwrap_or_default();
        let origins = ZoneOrigins::new(&hosted_zone, &alias_zones)?;

        let name_servers = raw.name_servers.unwrap_or_default();
        if name_servers.is_empty() {
            return Err(ConfigError::NoNameServers);
        }
        for ns in &name_servers {
            is_valid_subdomain(ns).map_err(|source| ConfigError::InvalidNameServer {
                name: ns.clone(),
                source,
            })?;
        }

        let zone_resolutions = raw.zone_resolutions.unwrap_or_default();
        if zone_resolutions.is_empty() {
            return Err(ConfigError::NoZoneResolutions);
        }
        for (subdomain, entry) in &zone_resolutions {
            is_valid_subdomain(subdomain).map_err(|source| ConfigError::InvalidSubdomain {
                name: subdomain.clone(),
                source,
            })?;
            if entry.ips.is_empty() {
                return Err(ConfigError::EmptyIpList {
                    subdomain: subdomain.clone(),
                });
            }
            for ip in &entry.ips {
                is_valid_ip(ip).map_err(|source| ConfigError::InvalidIp {
                    subdomain: subdomain.clone(),
                    ip: ip.clone(),
                    source,
                })?;
            }
            is_valid_port(entry.health_port as u32).map_err(|source| ConfigError::InvalidPort {
                subdomain: subdomain.clone(),
                port: entry.health_port as u32,
                source,
            })?;
        }

        let operator_min_interval = raw.test_min_interval.unwrap_or(DEFAULT_MIN_INTERVAL);
        if operator_min_interval == 0 {
            return Err(ConfigError::NonPositiveMinInterval);
        }

        let connection_timeout = raw.test_timeout.unwrap_or(DEFAULT_TIMEOUT);
        if connection_timeout == 0 {
            return Err(ConfigError::NonPositiveTimeout);
        }

        let signing_key = match raw.priv_key_path {
            Some(path) => {
                let pem = fs::read(&path).map_err(|source| ConfigError::KeyFileUnreadable {
                    path: path.display().to_string(),
                    source,
                })?;
                let algorithm: DnssecAlgorithm = raw
                    .priv_key_alg
                    .as_deref()
                    .unwrap_or("RSASHA256")
                    .parse()
                    .map_err(ConfigError::KeyLoad)?;
                Some(ExtPrivateKey::from_pem(&pem, algorithm)?)
            }
            None => None,
        };

        Ok(Self {
            origins,
            name_servers,
            zone_resolutions,
            port: raw.port.unwrap_or(DEFAULT_PORT),
            operator_min_interval,
            connection_timeout,
            signing_key,
        })
    }

    /// Record-ip-count view used by `timing::derive_max_interval`.
    pub fn record_ip_counts(&self) -> Vec<usize> {
        self.zone_resolutions.values().map(|v| v.ips.len()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raw() -> RawConfig {
        let mut zone_resolutions = HashMap::new();
        zone_resolutions.insert(
            "www".to_string(),
            ResolutionEntry {
                ips: vec!["10.0.0.1".to_string()],
                health_port: 80,
            },
        );

        RawConfig {
            hosted_zone: Some("example.com".to_string()),
            alias_zones: None,
            name_servers: Some(vec!["ns1.example.com".to_string()]),
            zone_resolutions: Some(zone_resolutions),
            port: None,
            test_min_interval: None,
            test_timeout: None,
            priv_key_path: None,
            priv_key_alg: None,
            log_level: None,
        }
    }

    #[test]
    fn builds_from_valid_raw_config_with_defaults() {
        let config = Config::from_raw(sample_raw()).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.operator_min_interval, DEFAULT_MIN_INTERVAL);
        assert!(config.signing_key.is_none());
    }

    #[test]
    fn rejects_empty_name_servers() {
        let mut raw = sample_raw();
        raw.name_servers = Some(vec![]);
        assert!(matches!(Config::from_raw(raw), Err(ConfigError::NoNameServers)));
    }

    #[test]
    fn rejects_invalid_ip_in_resolutions() {
        let mut raw = sample_raw();
        raw.zone_resolutions.as_mut().unwrap().get_mut("www").unwrap().ips[0] = "bad".to_string();
        assert!(matches!(Config::from_raw(raw), Err(ConfigError::InvalidIp { .. })));
    }

    #[test]
    fn rejects_empty_zone_resolutions() {
        let mut raw = sample_raw();
        raw.zone_resolutions = Some(HashMap::new());
        assert!(matches!(
            Config::from_raw(raw),
            Err(ConfigError::NoZoneResolutions)
        ));
    }

    #[test]
    fn rejects_empty_ips_list_for_a_subdomain() {
        let mut raw = sample_raw();
        raw.zone_resolutions.as_mut().unwrap().get_mut("www").unwrap().ips.clear();
        assert!(matches!(
            Config::from_raw(raw),
            Err(ConfigError::EmptyIpList { .. })
        ));
    }

    #[test]
    fn rejects_zero_min_interval() {
        let mut raw = sample_raw();
        raw.test_min_interval = Some(0);
        assert!(matches!(
            Config::from_raw(raw),
            Err(ConfigError::NonPositiveMinInterval)
        ));
    }

    #[test]
    fn cli_overrides_win_over_file_layer() {
        let file_layer = RawConfig {
            port: Some(1053),
            ..Default::default()
        };
        let cli_layer = RawConfig {
            port: Some(9000),
            ..Default::default()
        };
        let merged = file_layer.merged_under(cli_layer);
        assert_eq!(merged.port, Some(9000));
    }

    #[test]
    fn file_layer_fills_gaps_left_by_cli() {
        let file_layer = RawConfig {
            port: Some(1053),
            test_timeout: Some(5),
            ..Default::default()
        };
        let cli_layer = RawConfig {
            port: Some(9000),
            ..Default::default()
        };
        let merged = file_layer.merged_under(cli_layer);
        assert_eq!(merged.port, Some(9000));
        assert_eq!(merged.test_timeout, Some(5));
    }
}
