//! Authoritative DNS server whose A records track live TCP health checks.
//!
//! ## Components
//!
//! - `validation`: subdomain/IP/port syntax checks shared by config and the
//!   zone updater
//! - `health_probe`: TCP connect-based health checks
//! - `serial`: monotonic wall-clock SOA serial source
//! - `timing`: TTL/SOA/RRSIG window derivation from the probe interval
//! - `zone_origins`: primary + alias origin matching
//! - `dns_types`: record type/value definitions (A, NS, SOA, RRSIG, DNSKEY, NSEC)
//! - `dnssec_key`: single operator-supplied signing key, loaded from PEM
//! - `dnssec`: RRset canonicalization, signing, and NSEC chain generation
//! - `dns_config`: CLI/file-merged, validated server configuration
//! - `zone_updater`: probes IPs and rebuilds/publishes zone snapshots
//! - `zone_updater_worker`: background task wrapper around `zone_updater`
//! - `dns_server`: UDP query handler

pub mod dns_config;
pub mod dns_server;
pub mod dns_types;
pub mod dnssec;
pub mod dnssec_key;
pub mod health_probe;
pub mod serial;
pub mod timing;
pub mod validation;
pub mod zone_origins;
pub mod zone_updater;
pub mod zone_updater_worker;

pub use dns_config::{Config, ConfigError, RawConfig, ResolutionEntry};
pub use dns_types::{DnsError, DnsRecord, DnsRecordType, DnsRecordValue};
pub use zone_origins::ZoneOrigins;
pub use zone_updater::{Zone, ZoneUpdater, ZoneUpdaterError};
pub use zone_updater_worker::{ReaderHandle, ZoneUpdaterWorker};
