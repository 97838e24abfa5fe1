//! DNS record type definitions.
//!
//! Trimmed to the record types this server ever answers with: A, NS, SOA,
//! and the DNSSEC triple DNSKEY/RRSIG/NSEC. Every other RFC 1035 type is out
//! of scope — a query for one answers NOERROR with an empty answer section,
//! never one of these variants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    A,
    NS,
    SOA,
    RRSIG,
    DNSKEY,
    NSEC,
}

impl fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsRecordType::A => write!(f, "A"),
            DnsRecordType::NS => write!(f, "NS"),
            DnsRecordType::SOA => write!(f, "SOA"),
            DnsRecordType::RRSIG => write!(f, "RRSIG"),
            DnsRecordType::DNSKEY => write!(f, "DNSKEY"),
            DnsRecordType::NSEC => write!(f, "NSEC"),
        }
    }
}

impl FromStr for DnsRecordType {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "A" => Ok(DnsRecordType::A),
            "NS" => Ok(DnsRecordType::NS),
            "SOA" => Ok(DnsRecordType::SOA),
            "RRSIG" => Ok(DnsRecordType::RRSIG),
            "DNSKEY" => Ok(DnsRecordType::DNSKEY),
            "NSEC" => Ok(DnsRecordType::NSEC),
            _ => Err(DnsError::InvalidRecordType(s.to_string())),
        }
    }
}

/// Values for each supported record type, in the shape the signer and the
/// UDP handler both consume directly (no intermediate wire decoding).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum DnsRecordValue {
    A(std::net::Ipv4Addr),
    NS(String),
    SOA {
        mname: String,
        rname: String,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    RRSIG {
        type_covered: DnsRecordType,
        algorithm: u8,
        labels: u8,
        original_ttl: u32,
        expiration: u32,
        inception: u32,
        key_tag: u16,
        signer_name: String,
        signature: Vec<u8>,
    },
    DNSKEY {
        flags: u16,
        protocol: u8,
        algorithm: u8,
        public_key: Vec<u8>,
    },
    NSEC {
        next_domain: String,
        types: Vec<DnsRecordType>,
    },
}

impl DnsRecordValue {
    pub fn record_type(&self) -> DnsRecordType {
        match self {
            DnsRecordValue::A(_) => DnsRecordType::A,
            DnsRecordValue::NS(_) => DnsRecordType::NS,
            DnsRecordValue::SOA { .. } => DnsRecordType::SOA,
            DnsRecordValue::RRSIG { .. } => DnsRecordType::RRSIG,
            DnsRecordValue::DNSKEY { .. } => DnsRecordType::DNSKEY,
            DnsRecordValue::NSEC { .. } => DnsRecordType::NSEC,
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            DnsRecordValue::A(ip) => ip.to_string(),
            DnsRecordValue::NS(name) => name.clone(),
            DnsRecordValue::SOA {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => format!(
                "{mname} {rname} {serial} {refresh} {retry} {expire} {minimum}"
            ),
            DnsRecordValue::RRSIG { signer_name, .. } => format!("RRSIG ({signer_name})"),
            DnsRecordValue::DNSKEY { algorithm, .. } => format!("DNSKEY (alg: {algorithm})"),
            DnsRecordValue::NSEC { next_domain, .. } => format!("NSEC {next_domain}"),
        }
    }
}

/// A record owned by a name relative to the zone apex (`""` at the apex,
/// `"www"` for `www.<origin>`), never an absolute name — the zone updater
/// re-qualifies against whichever origin a query matched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DnsRecord {
    pub name: String,
    pub record_type: DnsRecordType,
    pub ttl: u32,
    pub value: DnsRecordValue,
}

impl DnsRecord {
    pub fn new(name: impl Into<String>, record_type: DnsRecordType, ttl: u32, value: DnsRecordValue) -> Self {
        Self {
            name: name.into(),
            record_type,
            ttl,
            value,
        }
    }

    pub fn a(name: impl Into<String>, ip: std::net::Ipv4Addr, ttl: u32) -> Self {
        Self::new(name, DnsRecordType::A, ttl, DnsRecordValue::A(ip))
    }

    pub fn ns(name: impl Into<String>, nameserver: impl Into<String>, ttl: u32) -> Self {
        Self::new(name, DnsRecordType::NS, ttl, DnsRecordValue::NS(nameserver.into()))
    }

    /// Fully qualified name of this record under `origin` (already in
    /// lowercase dotted form, without a trailing dot).
    pub fn fqdn(&self, origin: &str) -> String {
        if self.name.is_empty() {
            origin.to_string()
        } else {
            format!("{}.{}", self.name, origin)
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DnsError {
    #[error("invalid record type: {0}")]
    InvalidRecordType(String),
    #[error("zone not found: {0}")]
    ZoneNotFound(String),
    #[error("invalid domain name: {0}")]
    InvalidDomain(String),
    #[error("configuration error: {0}")]
    ConfigError(String),
}
