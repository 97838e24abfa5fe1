//! DNSSEC signing: RRset canonicalization (RFC 4034 section 6), RRSIG
//! generation, DNSKEY advertisement, and the NSEC chain. Adapted from the
//! teacher's zone signer, with inception/expiration/resign timing now
//! derived from `ZoneTiming` instead of a fixed-duration window, and the
//! record set trimmed to what `dns_types` still carries.

use std::collections::HashMap;

use crate::dns::dns_types::{DnsRecord, DnsRecordType, DnsRecordValue};
use crate::dns::dnssec_key::ExtPrivateKey;
use crate::dns::timing::ZoneTiming;

#[derive(Debug, thiserror::Error)]
pub enum DnssecError {
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

/// A set of records sharing (owner name, type) — the unit DNSSEC signs.
#[derive(Debug, Clone)]
pub struct RRset {
    pub name: String,
    pub record_type: DnsRecordType,
    pub ttl: u32,
    pub records: Vec<DnsRecord>,
}

impl RRset {
    fn label_count(&self, origin: &str) -> u8 {
        count_labels(&self.records.first().map(|r| r.fqdn(origin)).unwrap_or_default())
    }
}

/// Groups records by `(name, type)`, skipping RRSIG/NSEC — those are signer
/// output, never signer input.
pub fn group_into_rrsets(records: &[DnsRecord]) -> Vec<RRset> {
    let mut grouped: HashMap<(String, DnsRecordType), Vec<DnsRecord>> = HashMap::new();

    for record in records {
        if matches!(record.record_type, DnsRecordType::RRSIG | DnsRecordType::NSEC) {
            continue;
        }
        grouped
            .entry((record.name.clone(), record.record_type))
            .or_default()
            .push(record.clone());
    }

    grouped
        .into_iter()
        .map(|((name, record_type), records)| {
            let ttl = records.first().map(|r| r.ttl).unwrap_or(0);
            RRset {
                name,
                record_type,
                ttl,
                records,
            }
        })
        .collect()
}

/// Signs every RRset derived from `records` plus the DNSKEY and NSEC chain,
/// returning the original records with RRSIG/DNSKEY/NSEC/RRSIG-over-NSEC
/// appended. `inception`/`expiration` come from the current `RrsigSchedule`
/// entry, not a fixed duration.
pub fn sign_zone(
    key: &ExtPrivateKey,
    origin: &str,
    records: &[DnsRecord],
    inception: u32,
    expiration: u32,
    dnskey_ttl: u32,
) -> Result<Vec<DnsRecord>, DnssecError> {
    let mut output = records.to_vec();

    let dnskey_record = create_dnskey_record(key, dnskey_ttl);
    let rrsets = group_into_rrsets(records);

    for rrset in &rrsets {
        output.push(sign_rrset(key, rrset, origin, inception, expiration)?);
    }

    let dnskey_rrset = RRset {
        name: String::new(),
        record_type: DnsRecordType::DNSKEY,
        ttl: dnskey_ttl,
        records: vec![dnskey_record.clone()],
    };
    output.push(dnskey_record);
    output.push(sign_rrset(key, &dnskey_rrset, origin, inception, expiration)?);

    let nsec_records = generate_nsec_chain(origin, &rrsets);
    for nsec in &nsec_records {
        let nsec_rrset = RRset {
            name: nsec.name.clone(),
            record_type: DnsRecordType::NSEC,
            ttl: nsec.ttl,
            records: vec![nsec.clone()],
        };
        output.push(sign_rrset(key, &nsec_rrset, origin, inception, expiration)?);
    }
    output.extend(nsec_records);

    Ok(output)
}

fn create_dnskey_record(key: &ExtPrivateKey, ttl: u32) -> DnsRecord {
    DnsRecord::new(
        "",
        DnsRecordType::DNSKEY,
        ttl,
        DnsRecordValue::DNSKEY {
            flags: key.flags(),
            protocol: 3,
            algorithm: key.algorithm().number(),
            public_key: key.public_key().to_vec(),
        },
    )
}

fn sign_rrset(
    key: &ExtPrivateKey,
    rrset: &RRset,
    origin: &str,
    inception: u32,
    expiration: u32,
) -> Result<DnsRecord, DnssecError> {
    let mut data_to_sign = Vec::new();
    data_to_sign.extend_from_slice(&(rrset.record_type as u16).to_be_bytes());
    data_to_sign.push(key.algorithm().number());
    data_to_sign.push(rrset.label_count(origin));
    data_to_sign.extend_from_slice(&rrset.ttl.to_be_bytes());
    data_to_sign.extend_from_slice(&expiration.to_be_bytes());
    data_to_sign.extend_from_slice(&inception.to_be_bytes());
    data_to_sign.extend_from_slice(&key.key_tag().to_be_bytes());
    data_to_sign.extend_from_slice(&domain_to_wire_format(origin));
    data_to_sign.extend_from_slice(&canonicalize_rrset(rrset, origin));

    let signature = key
        .sign(&data_to_sign)
        .map_err(|e| DnssecError::SigningFailed(e.to_string()))?;

    Ok(DnsRecord::new(
        rrset.name.clone(),
        DnsRecordType::RRSIG,
        rrset.ttl,
        DnsRecordValue::RRSIG {
            type_covered: rrset.record_type,
            algorithm: key.algorithm().number(),
            labels: rrset.label_count(origin),
            original_ttl: rrset.ttl,
            expiration,
            inception,
            key_tag: key.key_tag(),
            signer_name: origin.to_string(),
            signature,
        },
    ))
}

/// RFC 4034 section 6.3: wire-encode each record, sort canonically by the
/// resulting bytes, concatenate.
fn canonicalize_rrset(rrset: &RRset, origin: &str) -> Vec<u8> {
    let mut wire_records: Vec<Vec<u8>> = rrset
        .records
        .iter()
        .map(|r| record_to_wire(r, origin, rrset.ttl))
        .collect();
    wire_records.sort();

    let mut result = Vec::new();
    for wire in wire_records {
        result.extend(wire);
    }
    result
}

fn record_to_wire(record: &DnsRecord, origin: &str, ttl: u32) -> Vec<u8> {
    let mut wire = Vec::new();
    wire.extend_from_slice(&domain_to_wire_format(&record.fqdn(origin)));
    wire.extend_from_slice(&(record.record_type as u16).to_be_bytes());
    wire.extend_from_slice(&1u16.to_be_bytes()); // class IN
    wire.extend_from_slice(&ttl.to_be_bytes());

    let rdata = value_to_rdata(&record.value);
    wire.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    wire.extend_from_slice(&rdata);
    wire
}

pub(crate) fn value_to_rdata(value: &DnsRecordValue) -> Vec<u8> {
    match value {
        DnsRecordValue::A(ip) => ip.octets().to_vec(),
        DnsRecordValue::NS(name) => domain_to_wire_format(name),
        DnsRecordValue::SOA {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        } => {
            let mut rdata = Vec::new();
            rdata.extend_from_slice(&domain_to_wire_format(mname));
            rdata.extend_from_slice(&domain_to_wire_format(rname));
            rdata.extend_from_slice(&serial.to_be_bytes());
            rdata.extend_from_slice(&refresh.to_be_bytes());
            rdata.extend_from_slice(&retry.to_be_bytes());
            rdata.extend_from_slice(&expire.to_be_bytes());
            rdata.extend_from_slice(&minimum.to_be_bytes());
            rdata
        }
        DnsRecordValue::DNSKEY {
            flags,
            protocol,
            algorithm,
            public_key,
        } => {
            let mut rdata = Vec::new();
            rdata.extend_from_slice(&flags.to_be_bytes());
            rdata.push(*protocol);
            rdata.push(*algorithm);
            rdata.extend_from_slice(public_key);
            rdata
        }
        DnsRecordValue::NSEC { next_domain, types } => {
            let mut rdata = Vec::new();
            rdata.extend_from_slice(&domain_to_wire_format(next_domain));
            rdata.extend_from_slice(&types_to_bitmap(types));
            rdata
        }
        DnsRecordValue::RRSIG {
            type_covered,
            algorithm,
            labels,
            original_ttl,
            expiration,
            inception,
            key_tag,
            signer_name,
            signature,
        } => {
            // Never part of an RRset being signed (group_into_rrsets drops
            // RRSIG/NSEC), but still wire-encoded when answering a query for
            // it directly, so this has to be a real RFC 4034 section 3.1 body.
            let mut rdata = Vec::new();
            rdata.extend_from_slice(&(*type_covered as u16).to_be_bytes());
            rdata.push(*algorithm);
            rdata.push(*labels);
            rdata.extend_from_slice(&original_ttl.to_be_bytes());
            rdata.extend_from_slice(&expiration.to_be_bytes());
            rdata.extend_from_slice(&inception.to_be_bytes());
            rdata.extend_from_slice(&key_tag.to_be_bytes());
            rdata.extend_from_slice(&domain_to_wire_format(signer_name));
            rdata.extend_from_slice(signature);
            rdata
        }
    }
}

/// Builds the circular NSEC chain across every signed owner name, each
/// pointing at the next name in canonical order (last points back to first).
fn generate_nsec_chain(origin: &str, rrsets: &[RRset]) -> Vec<DnsRecord> {
    let mut owner_types: HashMap<String, Vec<DnsRecordType>> = HashMap::new();
    for rrset in rrsets {
        owner_types
            .entry(rrset.name.clone())
            .or_default()
            .push(rrset.record_type);
    }

    let mut names: Vec<String> = owner_types.keys().cloned().collect();
    names.sort_by(|a, b| canonical_compare(a, b));

    if names.is_empty() {
        return Vec::new();
    }

    let mut nsec_records = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        let next_owner = &names[(i + 1) % names.len()];
        let next_name = if next_owner.is_empty() {
            origin.to_string()
        } else {
            format!("{next_owner}.{origin}")
        };

        let mut types = owner_types.get(name).cloned().unwrap_or_default();
        types.push(DnsRecordType::NSEC);
        types.push(DnsRecordType::RRSIG);
        types.sort_by_key(|t| *t as u16);
        types.dedup();

        nsec_records.push(DnsRecord::new(
            name.clone(),
            DnsRecordType::NSEC,
            300,
            DnsRecordValue::NSEC {
                next_domain: next_name,
                types,
            },
        ));
    }

    nsec_records
}

fn domain_to_wire_format(domain: &str) -> Vec<u8> {
    let mut wire = Vec::new();
    for label in domain.split('.') {
        if label.is_empty() {
            continue;
        }
        let lower = label.to_lowercase();
        wire.push(lower.len() as u8);
        wire.extend_from_slice(lower.as_bytes());
    }
    wire.push(0);
    wire
}

fn count_labels(domain: &str) -> u8 {
    domain.split('.').filter(|s| !s.is_empty()).count() as u8
}

fn canonical_compare(a: &str, b: &str) -> std::cmp::Ordering {
    let a_labels: Vec<&str> = a.split('.').filter(|s| !s.is_empty()).collect();
    let b_labels: Vec<&str> = b.split('.').filter(|s| !s.is_empty()).collect();

    let a_rev: Vec<_> = a_labels.iter().rev().collect();
    let b_rev: Vec<_> = b_labels.iter().rev().collect();

    for (a_label, b_label) in a_rev.iter().zip(b_rev.iter()) {
        let cmp = a_label.to_lowercase().cmp(&b_label.to_lowercase());
        if cmp != std::cmp::Ordering::Equal {
            return cmp;
        }
    }

    a_labels.len().cmp(&b_labels.len())
}

fn types_to_bitmap(types: &[DnsRecordType]) -> Vec<u8> {
    if types.is_empty() {
        return Vec::new();
    }

    let mut windows: HashMap<u8, Vec<u8>> = HashMap::new();
    for rtype in types {
        let type_num = *rtype as u16;
        let window = (type_num / 256) as u8;
        let offset = (type_num % 256) as u8;
        windows.entry(window).or_default().push(offset);
    }

    let mut window_nums: Vec<u8> = windows.keys().cloned().collect();
    window_nums.sort();

    let mut bitmap = Vec::new();
    for window_num in window_nums {
        let offsets = windows.get(&window_num).unwrap();
        let max_offset = offsets.iter().max().copied().unwrap_or(0);
        let bitmap_len = (max_offset / 8) + 1;
        let mut window_bitmap = vec![0u8; bitmap_len as usize];
        for offset in offsets {
            let byte_idx = (offset / 8) as usize;
            let bit_idx = 7 - (offset % 8);
            window_bitmap[byte_idx] |= 1 << bit_idx;
        }
        bitmap.push(window_num);
        bitmap.push(bitmap_len);
        bitmap.extend(window_bitmap);
    }
    bitmap
}

/// One (inception, expiration, resign_at) triple derived from `ZoneTiming`.
/// `resign_at` starts at the Unix epoch so the first pass always signs.
#[derive(Debug, Clone, Copy)]
pub struct RrsigWindow {
    pub inception: u32,
    pub expiration: u32,
    pub resign_at: u32,
}

/// Stateful generator mirroring the Python `iter_rrsig_key` generator: call
/// `advance(now)` once per pass, re-deriving a fresh window only when the
/// current one has reached its `resign_at`.
#[derive(Debug)]
pub struct RrsigSchedule {
    current: Option<RrsigWindow>,
}

impl RrsigSchedule {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Reports whether the current window (if any) has reached its
    /// `resign_at`, without mutating or creating a window. Lets a caller
    /// decide a rebuild is needed purely because a signature is due, even
    /// when nothing else about the zone changed.
    pub fn is_due(&self, now: u32) -> bool {
        match self.current {
            None => true,
            Some(window) => now >= window.resign_at,
        }
    }

    /// Returns the window to sign with this pass, re-deriving from `timing`
    /// and `now` if none exists yet or the previous one is due for resign.
    pub fn advance(&mut self, timing: &ZoneTiming, now: u32) -> RrsigWindow {
        let needs_new = match self.current {
            None => true,
            Some(window) => now >= window.resign_at,
        };

        if needs_new {
            let window = RrsigWindow {
                inception: now,
                expiration: now + timing.rrsig_expiration_offset,
                resign_at: now + timing.rrsig_resign_offset,
            };
            self.current = Some(window);
        }

        self.current.expect("just set above")
    }
}

impl Default for RrsigSchedule {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn domain_to_wire_format_encodes_length_prefixed_labels() {
        let wire = domain_to_wire_format("example.com");
        assert_eq!(wire[0], 7);
        assert_eq!(&wire[1..8], b"example");
        assert_eq!(wire[8], 3);
        assert_eq!(&wire[9..12], b"com");
        assert_eq!(*wire.last().unwrap(), 0);
    }

    #[test]
    fn rrsig_value_encodes_a_non_empty_rfc4034_rdata_body() {
        let value = DnsRecordValue::RRSIG {
            type_covered: DnsRecordType::A,
            algorithm: 8,
            labels: 2,
            original_ttl: 60,
            expiration: 2_000,
            inception: 1_000,
            key_tag: 1234,
            signer_name: "example.com".to_string(),
            signature: vec![0xAB, 0xCD],
        };
        let rdata = value_to_rdata(&value);

        assert_eq!(&rdata[0..2], &(DnsRecordType::A as u16).to_be_bytes());
        assert_eq!(rdata[2], 8);
        assert_eq!(rdata[3], 2);
        assert_eq!(&rdata[4..8], &60u32.to_be_bytes());
        assert_eq!(&rdata[8..12], &2_000u32.to_be_bytes());
        assert_eq!(&rdata[12..16], &1_000u32.to_be_bytes());
        assert_eq!(&rdata[16..18], &1234u16.to_be_bytes());
        assert_eq!(&rdata[18..], [domain_to_wire_format("example.com"), vec![0xAB, 0xCD]].concat());
    }

    #[test]
    fn group_into_rrsets_skips_rrsig_and_nsec() {
        let records = vec![
            DnsRecord::a("www", Ipv4Addr::new(10, 0, 0, 1), 60),
            DnsRecord::a("www", Ipv4Addr::new(10, 0, 0, 2), 60),
            DnsRecord::new(
                "www",
                DnsRecordType::NSEC,
                60,
                DnsRecordValue::NSEC {
                    next_domain: "example.com".to_string(),
                    types: vec![DnsRecordType::A],
                },
            ),
        ];
        let rrsets = group_into_rrsets(&records);
        assert_eq!(rrsets.len(), 1);
        assert_eq!(rrsets[0].records.len(), 2);
    }

    #[test]
    fn nsec_chain_is_circular() {
        let rrsets = vec![
            RRset {
                name: String::new(),
                record_type: DnsRecordType::SOA,
                ttl: 60,
                records: vec![],
            },
            RRset {
                name: "www".to_string(),
                record_type: DnsRecordType::A,
                ttl: 60,
                records: vec![],
            },
        ];
        let chain = generate_nsec_chain("example.com", &rrsets);
        assert_eq!(chain.len(), 2);

        let apex_next = chain.iter().find(|r| r.name.is_empty()).unwrap();
        match &apex_next.value {
            DnsRecordValue::NSEC { next_domain, .. } => {
                assert_eq!(next_domain, "www.example.com")
            }
            _ => panic!("expected NSEC value"),
        }

        let www_next = chain.iter().find(|r| r.name == "www").unwrap();
        match &www_next.value {
            DnsRecordValue::NSEC { next_domain, .. } => assert_eq!(next_domain, "example.com"),
            _ => panic!("expected NSEC value"),
        }
    }

    #[test]
    fn is_due_is_true_before_any_window_exists() {
        let schedule = RrsigSchedule::new();
        assert!(schedule.is_due(0));
    }

    #[test]
    fn is_due_follows_the_current_windows_resign_at() {
        let timing = ZoneTiming::derive(30);
        let mut schedule = RrsigSchedule::new();
        let window = schedule.advance(&timing, 1_000);
        assert!(!schedule.is_due(window.resign_at - 1));
        assert!(schedule.is_due(window.resign_at));
    }

    #[test]
    fn rrsig_schedule_holds_window_until_resign_at() {
        let timing = ZoneTiming::derive(30);
        let mut schedule = RrsigSchedule::new();
        let first = schedule.advance(&timing, 1_000);
        let second = schedule.advance(&timing, 1_001);
        assert_eq!(first.inception, second.inception);

        let third = schedule.advance(&timing, first.resign_at);
        assert_eq!(third.inception, first.resign_at);
    }
}
