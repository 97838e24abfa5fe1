//! UDP-only authoritative query handler: decodes a wire query, matches the
//! question name against the current zone snapshot, and answers with the
//! exact RCODE contract below. No recursion, no TCP transport, no rate
//! limiting — every query is answered (or refused) on its own.
//!
//! - empty question section → FORMERR
//! - opcode other than QUERY → NOTIMP
//! - name outside every configured origin → NXDOMAIN
//! - name inside an origin but no record of the queried type → NOERROR, empty
//!   answer section, SOA in authority (negative-caching shape)
//! - otherwise → NOERROR, AA set, matching records in the answer section
//!
//! Grounded on the teacher's `run_udp_server`/`build_response`/
//! `process_question` loop shape and its per-packet `tokio::spawn` idiom;
//! DNSKEY/RRSIG/NSEC ride the `RData::Unknown`/`rdata::NULL` escape hatch
//! (see `bluecatengineering-dora`'s DDNS update code) since this crate does
//! not enable `hickory-proto`'s `dnssec` feature.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::{NS as NsRdata, NULL, SOA};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use hickory_proto::serialize::binary::BinDecodable;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::dns::dns_types::{DnsRecord, DnsRecordType, DnsRecordValue};
use crate::dns::dnssec::value_to_rdata;
use crate::dns::zone_origins::ZoneOrigins;
use crate::dns::zone_updater::Zone;
use crate::dns::zone_updater_worker::ReaderHandle;

const RRSIG_TYPE: u16 = 46;
const NSEC_TYPE: u16 = 47;
const DNSKEY_TYPE: u16 = 48;

/// Runs the UDP receive loop until the socket errors out. One
/// `tokio::spawn`ed task per datagram, matching the teacher's
/// fire-and-forget-per-packet shape.
pub async fn run_udp_server(socket: UdpSocket, reader: ReaderHandle, origins: Arc<ZoneOrigins>) {
    let socket = Arc::new(socket);
    let mut buf = [0u8; 512];

    loop {
        let (len, addr) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!("UDP recv error: {e}");
                continue;
            }
        };

        let query_bytes = buf[..len].to_vec();
        let socket = Arc::clone(&socket);
        let reader = reader.clone();
        let origins = Arc::clone(&origins);

        tokio::spawn(async move {
            if let Err(e) = handle_udp_query(&socket, addr, &query_bytes, &reader, &origins).await {
                debug!("UDP query error from {addr}: {e}");
            }
        });
    }
}

async fn handle_udp_query(
    socket: &UdpSocket,
    addr: SocketAddr,
    query_bytes: &[u8],
    reader: &ReaderHandle,
    origins: &ZoneOrigins,
) -> Result<(), std::io::Error> {
    let query = match Message::from_bytes(query_bytes) {
        Ok(query) => query,
        Err(e) => {
            debug!("dropping unparseable query from {addr}: {e}");
            return Ok(());
        }
    };

    let zone = reader.zone().await;
    let response = build_response(&query, &zone, origins);

    let response_bytes = match response.to_vec() {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("failed to serialize response to {addr}: {e}");
            return Ok(());
        }
    };

    socket.send_to(&response_bytes, addr).await?;
    Ok(())
}

fn build_response(query: &Message, zone: &Zone, origins: &ZoneOrigins) -> Message {
    let mut response = Message::new();
    response.set_id(query.id());
    response.set_message_type(MessageType::Response);
    response.set_op_code(OpCode::Query);
    response.set_recursion_desired(query.recursion_desired());
    response.set_recursion_available(false);

    for question in query.queries() {
        response.add_query(question.clone());
    }

    if query.op_code() != OpCode::Query {
        response.set_response_code(ResponseCode::NotImp);
        return response;
    }

    let Some(question) = query.queries().first() else {
        response.set_response_code(ResponseCode::FormErr);
        return response;
    };

    let Some(relative) = origins.relativize(question.name()) else {
        response.set_response_code(ResponseCode::NXDomain);
        return response;
    };

    let apex = apex_name_for(question.name(), &relative);
    let qtype = question.query_type();

    response.set_authoritative(true);
    response.set_response_code(ResponseCode::NoError);

    let matching_type: Vec<&DnsRecord> = zone
        .records
        .iter()
        .filter(|r| r.name == relative && record_type_matches(r.record_type, qtype))
        .collect();

    if matching_type.is_empty() {
        // Known name, no record of the queried type: NOERROR with an empty
        // answer section and the zone's SOA in authority, for negative
        // caching.
        if let Some(soa) = zone
            .records
            .iter()
            .find(|r| r.name.is_empty() && r.record_type == DnsRecordType::SOA)
        {
            if let Some(record) = to_wire_record(soa, &apex) {
                response.add_name_server(record);
            }
        }
        return response;
    }

    for record in matching_type {
        if let Some(wire) = to_wire_record(record, question.name()) {
            response.add_answer(wire);
        }
    }

    for ns in zone
        .records
        .iter()
        .filter(|r| r.name.is_empty() && r.record_type == DnsRecordType::NS)
    {
        if let Some(wire) = to_wire_record(ns, &apex) {
            response.add_name_server(wire);
        }
    }

    response
}

/// Trims `queried` down to whichever origin actually matched — the owner
/// name NS/SOA authority records are published under, expressed in the
/// client's own query namespace rather than the internally-configured
/// primary origin.
fn apex_name_for(queried: &Name, relative: &str) -> Name {
    if relative.is_empty() {
        return queried.clone();
    }
    let relative_labels = relative.split('.').count() as u8;
    queried.trim_to((queried.num_labels() - relative_labels) as usize)
}

fn record_type_matches(owned: DnsRecordType, queried: RecordType) -> bool {
    match (owned, queried) {
        (DnsRecordType::A, RecordType::A) => true,
        (DnsRecordType::NS, RecordType::NS) => true,
        (DnsRecordType::SOA, RecordType::SOA) => true,
        (DnsRecordType::DNSKEY, RecordType::Unknown(DNSKEY_TYPE)) => true,
        (DnsRecordType::RRSIG, RecordType::Unknown(RRSIG_TYPE)) => true,
        (DnsRecordType::NSEC, RecordType::Unknown(NSEC_TYPE)) => true,
        _ => false,
    }
}

/// Encodes one zone record onto the wire, under `owner_name` — the client's
/// own query name, not the internally-relativized one, so an alias-apex
/// query gets its answer back under the name it asked about.
fn to_wire_record(record: &DnsRecord, owner_name: &Name) -> Option<Record> {
    let rdata = match &record.value {
        DnsRecordValue::A(ip) => RData::A(hickory_proto::rr::rdata::A(*ip)),
        DnsRecordValue::NS(ns) => {
            let name = Name::from_ascii(ns.trim_end_matches('.')).ok()?;
            RData::NS(NsRdata(name))
        }
        DnsRecordValue::SOA {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        } => {
            let mname = Name::from_ascii(mname.trim_end_matches('.')).ok()?;
            let rname = Name::from_ascii(rname.trim_end_matches('.')).ok()?;
            RData::SOA(SOA::new(
                mname,
                rname,
                *serial,
                *refresh as i32,
                *retry as i32,
                *expire as i32,
                *minimum,
            ))
        }
        DnsRecordValue::DNSKEY { .. } => RData::Unknown {
            code: RecordType::Unknown(DNSKEY_TYPE),
            rdata: NULL::with(value_to_rdata(&record.value)),
        },
        DnsRecordValue::RRSIG { .. } => RData::Unknown {
            code: RecordType::Unknown(RRSIG_TYPE),
            rdata: NULL::with(value_to_rdata(&record.value)),
        },
        DnsRecordValue::NSEC { .. } => RData::Unknown {
            code: RecordType::Unknown(NSEC_TYPE),
            rdata: NULL::with(value_to_rdata(&record.value)),
        },
    };

    Some(Record::from_rdata(owner_name.clone(), record.ttl, rdata))
}
