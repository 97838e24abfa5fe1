//! Derives every TTL, SOA timer, DNSKEY TTL, and RRSIG lifetime offset from
//! a single `max_interval`. The ratios below are a contract: tests compare
//! against them directly and they must never be adjusted independently of
//! each other.

/// The set of timing quantities derived from `max_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneTiming {
    pub max_interval: u32,
    pub ttl_a: u32,
    pub ttl_ns: u32,
    pub ttl_soa: u32,
    pub ttl_dnskey: u32,
    pub soa_refresh: u32,
    pub soa_retry: u32,
    pub soa_expire: u32,
    pub soa_min_ttl: u32,
    pub rrsig_resign_offset: u32,
    pub rrsig_expiration_offset: u32,
}

impl ZoneTiming {
    /// `max_interval` must be strictly positive; this is enforced upstream
    /// by construction (it is always derived from a positive operator
    /// floor combined with a positive per-record sum).
    pub fn derive(max_interval: u32) -> Self {
        let ttl_a = 2 * max_interval;
        let ttl_ns = 30 * ttl_a;
        let ttl_soa = ttl_ns;
        let ttl_dnskey = 10 * ttl_a;
        let soa_refresh = ttl_dnskey;
        let soa_retry = ttl_a;
        let soa_expire = 5 * soa_retry;
        let soa_min_ttl = ttl_a;
        let rrsig_resign_offset = soa_refresh;
        let rrsig_expiration_offset = 2 * soa_refresh + soa_expire + soa_retry;

        Self {
            max_interval,
            ttl_a,
            ttl_ns,
            ttl_soa,
            ttl_dnskey,
            soa_refresh,
            soa_retry,
            soa_expire,
            soa_min_ttl,
            rrsig_resign_offset,
            rrsig_expiration_offset,
        }
    }
}

/// Per-record overhead (seconds) added to the worst-case pass duration sum:
/// one second of bookkeeping, plus two more when DNSSEC signing is enabled.
pub fn per_record_overhead(signing: bool) -> u32 {
    1 + if signing { 2 } else { 0 }
}

/// `max_interval` is the larger of the operator floor and the worst-case
/// time a full probe pass could take: every record's IP count times the
/// connection timeout, plus per-record overhead, summed across records.
pub fn derive_max_interval(
    operator_min_interval: u32,
    record_ip_counts: &[usize],
    connection_timeout: u32,
    signing: bool,
) -> u32 {
    let overhead = per_record_overhead(signing);
    let worst_case: u32 = record_ip_counts
        .iter()
        .map(|&count| count as u32 * connection_timeout + overhead)
        .sum();

    operator_min_interval.max(worst_case)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratios_match_the_contract() {
        let t = ZoneTiming::derive(30);
        assert_eq!(t.ttl_a, 60);
        assert_eq!(t.ttl_ns, 1800);
        assert_eq!(t.ttl_soa, 1800);
        assert_eq!(t.ttl_dnskey, 600);
        assert_eq!(t.soa_refresh, 600);
        assert_eq!(t.soa_retry, 60);
        assert_eq!(t.soa_expire, 300);
        assert_eq!(t.soa_min_ttl, 60);
        assert_eq!(t.rrsig_resign_offset, 600);
        assert_eq!(t.rrsig_expiration_offset, 2 * 600 + 300 + 60);
    }

    #[test]
    fn invariant_5_holds_in_terms_of_max_interval() {
        let max_interval = 42;
        let t = ZoneTiming::derive(max_interval);
        assert_eq!(t.ttl_a, 2 * max_interval);
        assert_eq!(t.ttl_ns, 60 * max_interval);
        assert_eq!(t.soa_min_ttl, 2 * max_interval);
        assert_eq!(t.ttl_dnskey, 20 * max_interval);
        assert_eq!(
            t.rrsig_expiration_offset,
            2 * t.soa_refresh + t.soa_expire + t.soa_retry
        );
    }

    #[test]
    fn max_interval_takes_operator_floor_when_larger() {
        let derived = derive_max_interval(300, &[2, 1], 5, false);
        assert_eq!(derived, 300);
    }

    #[test]
    fn max_interval_takes_worst_case_sum_when_larger() {
        // record 1: 3 ips * 10s + 1 overhead = 31
        // record 2: 2 ips * 10s + 1 overhead = 21
        let derived = derive_max_interval(10, &[3, 2], 10, false);
        assert_eq!(derived, 52);
    }

    #[test]
    fn signing_adds_two_seconds_overhead_per_record() {
        let without = derive_max_interval(0, &[1], 10, false);
        let with = derive_max_interval(0, &[1], 10, true);
        assert_eq!(with, without + 2);
    }
}
