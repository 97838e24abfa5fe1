//! Construction-time validators and normalizers shared across the config
//! factory, zone origins, and health-record types.

/// Errors surfaced by the `is_valid_*`/`normalize_*` family. `Display` text
/// is the `(ok, reason)` message callers should log or propagate.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("IP address must have 4 octets")]
    IpWrongOctetCount,
    #[error("each octet must be a number between 0 and 255")]
    IpOctetOutOfRange,
    #[error("port must be between 1 and 65535")]
    PortOutOfRange,
    #[error("subdomain cannot be empty")]
    SubdomainEmpty,
    #[error("subdomain labels must contain only alphanumeric characters or hyphens")]
    SubdomainInvalidLabel,
}

/// Validates a dotted-quad IPv4 string. Leading zeros in octets are accepted
/// here; callers that need the canonical form must additionally call
/// [`normalize_ip`].
pub fn is_valid_ip(ip: &str) -> Result<(), ValidationError> {
    let parts: Vec<&str> = ip.split('.').collect();
    if parts.len() != 4 {
        return Err(ValidationError::IpWrongOctetCount);
    }

    let all_valid = parts.iter().all(|part| {
        !part.is_empty()
            && part.chars().all(|c| c.is_ascii_digit())
            && part.parse::<u16>().map(|v| v <= 255).unwrap_or(false)
    });
    if !all_valid {
        return Err(ValidationError::IpOctetOutOfRange);
    }

    Ok(())
}

/// Validates a port number against the 1..=65535 range used for health
/// checks (port 0 and values above `u16::MAX` are rejected by the caller's
/// integer type already; this only enforces the lower bound of 1).
pub fn is_valid_port(port: u32) -> Result<(), ValidationError> {
    if port == 0 || port > 65535 {
        return Err(ValidationError::PortOutOfRange);
    }

    Ok(())
}

/// Validates a dot-separated DNS subdomain: non-empty, with every label
/// composed solely of ASCII alphanumerics or hyphens.
pub fn is_valid_subdomain(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::SubdomainEmpty);
    }

    let labels_ok = name
        .split('.')
        .all(|label| !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
    if !labels_ok {
        return Err(ValidationError::SubdomainInvalidLabel);
    }

    Ok(())
}

/// Strips leading zeros from each octet of an already-valid IPv4 string,
/// producing the canonical form used for `HealthyIp` equality.
pub fn normalize_ip(ip: &str) -> String {
    ip.split('.')
        .map(|octet| {
            let stripped = octet.trim_start_matches('0');
            if stripped.is_empty() {
                "0".to_string()
            } else {
                stripped.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_ip_accepts_dotted_quad() {
        assert!(is_valid_ip("192.168.1.1").is_ok());
        assert!(is_valid_ip("0.0.0.0").is_ok());
        assert!(is_valid_ip("255.255.255.255").is_ok());
    }

    #[test]
    fn valid_ip_accepts_leading_zeros() {
        assert!(is_valid_ip("192.168.001.001").is_ok());
    }

    #[test]
    fn valid_ip_rejects_wrong_octet_count() {
        assert_eq!(is_valid_ip("1.2.3"), Err(ValidationError::IpWrongOctetCount));
        assert_eq!(
            is_valid_ip("1.2.3.4.5"),
            Err(ValidationError::IpWrongOctetCount)
        );
    }

    #[test]
    fn valid_ip_rejects_out_of_range_octet() {
        assert_eq!(
            is_valid_ip("1.2.3.256"),
            Err(ValidationError::IpOctetOutOfRange)
        );
        assert_eq!(is_valid_ip("a.b.c.d"), Err(ValidationError::IpOctetOutOfRange));
    }

    #[test]
    fn valid_port_boundaries() {
        assert!(is_valid_port(1).is_ok());
        assert!(is_valid_port(65535).is_ok());
        assert_eq!(is_valid_port(0), Err(ValidationError::PortOutOfRange));
        assert_eq!(is_valid_port(65536), Err(ValidationError::PortOutOfRange));
    }

    #[test]
    fn valid_subdomain_accepts_alphanumeric_and_hyphen_labels() {
        assert!(is_valid_subdomain("dev.example.com").is_ok());
        assert!(is_valid_subdomain("my-host.example-2.com").is_ok());
    }

    #[test]
    fn valid_subdomain_rejects_empty_and_empty_labels() {
        assert_eq!(is_valid_subdomain(""), Err(ValidationError::SubdomainEmpty));
        assert_eq!(
            is_valid_subdomain("dev..com"),
            Err(ValidationError::SubdomainInvalidLabel)
        );
    }

    #[test]
    fn valid_subdomain_rejects_disallowed_characters() {
        assert_eq!(
            is_valid_subdomain("dev_host.com"),
            Err(ValidationError::SubdomainInvalidLabel)
        );
    }

    #[test]
    fn normalize_ip_strips_leading_zeros_per_octet() {
        assert_eq!(normalize_ip("192.168.001.001"), "192.168.1.1");
        assert_eq!(normalize_ip("000.000.000.000"), "0.0.0.0");
        assert_eq!(normalize_ip("10.0.0.1"), "10.0.0.1");
    }
}
