//! Holds the primary zone origin plus zero or more alias origins and maps
//! an absolute query name to the relative name under whichever origin
//! matches most specifically.

use hickory_proto::rr::Name;

use crate::dns::validation::{is_valid_subdomain, ValidationError};

#[derive(Debug, Clone, thiserror::Error)]
pub enum ZoneOriginsError {
    #[error("invalid origin '{name}': {source}")]
    InvalidOrigin {
        name: String,
        #[source]
        source: ValidationError,
    },
    #[error("failed to parse origin '{0}' as a DNS name")]
    UnparseableOrigin(String),
    #[error("alias origin '{alias}' overlaps with origin '{other}'")]
    OverlappingOrigins { alias: String, other: String },
}

fn to_absolute_name(raw: &str) -> Result<Name, ZoneOriginsError> {
    is_valid_subdomain(raw).map_err(|source| ZoneOriginsError::InvalidOrigin {
        name: raw.to_string(),
        source,
    })?;

    Name::parse(raw, Some(&Name::root()))
        .map_err(|_| ZoneOriginsError::UnparseableOrigin(raw.to_string()))
}

/// Read-only holder of the primary and alias zone origins, kept in a
/// deterministic most-specific-first order for lookup.
#[derive(Debug, Clone)]
pub struct ZoneOrigins {
    primary: Name,
    origins: Vec<Name>,
}

impl ZoneOrigins {
    /// Validates `primary` and `aliases`, rejecting any alias that is a
    /// subdomain of, or a superdomain of, another configured origin — this
    /// is a fatal configuration error, not a skip-with-warning.
    pub fn new(primary: &str, aliases: &[String]) -> Result<Self, ZoneOriginsError> {
        let primary_name = to_absolute_name(primary)?;

        let mut origins = vec![primary_name.clone()];
        for alias in aliases {
            let alias_name = to_absolute_name(alias)?;
            if origins.iter().any(|o| o == &alias_name) {
                continue;
            }
            for existing in &origins {
                if existing.zone_of(&alias_name) || alias_name.zone_of(existing) {
                    return Err(ZoneOriginsError::OverlappingOrigins {
                        alias: alias.to_string(),
                        other: existing.to_ascii(),
                    });
                }
            }
            origins.push(alias_name);
        }

        origins.sort_by(|a, b| {
            b.num_labels()
                .cmp(&a.num_labels())
                .then_with(|| a.to_ascii().cmp(&b.to_ascii()))
        });

        Ok(Self {
            primary: primary_name,
            origins,
        })
    }

    pub fn primary(&self) -> &Name {
        &self.primary
    }

    /// Returns the name relativized against the most specific matching
    /// origin, as a lowercase dot-joined label string (`""` for the zone
    /// apex itself). A non-absolute name is returned unchanged, as text, since
    /// it can't be tested against an absolute origin at all. `None` means the
    /// name is absolute but outside every configured origin.
    pub fn relativize(&self, name: &Name) -> Option<String> {
        if !name.is_fqdn() {
            return Some(name.to_ascii());
        }

        let origin = self.origins.iter().find(|origin| origin.zone_of(name))?;
        let relative_labels = name.num_labels() - origin.num_labels();

        let labels: Vec<String> = name
            .iter()
            .take(relative_labels as usize)
            .map(|label| String::from_utf8_lossy(label).to_lowercase())
            .collect();

        Some(labels.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relativize_strips_the_matching_origin() {
        let origins = ZoneOrigins::new("dev.example.com", &[]).unwrap();
        let name = Name::from_ascii("www.dev.example.com.").unwrap();
        assert_eq!(origins.relativize(&name), Some("www".to_string()));
    }

    #[test]
    fn relativize_returns_empty_string_at_the_apex() {
        let origins = ZoneOrigins::new("dev.example.com", &[]).unwrap();
        let name = Name::from_ascii("dev.example.com.").unwrap();
        assert_eq!(origins.relativize(&name), Some(String::new()));
    }

    #[test]
    fn relativize_returns_none_for_unmatched_origin() {
        let origins = ZoneOrigins::new("dev.example.com", &[]).unwrap();
        let name = Name::from_ascii("other.test.").unwrap();
        assert_eq!(origins.relativize(&name), None);
    }

    #[test]
    fn relativize_returns_a_non_fqdn_name_unchanged() {
        let origins = ZoneOrigins::new("dev.example.com", &[]).unwrap();
        let name = Name::from_ascii("www.dev.example.com").unwrap();
        assert!(!name.is_fqdn());
        assert_eq!(origins.relativize(&name), Some(name.to_ascii()));
    }

    #[test]
    fn relativize_prefers_the_most_specific_alias() {
        let origins = ZoneOrigins::new("dev.example.com", &["other.test".to_string()]).unwrap();
        let name = Name::from_ascii("www.other.test.").unwrap();
        assert_eq!(origins.relativize(&name), Some("www".to_string()));
    }

    #[test]
    fn overlapping_aliases_are_rejected() {
        let err = ZoneOrigins::new("dev.example.com", &["sub.dev.example.com".to_string()]);
        assert!(err.is_err());
    }

    #[test]
    fn invalid_origin_is_rejected() {
        assert!(ZoneOrigins::new("not_valid!", &[]).is_err());
    }
}
