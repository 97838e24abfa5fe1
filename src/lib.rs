//! Library interface for the healthy-dns authoritative server.
//!
//! Exposes the health-aware zone lifecycle (config, zone updater, UDP handler)
//! so it can be driven from `main_dns` or exercised directly in tests.

pub mod dns;
