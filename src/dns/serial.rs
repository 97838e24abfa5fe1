//! Monotonic SOA serial source: wall-clock seconds as a strictly increasing
//! `u32`, never repeating between successive calls.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::{sleep, Duration};

const MAX_UINT32: u64 = u32::MAX as u64;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SerialError {
    #[error("current timestamp {0} exceeds the 32-bit unsigned integer limit ({MAX_UINT32})")]
    Overflow(u64),
}

/// Reads the current wall clock as a serial-compatible `u32`, without
/// advancing any `SerialSource`. Used by callers that need "now" for a
/// purpose other than minting a fresh SOA serial (e.g. checking whether a
/// DNSSEC resign is due).
pub fn now_utc() -> Result<u32, SerialError> {
    current_unix_seconds()
}

fn current_unix_seconds() -> Result<u32, SerialError> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs();
    if secs > MAX_UINT32 {
        return Err(SerialError::Overflow(secs));
    }
    Ok(secs as u32)
}

/// Stateful generator yielding a fresh, strictly-increasing serial each time
/// it is advanced. Mirrors the Python generator of the original system as a
/// struct with a `next` method, since Rust has no native generators.
#[derive(Debug, Default)]
pub struct SerialSource {
    last: Option<u32>,
}

impl SerialSource {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Returns the next serial, sleeping in small increments until the wall
    /// clock advances past the previously returned value. Only the year
    /// 2106 overflow case is a hard error.
    pub async fn next(&mut self) -> Result<u32, SerialError> {
        loop {
            let candidate = current_unix_seconds()?;
            if self.last != Some(candidate) {
                self.last = Some(candidate);
                return Ok(candidate);
            }
            sleep(Duration::from_millis(50)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successive_serials_strictly_increase() {
        let mut source = SerialSource::new();
        let first = source.next().await.unwrap();
        let second = source.next().await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn first_serial_is_close_to_now() {
        let mut source = SerialSource::new();
        let serial = source.next().await.unwrap();
        let now = current_unix_seconds().unwrap();
        assert!(now.saturating_sub(serial) < 5);
    }
}
