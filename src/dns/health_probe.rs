//! Raw TCP connectivity probe used by the zone updater to determine whether
//! a configured IP is currently reachable.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;

/// Attempts one TCP connect to `(ip, port)` bounded by `timeout`. Any error
/// — resolution failure, refusal, timeout, unreachable host — yields
/// `false`. This never panics; callers treat the result as a liveness
/// signal, not a diagnostic.
pub async fn can_create_connection(ip: &str, port: u16, timeout: Duration) -> bool {
    let addr: SocketAddr = match format!("{ip}:{port}").parse() {
        Ok(addr) => addr,
        Err(_) => return false,
    };

    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(_)) | Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn succeeds_against_a_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        assert!(can_create_connection("127.0.0.1", port, Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn fails_against_a_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        assert!(!can_create_connection("127.0.0.1", port, Duration::from_millis(200)).await);
    }

    #[tokio::test]
    async fn fails_on_unparseable_address_without_panicking() {
        assert!(!can_create_connection("not-an-ip", 80, Duration::from_millis(50)).await);
    }
}
