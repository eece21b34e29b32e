//! One-shot network reachability checks

use std::time::Duration;

use tokio::net::TcpStream;

use crate::error::{Error, Result};

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Reports whether a network path is currently usable
///
/// Each call is an independent point-in-time check; nothing is kept running
/// between calls.
#[allow(async_fn_in_trait)]
pub trait ConnectivityProbe {
    /// Check connectivity once
    async fn is_online(&self) -> bool;
}

/// Probes connectivity by opening a TCP connection to a known endpoint
#[derive(Debug, Clone)]
pub struct TcpConnectivityProbe {
    address: String,
    timeout: Duration,
}

impl TcpConnectivityProbe {
    /// Probe `address` (`host:port`)
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Probe the host and port an HTTP(S) base URL points at
    pub fn for_base_url(base_url: &str) -> Result<Self> {
        let url = reqwest::Url::parse(base_url)
            .map_err(|error| Error::InvalidConfig(format!("invalid URL {base_url}: {error}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidConfig(format!("URL has no host: {base_url}")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| Error::InvalidConfig(format!("URL has no port: {base_url}")))?;
        Ok(Self::new(format!("{host}:{port}")))
    }

    /// Set how long a connect attempt may take before reporting offline
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The `host:port` being probed
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl ConnectivityProbe for TcpConnectivityProbe {
    async fn is_online(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_)) => true,
            Ok(Err(error)) => {
                tracing::debug!("Connectivity probe to {} failed: {error}", self.address);
                false
            }
            Err(_) => {
                tracing::debug!(
                    "Connectivity probe to {} timed out after {:?}",
                    self.address,
                    self.timeout
                );
                false
            }
        }
    }
}

/// A probe with a fixed answer (forced offline mode, tests)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedConnectivity(bool);

impl FixedConnectivity {
    pub const fn online() -> Self {
        Self(true)
    }

    pub const fn offline() -> Self {
        Self(false)
    }
}

impl ConnectivityProbe for FixedConnectivity {
    async fn is_online(&self) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_for_base_url_uses_default_ports() {
        let probe = TcpConnectivityProbe::for_base_url("https://example.com/api").unwrap();
        assert_eq!(probe.address(), "example.com:443");

        let probe = TcpConnectivityProbe::for_base_url("http://localhost:8080").unwrap();
        assert_eq!(probe.address(), "localhost:8080");

        assert!(TcpConnectivityProbe::for_base_url("not a url").is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_probe_reports_listening_endpoint_online() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let probe = TcpConnectivityProbe::new(addr.to_string());
        assert!(probe.is_online().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_probe_reports_closed_port_offline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe =
            TcpConnectivityProbe::new(addr.to_string()).with_timeout(Duration::from_millis(500));
        assert!(!probe.is_online().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fixed_connectivity() {
        assert!(FixedConnectivity::online().is_online().await);
        assert!(!FixedConnectivity::offline().is_online().await);
    }
}
