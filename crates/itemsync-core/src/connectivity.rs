//! Connectivity probes used before any remote work starts.

use std::time::Duration;

use crate::config::{SyncConfig, DEFAULT_PROBE_TIMEOUT};
use crate::error::{Error, Result};
use crate::util::is_http_url;

/// Answers "is the remote reachable right now".
///
/// Implementations must not fail: any transport problem means unreachable.
#[allow(async_fn_in_trait)]
pub trait ConnectivityProbe {
    async fn is_reachable(&self) -> bool;
}

/// Probe with a predetermined answer.
///
/// Used when the remote is a local file, and in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedProbe(pub bool);

impl ConnectivityProbe for FixedProbe {
    async fn is_reachable(&self) -> bool {
        self.0
    }
}

/// Probe that issues an HTTP GET and treats any response as reachable.
#[derive(Clone)]
pub struct HttpProbe {
    url: String,
    client: reqwest::Client,
}

impl HttpProbe {
    /// Build a probe for `url` using the default five second budget.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_PROBE_TIMEOUT)
    }

    /// Build a probe for `url` with a custom budget.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into().trim().to_string();
        if !is_http_url(&url) {
            return Err(Error::InvalidInput(format!(
                "probe URL must include http:// or https://: {url}"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|error| Error::InvalidInput(format!("failed to build probe client: {error}")))?;

        Ok(Self { url, client })
    }

    /// Endpoint this probe checks
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ConnectivityProbe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                tracing::debug!(
                    url = %self.url,
                    status = response.status().as_u16(),
                    "Connectivity probe answered"
                );
                true
            }
            Err(error) => {
                tracing::debug!(url = %self.url, %error, "Connectivity probe failed");
                false
            }
        }
    }
}

/// Probe chosen from configuration.
///
/// Network remotes are probed over HTTP; file remotes are always reachable.
#[derive(Clone)]
pub enum RemoteProbe {
    Http(HttpProbe),
    Fixed(FixedProbe),
}

impl RemoteProbe {
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        match config.probe_endpoint()? {
            Some(url) => Ok(Self::Http(HttpProbe::with_timeout(url, config.probe_timeout)?)),
            None => Ok(Self::Fixed(FixedProbe(true))),
        }
    }
}

impl ConnectivityProbe for RemoteProbe {
    async fn is_reachable(&self) -> bool {
        match self {
            Self::Http(probe) => probe.is_reachable().await,
            Self::Fixed(probe) => probe.is_reachable().await,
        }
    }
}
