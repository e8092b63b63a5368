//! Sync configuration shared by all clients.
//!
//! A `SyncConfig` names the remote store, an optional connectivity probe
//! endpoint and the time budgets for both.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

/// Default budget for the connectivity probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Default budget for each remote operation.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

const REMOTE_URL_SCHEMES: [&str; 5] = ["libsql://", "http://", "https://", "ws://", "wss://"];

/// Configuration for remote synchronization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote database URL (`libsql://your-db.turso.io`) or local file path
    pub remote_url: Option<String>,
    /// Authentication token for the remote database
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    /// URL fetched to decide whether the remote is reachable
    pub probe_url: Option<String>,
    /// Connectivity probe timeout
    pub probe_timeout: Duration,
    /// Timeout applied to each remote operation
    pub remote_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            auth_token: None,
            probe_url: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }
}

impl SyncConfig {
    /// Create a new sync configuration for a remote URL
    pub fn new(remote_url: impl Into<String>) -> Self {
        Self {
            remote_url: Some(remote_url.into()),
            ..Self::default()
        }
    }

    /// Set the remote authentication token
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = normalize_text_option(Some(token.into()));
        self
    }

    /// Set the connectivity probe endpoint
    #[must_use]
    pub fn with_probe_url(mut self, url: impl Into<String>) -> Self {
        self.probe_url = normalize_text_option(Some(url.into()));
        self
    }

    /// Override the probe and remote time budgets
    #[must_use]
    pub const fn with_timeouts(mut self, probe: Duration, remote: Duration) -> Self {
        self.probe_timeout = probe;
        self.remote_timeout = remote;
        self
    }

    /// Check if a remote is configured
    pub fn is_configured(&self) -> bool {
        normalize_text_option(self.remote_url.clone()).is_some()
    }

    /// Resolve the configured remote into a connection target
    pub fn remote_target(&self) -> Result<RemoteTarget> {
        let url = normalize_text_option(self.remote_url.clone())
            .ok_or_else(|| Error::InvalidInput("Remote URL is required".into()))?;
        RemoteTarget::parse(&url, self.auth_token.clone())
    }

    /// Validate the probe endpoint, if one is set
    pub fn validated_probe_url(&self) -> Result<Option<String>> {
        match normalize_text_option(self.probe_url.clone()) {
            Some(url) if is_http_url(&url) => Ok(Some(url)),
            Some(url) => Err(Error::InvalidInput(format!(
                "probe URL must include http:// or https://: {url}"
            ))),
            None => Ok(None),
        }
    }

    /// Endpoint for the connectivity probe: the explicit probe URL, else the
    /// HTTP form of a network remote. File remotes have none.
    pub fn probe_endpoint(&self) -> Result<Option<String>> {
        if let Some(url) = self.validated_probe_url()? {
            return Ok(Some(url));
        }
        match self.remote_target()? {
            RemoteTarget::Remote { url, .. } => Ok(Some(http_form(&url))),
            RemoteTarget::File(_) => Ok(None),
        }
    }
}

fn http_form(url: &str) -> String {
    for (scheme, replacement) in [
        ("libsql://", "https://"),
        ("wss://", "https://"),
        ("ws://", "http://"),
    ] {
        if let Some(rest) = url.strip_prefix(scheme) {
            return format!("{replacement}{rest}");
        }
    }
    url.to_string()
}

/// Where the remote store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteTarget {
    /// Network database (Turso, sqld)
    Remote { url: String, auth_token: String },
    /// Database file shared by several local stores
    File(PathBuf),
}

impl RemoteTarget {
    /// Classify a remote URL. Network schemes become `Remote`; `file:` URLs
    /// and bare paths become `File`.
    pub fn parse(url: &str, auth_token: Option<String>) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::InvalidInput("Remote URL must not be empty".into()));
        }

        if REMOTE_URL_SCHEMES
            .iter()
            .any(|scheme| url.starts_with(scheme))
        {
            return Ok(Self::Remote {
                url: url.trim_end_matches('/').to_string(),
                auth_token: auth_token.unwrap_or_default(),
            });
        }

        let path = url.strip_prefix("file:").unwrap_or(url);
        if path.is_empty() || path.contains("://") {
            return Err(Error::InvalidInput(format!("Unsupported remote URL: {url}")));
        }
        Ok(Self::File(PathBuf::from(path)))
    }

    /// Short label for logs; never includes the token
    pub fn describe(&self) -> String {
        match self {
            Self::Remote { url, .. } => url.clone(),
            Self::File(path) => format!("file:{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_config_default_not_configured() {
        let config = SyncConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.probe_timeout, DEFAULT_PROBE_TIMEOUT);
        assert!(config.remote_target().is_err());
    }

    #[test]
    fn test_sync_config_new() {
        let config = SyncConfig::new("libsql://test.turso.io").with_auth_token("  token ");
        assert!(config.is_configured());
        assert_eq!(config.auth_token.as_deref(), Some("token"));
        assert_eq!(
            config.remote_target().unwrap(),
            RemoteTarget::Remote {
                url: "libsql://test.turso.io".to_string(),
                auth_token: "token".to_string(),
            }
        );
    }

    #[test]
    fn remote_target_parses_file_paths() {
        assert_eq!(
            RemoteTarget::parse("file:/tmp/remote.db", None).unwrap(),
            RemoteTarget::File(PathBuf::from("/tmp/remote.db"))
        );
        assert_eq!(
            RemoteTarget::parse("shared/remote.db", None).unwrap(),
            RemoteTarget::File(PathBuf::from("shared/remote.db"))
        );
    }

    #[test]
    fn remote_target_rejects_unknown_scheme() {
        assert!(RemoteTarget::parse("ftp://example.com/db", None).is_err());
        assert!(RemoteTarget::parse("   ", None).is_err());
    }

    #[test]
    fn describe_never_leaks_token() {
        let target = RemoteTarget::parse("https://db.example.com/", Some("secret".into())).unwrap();
        assert_eq!(target.describe(), "https://db.example.com");
    }

    #[test]
    fn probe_url_requires_http_scheme() {
        let config = SyncConfig::new("file:remote.db").with_probe_url("example.com");
        assert!(config.validated_probe_url().is_err());

        let config = SyncConfig::new("file:remote.db").with_probe_url("https://example.com");
        assert_eq!(
            config.validated_probe_url().unwrap().as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn probe_endpoint_falls_back_to_remote_host() {
        let config = SyncConfig::new("libsql://db.turso.io");
        assert_eq!(
            config.probe_endpoint().unwrap().as_deref(),
            Some("https://db.turso.io")
        );

        let config = SyncConfig::new("ws://127.0.0.1:8080");
        assert_eq!(
            config.probe_endpoint().unwrap().as_deref(),
            Some("http://127.0.0.1:8080")
        );

        let config = SyncConfig::new("libsql://db.turso.io").with_probe_url("https://status.example.com");
        assert_eq!(
            config.probe_endpoint().unwrap().as_deref(),
            Some("https://status.example.com")
        );

        assert_eq!(SyncConfig::new("file:remote.db").probe_endpoint().unwrap(), None);
    }

    #[test]
    fn serialized_config_omits_token() {
        let config = SyncConfig::new("libsql://db").with_auth_token("secret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
