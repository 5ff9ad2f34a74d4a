//! NAS connection details
//!
//! The key file is a small JSON document:
//!
//! ```json
//! { "host": "nas.local", "port": 5001, "username": "sync", "password": "…", "https": true }
//! ```
//!
//! `https` is optional and defaults to plain HTTP. A `host` that already
//! carries a scheme (`https://nas.local`) is used as given.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

/// Connection details for a Synology NAS
#[derive(Clone, Deserialize)]
pub struct NasCredentials {
    /// Host name or address, optionally with a scheme
    pub host: String,
    /// DSM port (5000 for HTTP, 5001 for HTTPS by default)
    pub port: u16,
    /// DSM account name
    pub username: String,
    /// DSM account password
    pub password: String,
    /// Use HTTPS when `host` has no scheme
    #[serde(default)]
    pub https: bool,
}

impl NasCredentials {
    /// Reads and parses the key file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read NAS key file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid NAS key file {}", path.display()))
    }

    /// Parses a key document
    pub fn parse(json: &str) -> Result<Self> {
        let creds: Self = serde_json::from_str(json).context("Failed to parse NAS credentials")?;
        if creds.host.trim().is_empty() {
            anyhow::bail!("NAS host is empty");
        }
        if creds.username.is_empty() {
            anyhow::bail!("NAS username is empty");
        }
        Ok(creds)
    }

    /// The base URL of the DSM Web API, e.g. `https://nas.local:5001`
    pub fn base_url(&self) -> Result<Url> {
        let host = self.host.trim().trim_end_matches('/');
        let raw = if host.contains("://") {
            host.to_string()
        } else {
            let scheme = if self.https { "https" } else { "http" };
            format!("{scheme}://{host}")
        };

        let mut url = Url::parse(&raw).with_context(|| format!("Invalid NAS host \"{}\"", self.host))?;
        url.set_port(Some(self.port))
            .map_err(|()| anyhow::anyhow!("NAS host \"{}\" cannot carry a port", self.host))?;
        Ok(url)
    }
}

impl std::fmt::Debug for NasCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NasCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("https", &self.https)
            .finish_non_exhaustive()
    }
}
