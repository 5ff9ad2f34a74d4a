//! Scoped File Station sessions
//!
//! A [`Session`] is opened for one operation (a tree listing, an upload
//! batch) and closed when that operation ends. [`Session::close`] logs out
//! explicitly; a session dropped without being closed (early return, a
//! cancelled future, a dropped stream) schedules the logout on the current
//! runtime instead.

use anyhow::Result;
use tracing::{debug, warn};

use crate::client::SynologyClient;
use crate::credentials::NasCredentials;

/// Authentication API
pub const AUTH_API: &str = "SYNO.API.Auth";

/// Session name requested at login
pub const SESSION_NAME: &str = "FileStation";

/// An authenticated File Station session
pub struct Session {
    client: SynologyClient,
    sid: String,
    closed: bool,
}

impl Session {
    /// Logs in with `credentials`
    pub async fn open(client: &SynologyClient, credentials: &NasCredentials) -> Result<Self> {
        let sid = client
            .login(&credentials.username, &credentials.password, SESSION_NAME)
            .await?;
        debug!(host = %credentials.host, user = %credentials.username, "NAS session opened");

        Ok(Self {
            client: client.clone(),
            sid,
            closed: false,
        })
    }

    /// The session ID to pass as `_sid`
    pub fn sid(&self) -> &str {
        &self.sid
    }

    /// Logs out
    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        self.client.logout(&self.sid, SESSION_NAME).await?;
        debug!("NAS session closed");
        Ok(())
    }

    /// Logs out, downgrading a failure to a warning
    pub async fn close_quietly(self) {
        if let Err(err) = self.close().await {
            warn!(error = %format!("{err:#}"), "Failed to close NAS session");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("NAS session dropped outside a runtime, not logged out");
            return;
        };

        let client = self.client.clone();
        let sid = std::mem::take(&mut self.sid);
        handle.spawn(async move {
            if let Err(err) = client.logout(&sid, SESSION_NAME).await {
                warn!(error = %format!("{err:#}"), "Failed to close abandoned NAS session");
            }
        });
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.client.base_url())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
