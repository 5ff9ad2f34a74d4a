//! OAuth2 access tokens for the Google Drive API
//!
//! The credential file is one of the two JSON documents Google hands out:
//!
//! - a **service-account key** (`"type": "service_account"`), exchanged with
//!   a signed JWT-bearer assertion at the token endpoint;
//! - an **authorized-user** document (`"type": "authorized_user"`, as
//!   written by the installed-app flow), exchanged with its refresh token.
//!
//! The document kind is read from `type` before the rest is parsed, so an
//! unsupported document is reported by kind rather than by a missing field.
//!
//! ## Components
//!
//! - [`CredentialKey`] - The parsed credential file
//! - [`JwtBearerFlow`] - Service-account assertion signing and exchange
//! - [`RefreshFlow`] - Refresh-token exchange using the `oauth2` crate
//! - [`TokenSource`] - Hands out a valid access token, refreshing on demand

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use oauth2::{
    basic::BasicClient, ClientId, ClientSecret, EndpointNotSet, EndpointSet, RefreshToken,
    TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Default Google OAuth2 token endpoint
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Scope requested for service-account tokens
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Grant type of the JWT-bearer exchange (RFC 7523)
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Refresh this long before the access token actually expires
const REFRESH_MARGIN_SECS: i64 = 60;

/// Lifetime of a signed assertion; Google accepts at most one hour
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn no_redirect_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Failed to build OAuth HTTP client")
}

// ============================================================================
// CredentialKey
// ============================================================================

/// Contents of a service-account key file
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// The account's e-mail, used as the assertion issuer
    pub client_email: String,
    /// PEM-encoded RSA private key
    pub private_key: String,
    /// ID of the key, sent as the JWT `kid`
    pub private_key_id: Option<String>,
    /// Token endpoint override
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

/// Contents of an authorized-user credential file
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUserKey {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Long-lived refresh token
    pub refresh_token: String,
    /// Token endpoint override
    pub token_uri: Option<String>,
}

/// A Drive credential file of either supported kind
#[derive(Debug, Clone)]
pub enum CredentialKey {
    /// `"type": "service_account"`
    ServiceAccount(ServiceAccountKey),
    /// `"type": "authorized_user"`, also assumed when `type` is absent
    AuthorizedUser(AuthorizedUserKey),
}

impl CredentialKey {
    /// Reads and parses the credential file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credential file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid credential file {}", path.display()))
    }

    /// Parses a credential document, dispatching on its `type`
    pub fn parse(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).context("Failed to parse credentials")?;

        match value.get("type").and_then(serde_json::Value::as_str) {
            Some("service_account") => serde_json::from_value(value)
                .map(Self::ServiceAccount)
                .context("Invalid service account key"),
            Some("authorized_user") | None => serde_json::from_value(value)
                .map(Self::AuthorizedUser)
                .context("Invalid authorized user credentials"),
            Some(other) => anyhow::bail!(
                "Unsupported credential type \"{other}\" (expected service_account or authorized_user)"
            ),
        }
    }
}

// ============================================================================
// Tokens
// ============================================================================

/// An OAuth access token with its expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token for authenticating API requests
    pub access_token: String,
    /// Token for refreshing the access token without user interaction
    pub refresh_token: Option<String>,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Returns true if the access token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if the access token will expire within the given duration
    pub fn expires_within(&self, duration: Duration) -> bool {
        Utc::now() + duration >= self.expires_at
    }
}

// ============================================================================
// JwtBearerFlow
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// Service-account token exchange: sign an assertion, trade it for a token
pub struct JwtBearerFlow {
    client_email: String,
    key_id: Option<String>,
    signing_key: EncodingKey,
    token_url: String,
    http: reqwest::Client,
}

impl JwtBearerFlow {
    /// Creates a flow for `key`; fails if the private key is not valid PEM
    pub fn new(key: &ServiceAccountKey) -> Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .context("Invalid service account private key")?;

        Ok(Self {
            client_email: key.client_email.clone(),
            key_id: key.private_key_id.clone(),
            signing_key,
            token_url: key.token_uri.clone().unwrap_or_else(|| TOKEN_URL.to_string()),
            http: no_redirect_client()?,
        })
    }

    /// Signs a fresh RS256 assertion for the Drive scope
    pub fn assertion(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: DRIVE_SCOPE.to_string(),
            aud: self.token_url.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .context("Failed to sign service account assertion")
    }

    /// Exchanges a signed assertion for an access token
    pub async fn exchange(&self) -> Result<Tokens> {
        debug!(account = %self.client_email, "Requesting service account token");

        let assertion = self.assertion()?;
        let response = self
            .http
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .context("Failed to reach token endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Token endpoint rejected the assertion ({status}): {body}");
        }

        let token: TokenEndpointResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        Ok(Tokens {
            access_token: token.access_token,
            refresh_token: None,
            expires_at: Utc::now() + Duration::seconds(token.expires_in.unwrap_or(3600)),
        })
    }
}

// ============================================================================
// RefreshFlow
// ============================================================================

/// Refresh-token exchange against the Google token endpoint
pub struct RefreshFlow {
    client: BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    http: reqwest::Client,
}

impl RefreshFlow {
    /// Creates a flow for the client described by `key`
    pub fn new(key: &AuthorizedUserKey) -> Result<Self> {
        let token_url = key.token_uri.clone().unwrap_or_else(|| TOKEN_URL.to_string());

        let client = BasicClient::new(ClientId::new(key.client_id.clone()))
            .set_client_secret(ClientSecret::new(key.client_secret.clone()))
            .set_token_uri(TokenUrl::new(token_url).context("Invalid token URL")?);

        Ok(Self {
            client,
            http: no_redirect_client()?,
        })
    }

    /// Exchanges a refresh token for a fresh access token
    pub async fn refresh(&self, refresh_token: &str) -> Result<Tokens> {
        debug!("Refreshing access token");

        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await
            .context("Failed to refresh token")?;

        let expires_at = token_result
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        Ok(Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().to_string())
                .or_else(|| Some(refresh_token.to_string())),
            expires_at,
        })
    }
}

// ============================================================================
// TokenSource
// ============================================================================

/// Supplies the bearer token for every Drive request
pub enum TokenSource {
    /// A fixed token (tests, or tokens managed elsewhere)
    Static(String),
    /// A service-account token, re-exchanged whenever it is about to expire
    ServiceAccount {
        flow: JwtBearerFlow,
        cached: Mutex<Option<Tokens>>,
    },
    /// A token refreshed from a refresh token whenever it is about to expire
    Refreshing {
        flow: RefreshFlow,
        refresh_token: String,
        cached: Mutex<Option<Tokens>>,
    },
}

fn still_valid(cached: &Option<Tokens>) -> Option<String> {
    cached
        .as_ref()
        .filter(|t| !t.expires_within(Duration::seconds(REFRESH_MARGIN_SECS)))
        .map(|t| t.access_token.clone())
}

impl TokenSource {
    /// A source that always returns `token`
    pub fn fixed(token: impl Into<String>) -> Self {
        Self::Static(token.into())
    }

    /// A renewing source for the given credentials
    pub fn from_key(key: &CredentialKey) -> Result<Self> {
        Ok(match key {
            CredentialKey::ServiceAccount(key) => Self::ServiceAccount {
                flow: JwtBearerFlow::new(key)?,
                cached: Mutex::new(None),
            },
            CredentialKey::AuthorizedUser(key) => Self::Refreshing {
                flow: RefreshFlow::new(key)?,
                refresh_token: key.refresh_token.clone(),
                cached: Mutex::new(None),
            },
        })
    }

    /// Returns a token valid for at least another minute
    pub async fn access_token(&self) -> Result<String> {
        let (tokens, cached) = match self {
            Self::Static(token) => return Ok(token.clone()),
            Self::ServiceAccount { flow, cached } => {
                let cached = cached.lock().await;
                if let Some(token) = still_valid(&cached) {
                    return Ok(token);
                }
                (flow.exchange().await?, cached)
            }
            Self::Refreshing {
                flow,
                refresh_token,
                cached,
            } => {
                let cached = cached.lock().await;
                if let Some(token) = still_valid(&cached) {
                    return Ok(token);
                }
                let refresh_with = cached
                    .as_ref()
                    .and_then(|t| t.refresh_token.clone())
                    .unwrap_or_else(|| refresh_token.clone());
                (flow.refresh(&refresh_with).await?, cached)
            }
        };

        info!(expires_at = %tokens.expires_at, "Obtained Drive access token");
        let mut cached = cached;
        let access = tokens.access_token.clone();
        *cached = Some(tokens);
        Ok(access)
    }
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.write_str("TokenSource::Static(..)"),
            Self::ServiceAccount { .. } => f.write_str("TokenSource::ServiceAccount(..)"),
            Self::Refreshing { .. } => f.write_str("TokenSource::Refreshing(..)"),
        }
    }
}
