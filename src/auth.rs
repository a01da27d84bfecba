//! Token acquisition and caching
//!
//! Credentials are tried as an ordered list of providers: password-grant
//! email login first, client-credentials as fallback. A successful grant is
//! cached to disk with its expiry (minus a safety margin) so subsequent runs
//! skip the network entirely while the token is still fresh.
//!
//! Both providers failing is not an error: `get_token` returns `None` and
//! the caller decides whether to skip or fail. The cache file is read and
//! written without locking; concurrent test processes can race on it (known
//! latent defect, single-process use assumed).

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::config::Config;
use crate::constants::{
    DEFAULT_APPLE_APP_ID, DEFAULT_AUTH_CLIENT_ID, DEFAULT_AUTH_SCOPE, DEFAULT_EXPIRE_BEFORE_SECS,
    DEFAULT_TOKEN_CACHE_FILE,
};
use crate::error::{Error, Result};

/// A token persisted to the cache file. `expire_time` is an absolute unix
/// timestamp with the safety margin already subtracted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub expire_time: i64,
    pub auth_method: String,
}

impl CachedToken {
    /// A token is valid strictly before its (margin-adjusted) expiry.
    pub fn is_valid(&self) -> bool {
        Utc::now().timestamp() < self.expire_time
    }
}

/// Successful body from `POST /connect/token`
#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn default_expires_in() -> u64 {
    3600
}

/// Error body from the token endpoint
#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: String,
}

/// One way of exchanging credentials for a token. Providers are tried in
/// order; the first success wins.
#[derive(Debug, Clone)]
pub enum CredentialProvider {
    /// OAuth2 password grant with the user's email and password
    EmailLogin {
        token_url: String,
        client_id: String,
        apple_app_id: String,
        scope: String,
        email: String,
        password: String,
    },
    /// OAuth2 client-credentials grant, used as fallback
    ClientCredentials {
        token_url: String,
        client_id: String,
        client_secret: String,
        scope: String,
    },
}

impl CredentialProvider {
    /// Tag written into the cache's `auth_method` field.
    pub fn method_name(&self) -> &'static str {
        match self {
            CredentialProvider::EmailLogin { .. } => "email_login",
            CredentialProvider::ClientCredentials { .. } => "client_credentials",
        }
    }

    async fn attempt(&self, http: &ApiClient) -> Option<TokenGrant> {
        let (token_url, form) = match self {
            CredentialProvider::EmailLogin {
                token_url,
                client_id,
                apple_app_id,
                scope,
                email,
                password,
            } => (
                token_url,
                vec![
                    ("grant_type", "password"),
                    ("client_id", client_id.as_str()),
                    ("apple_app_id", apple_app_id.as_str()),
                    ("scope", scope.as_str()),
                    ("username", email.as_str()),
                    ("password", password.as_str()),
                ],
            ),
            CredentialProvider::ClientCredentials {
                token_url,
                client_id,
                client_secret,
                scope,
            } => (
                token_url,
                vec![
                    ("grant_type", "client_credentials"),
                    ("scope", scope.as_str()),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                ],
            ),
        };

        let resp = match http.post_form(token_url, &form).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(provider = self.method_name(), error = %e, "token request failed");
                return None;
            }
        };

        if resp.status == 200 {
            match resp.json_as::<TokenGrant>() {
                Ok(grant) => {
                    debug!(provider = self.method_name(), "token grant succeeded");
                    Some(grant)
                }
                Err(e) => {
                    warn!(provider = self.method_name(), error = %e, "unparseable token response");
                    None
                }
            }
        } else {
            match resp.json_as::<TokenErrorBody>() {
                Ok(body) => warn!(
                    provider = self.method_name(),
                    status = resp.status,
                    error = %body.error,
                    description = %body.error_description,
                    "token grant rejected"
                ),
                Err(_) => warn!(
                    provider = self.method_name(),
                    status = resp.status,
                    "token grant rejected"
                ),
            }
            None
        }
    }
}

/// Obtains and caches a bearer token through an ordered provider list
pub struct AuthManager {
    http: ApiClient,
    providers: Vec<CredentialProvider>,
    cache_file: PathBuf,
    expire_before: i64,
    cached: Option<CachedToken>,
}

impl AuthManager {
    /// Build a manager with an explicit provider list.
    pub fn new(providers: Vec<CredentialProvider>, cache_file: impl Into<PathBuf>) -> Result<Self> {
        // The token endpoint is always an absolute URL; the base here is
        // never joined. 4xx grant rejections come back for inspection.
        let http = ApiClient::builder("http://localhost").raise_on_error(false).build()?;
        Ok(AuthManager {
            http,
            providers,
            cache_file: cache_file.into(),
            expire_before: DEFAULT_EXPIRE_BEFORE_SECS,
            cached: None,
        })
    }

    /// Assemble the provider list from configuration: email login when an
    /// email/password pair is present, client credentials when an
    /// id/secret pair is present.
    pub fn from_config(config: &Config) -> Result<Self> {
        let token_url = config.get_str_or("auth.token_url", "");
        if token_url.is_empty() {
            return Err(Error::Config("auth.token_url is not configured".to_string()));
        }

        let mut providers = Vec::new();

        let email = config
            .get_nonempty("auth.email")
            .or_else(|| config.get_nonempty("auth.username"));
        let password = config.get_nonempty("auth.password");
        if let (Some(email), Some(password)) = (email, password) {
            providers.push(CredentialProvider::EmailLogin {
                token_url: token_url.clone(),
                client_id: config
                    .get_nonempty("auth.client_id")
                    .unwrap_or_else(|| DEFAULT_AUTH_CLIENT_ID.to_string()),
                apple_app_id: DEFAULT_APPLE_APP_ID.to_string(),
                scope: config
                    .get_nonempty("auth.scope")
                    .unwrap_or_else(|| DEFAULT_AUTH_SCOPE.to_string()),
                email,
                password,
            });
        }

        let client_id = config.get_nonempty("auth.client_id");
        let client_secret = config.get_nonempty("auth.client_secret");
        if let (Some(client_id), Some(client_secret)) = (client_id, client_secret) {
            providers.push(CredentialProvider::ClientCredentials {
                token_url,
                client_id,
                client_secret,
                scope: config.get_nonempty("auth.scope").unwrap_or_else(|| "Aevatar".to_string()),
            });
        }

        if providers.is_empty() {
            warn!("no credentials configured; token acquisition will always fail");
        }

        let cache_file = config.get_str_or("auth.token_cache", DEFAULT_TOKEN_CACHE_FILE);
        Self::new(providers, cache_file)
    }

    /// Override the token cache location.
    pub fn with_cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_file = path.into();
        self
    }

    /// Override the expiry safety margin (seconds).
    pub fn with_expire_before(mut self, secs: i64) -> Self {
        self.expire_before = secs;
        self
    }

    /// Get an access token: cache first, then each provider in order.
    /// Returns `None` when every strategy fails; never returns a token it
    /// knows to be expired.
    pub async fn get_token(&mut self) -> Option<String> {
        if let Some(cached) = self.load_cached() {
            info!(auth_method = %cached.auth_method, "using cached token");
            let token = cached.access_token.clone();
            self.cached = Some(cached);
            return Some(token);
        }

        debug!("no valid cached token, running credential providers");
        for provider in &self.providers {
            debug!(provider = provider.method_name(), "attempting token grant");
            if let Some(grant) = provider.attempt(&self.http).await {
                let cached = CachedToken {
                    access_token: grant.access_token,
                    token_type: grant.token_type,
                    expires_in: grant.expires_in,
                    expire_time: Utc::now().timestamp() + grant.expires_in as i64
                        - self.expire_before,
                    auth_method: provider.method_name().to_string(),
                };
                self.save_cache(&cached);
                info!(auth_method = %cached.auth_method, "token acquired");
                let token = cached.access_token.clone();
                self.cached = Some(cached);
                return Some(token);
            }
        }

        warn!("all credential providers failed");
        None
    }

    /// Bearer + content-type headers for business requests; errors when no
    /// token can be obtained.
    pub async fn auth_headers(&mut self) -> Result<Vec<(String, String)>> {
        let token = self
            .get_token()
            .await
            .ok_or_else(|| Error::Auth("no access token available".to_string()))?;
        Ok(vec![
            ("Authorization".to_string(), format!("Bearer {token}")),
            ("Content-Type".to_string(), "application/json".to_string()),
        ])
    }

    /// Drop the cache and re-run the provider chain.
    pub async fn refresh(&mut self) -> bool {
        if self.cache_file.exists() {
            if let Err(e) = std::fs::remove_file(&self.cache_file) {
                warn!(error = %e, "failed to remove token cache");
            }
        }
        self.cached = None;
        self.get_token().await.is_some()
    }

    /// Whether the in-memory token is still inside its validity window.
    pub fn is_token_valid(&self) -> bool {
        self.cached.as_ref().map(CachedToken::is_valid).unwrap_or(false)
    }

    /// Path of the on-disk token cache.
    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    fn load_cached(&self) -> Option<CachedToken> {
        if !self.cache_file.exists() {
            return None;
        }
        let text = match std::fs::read_to_string(&self.cache_file) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "failed to read token cache");
                return None;
            }
        };
        let cached: CachedToken = match serde_json::from_str(&text) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "invalid token cache, ignoring");
                return None;
            }
        };
        if cached.is_valid() {
            Some(cached)
        } else {
            debug!("cached token expired");
            None
        }
    }

    fn save_cache(&self, token: &CachedToken) {
        let json = match serde_json::to_string_pretty(token) {
            Ok(j) => j,
            Err(e) => {
                warn!(error = %e, "failed to serialize token cache");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.cache_file, json) {
            warn!(error = %e, "failed to write token cache");
        } else {
            debug!(path = %self.cache_file.display(), "token cache saved");
        }
    }
}
