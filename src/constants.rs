//! Harness constants
//!
//! Centralized location for magic strings and configuration defaults.

/// Default API base URL when nothing is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retries for transient failures
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Safety margin subtracted from a token's lifetime before it is
/// considered expired (guards against clock skew on the auth server)
pub const DEFAULT_EXPIRE_BEFORE_SECS: i64 = 300;

/// Default on-disk token cache location
pub const DEFAULT_TOKEN_CACHE_FILE: &str = ".token_cache";

/// Client ID sent with the password grant when none is configured
pub const DEFAULT_AUTH_CLIENT_ID: &str = "AevatarAuthServer";

/// App identifier the auth server expects alongside the password grant
pub const DEFAULT_APPLE_APP_ID: &str = "com.gpt.god";

/// OAuth scope requested by the password grant
pub const DEFAULT_AUTH_SCOPE: &str = "Aevatar offline_access";

/// HTTP status codes that are retried automatically
pub const RETRY_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Environment selector variable; picks the section under `env:` in the
/// YAML config file
pub const ENV_VAR_TEST_ENV: &str = "TEST_ENV";

/// Default environment name when `TEST_ENV` is unset
pub const DEFAULT_ENV_NAME: &str = "test";

/// Application name
#[allow(dead_code)]
pub const APP_NAME: &str = "godgpt-e2e";

/// Application version
#[allow(dead_code)]
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
