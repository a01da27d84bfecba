//! Layered test configuration
//!
//! Precedence: environment variable > YAML file > hardcoded default.
//! The YAML file holds one section per environment under `env:`, selected
//! by `TEST_ENV` (default `test`):
//!
//! ```yaml
//! env:
//!   test:
//!     base_url: https://staging.example.com/api
//!     timeout: 30
//!     test_project_id: proj-123
//! ```
//!
//! `Config` is an explicitly constructed value passed by reference into the
//! auth and client layers; there is no process-wide singleton.

use std::env;
use std::path::Path;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_ENV_NAME, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS,
    ENV_VAR_TEST_ENV,
};

/// Environment variables recognized during load, paired with the dotted
/// config key they override.
const ENV_OVERRIDES: [(&str, &str); 14] = [
    ("API_BASE_URL", "base_url"),
    ("TEST_EMAIL", "auth.email"),
    ("TOKEN_CACHE_FILE", "auth.token_cache"),
    ("ACCESS_TOKEN", "auth.access_token"),
    ("ADMIN_TOKEN", "auth.admin_token"),
    ("API_TIMEOUT", "timeout"),
    ("API_MAX_RETRIES", "max_retries"),
    ("TEST_PROJECT_ID", "test_project_id"),
    ("AUTH_TOKEN_URL", "auth.token_url"),
    ("TEST_USERNAME", "auth.username"),
    ("TEST_PASSWORD", "auth.password"),
    ("AUTH_CLIENT_ID", "auth.client_id"),
    ("AUTH_CLIENT_SECRET", "auth.client_secret"),
    ("AUTH_SCOPE", "auth.scope"),
];

/// Keys whose env override is numeric
const NUMERIC_KEYS: [&str; 2] = ["timeout", "max_retries"];

/// Nested mapping of configuration values with dotted-path access
#[derive(Debug, Clone)]
pub struct Config {
    root: Value,
    env_name: String,
}

impl Config {
    /// Load configuration from the given YAML file, overlaying environment
    /// variables on top. A missing or malformed file is logged and load
    /// proceeds with defaults only.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let env_name =
            env::var(ENV_VAR_TEST_ENV).unwrap_or_else(|_| DEFAULT_ENV_NAME.to_string());

        let mut config = Config {
            root: Self::defaults(),
            env_name: env_name.clone(),
        };

        config.overlay_yaml(path.as_ref(), &env_name);
        config.overlay_env();

        info!(
            base_url = %config.get_str("base_url").unwrap_or_default(),
            env = %env_name,
            "configuration loaded"
        );
        config
    }

    /// Build a config straight from a JSON value; used by tests and by
    /// callers that assemble configuration programmatically.
    pub fn from_value(root: Value) -> Self {
        Config {
            root,
            env_name: DEFAULT_ENV_NAME.to_string(),
        }
    }

    fn defaults() -> Value {
        json!({
            "base_url": DEFAULT_BASE_URL,
            "timeout": DEFAULT_TIMEOUT_SECS,
            "max_retries": DEFAULT_MAX_RETRIES,
            "test_project_id": "",
            "auth": {
                "token_url": "",
                "username": "",
                "email": "",
                "password": "",
                "client_id": "",
                "client_secret": "",
                "scope": "",
                "access_token": "",
                "admin_token": "",
                "token_cache": crate::constants::DEFAULT_TOKEN_CACHE_FILE,
            },
        })
    }

    fn overlay_yaml(&mut self, path: &Path, env_name: &str) {
        if !path.exists() {
            return;
        }

        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read config file, using defaults");
                return;
            }
        };

        let yaml: Value = match serde_yaml::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed config file, using defaults");
                return;
            }
        };

        let Some(section) = yaml.get("env").and_then(|e| e.get(env_name)) else {
            warn!(env = %env_name, "no section for environment in config file");
            return;
        };

        for key in ["base_url", "timeout", "max_retries", "test_project_id"] {
            if let Some(v) = section.get(key) {
                self.set(key, v.clone());
            }
        }

        // Optional per-environment auth block
        if let Some(auth) = section.get("auth").and_then(|a| a.as_object()) {
            for (k, v) in auth {
                self.set(&format!("auth.{k}"), v.clone());
            }
        }
    }

    fn overlay_env(&mut self) {
        for (var, key) in ENV_OVERRIDES {
            let Ok(raw) = env::var(var) else { continue };
            if raw.is_empty() {
                continue;
            }
            if NUMERIC_KEYS.contains(&key) {
                match raw.parse::<u64>() {
                    Ok(n) => self.set(key, json!(n)),
                    Err(_) => warn!(var, value = %raw, "ignoring non-numeric override"),
                }
            } else {
                self.set(key, json!(raw));
            }
        }
    }

    /// Look up a value by dotted path. Returns `None` when any path segment
    /// is missing or an intermediate value is not a mapping; never panics.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut current = &self.root;
        for segment in key.split('.') {
            current = current.get(segment)?;
        }
        Some(current)
    }

    /// String lookup; non-string values yield `None`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// String lookup with a fallback.
    pub fn get_str_or(&self, key: &str, default: &str) -> String {
        self.get_str(key).unwrap_or(default).to_string()
    }

    /// String lookup treating the empty string as absent; config defaults
    /// use `""` for unset credentials.
    pub fn get_nonempty(&self, key: &str) -> Option<String> {
        self.get_str(key).filter(|s| !s.is_empty()).map(str::to_string)
    }

    /// Integer lookup with a fallback.
    pub fn get_u64_or(&self, key: &str, default: u64) -> u64 {
        self.get(key).and_then(Value::as_u64).unwrap_or(default)
    }

    /// Set a value by dotted path, creating intermediate mappings as needed.
    /// In-memory only; nothing is persisted.
    pub fn set(&mut self, key: &str, value: Value) {
        let segments: Vec<&str> = key.split('.').collect();
        let mut current = &mut self.root;

        for segment in &segments[..segments.len() - 1] {
            match current.get(*segment) {
                // An existing non-mapping value is never clobbered
                Some(v) if !v.is_object() => {
                    warn!(key, "cannot set under non-mapping config value");
                    return;
                }
                Some(_) => {}
                None => {
                    if let Some(map) = current.as_object_mut() {
                        map.insert((*segment).to_string(), json!({}));
                    } else {
                        warn!(key, "cannot set under non-mapping config value");
                        return;
                    }
                }
            }
            current = match current.get_mut(*segment) {
                Some(v) => v,
                None => return,
            };
        }

        if let Some(map) = current.as_object_mut() {
            if let Some(last) = segments.last() {
                map.insert((*last).to_string(), value);
            }
        }
    }

    /// Check that every key in `required` resolves to a non-empty value.
    /// Returns `(ok, missing_keys)`.
    pub fn validate_required(&self, required: &[&str]) -> (bool, Vec<String>) {
        let mut missing = Vec::new();
        for key in required {
            let present = match self.get(key) {
                Some(Value::String(s)) => !s.is_empty(),
                Some(Value::Null) | None => false,
                Some(_) => true,
            };
            if !present {
                missing.push((*key).to_string());
            }
        }
        (missing.is_empty(), missing)
    }

    /// Like [`validate_required`](Self::validate_required) but returns an
    /// error naming the missing keys.
    pub fn validate_and_raise(&self, required: &[&str]) -> crate::error::Result<()> {
        let (ok, missing) = self.validate_required(required);
        if ok {
            Ok(())
        } else {
            Err(crate::error::Error::Config(format!(
                "missing required configuration: {}",
                missing.join(", ")
            )))
        }
    }

    /// Full configuration tree with sensitive values masked, for logging.
    pub fn masked(&self) -> Value {
        let mut copy = self.root.clone();
        if let Some(password) = copy
            .get_mut("auth")
            .and_then(|a| a.get_mut("password"))
            .and_then(|p| p.as_str().map(str::to_string))
        {
            let chars: Vec<char> = password.chars().collect();
            let masked = if chars.is_empty() {
                String::new()
            } else if chars.len() <= 3 {
                "***".to_string()
            } else {
                let head: String = chars[..2].iter().collect();
                let tail: String = chars[chars.len() - 2..].iter().collect();
                format!("{head}***{tail}")
            };
            if let Some(p) = copy.get_mut("auth").and_then(|a| a.get_mut("password")) {
                *p = json!(masked);
            }
        }
        copy
    }

    /// Name of the environment section this config was loaded for.
    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    /// Resolved API base URL.
    pub fn base_url(&self) -> String {
        self.get_str_or("base_url", DEFAULT_BASE_URL)
    }

    /// Request timeout in seconds.
    pub fn timeout_secs(&self) -> u64 {
        self.get_u64_or("timeout", DEFAULT_TIMEOUT_SECS)
    }

    /// Retry budget for transient HTTP failures.
    pub fn max_retries(&self) -> u32 {
        self.get_u64_or("max_retries", u64::from(DEFAULT_MAX_RETRIES)) as u32
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            root: Self::defaults(),
            env_name: DEFAULT_ENV_NAME.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn missing_key_returns_default() {
        let config = Config::default();
        assert_eq!(config.get("no.such.key"), None);
        assert_eq!(config.get_str_or("no.such.key", "fallback"), "fallback");
        // Traversing through a scalar must not panic either
        assert_eq!(config.get("base_url.deeper"), None);
    }

    #[test]
    fn dotted_get_and_set() {
        let mut config = Config::default();
        config.set("auth.username", json!("alice"));
        assert_eq!(config.get_str("auth.username"), Some("alice"));

        config.set("brand.new.key", json!(42));
        assert_eq!(config.get("brand.new.key"), Some(&json!(42)));
    }

    #[test]
    fn set_refuses_to_clobber_scalar_intermediates() {
        let mut config = Config::default();
        config.set("base_url.nested", json!("x"));
        assert_eq!(config.get_str("base_url"), Some(DEFAULT_BASE_URL));
        assert_eq!(config.get("base_url.nested"), None);
    }

    #[test]
    fn validate_required_reports_missing() {
        let mut config = Config::default();
        config.set("auth.username", json!("alice"));
        let (ok, missing) = config.validate_required(&["base_url", "auth.username", "auth.password"]);
        assert!(!ok);
        assert_eq!(missing, vec!["auth.password".to_string()]);
    }

    #[test]
    fn masked_hides_password() {
        let mut config = Config::default();
        config.set("auth.password", json!("Secret123!"));
        let masked = config.masked();
        assert_eq!(masked["auth"]["password"], json!("Se***3!"));
    }

    #[test]
    #[serial]
    fn yaml_section_selected_by_test_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "env:\n  staging:\n    base_url: https://staging.example.com/api\n    timeout: 15\n"
        )
        .unwrap();

        std::env::set_var("TEST_ENV", "staging");
        std::env::remove_var("API_BASE_URL");
        std::env::remove_var("API_TIMEOUT");
        let config = Config::load(file.path());
        std::env::remove_var("TEST_ENV");

        assert_eq!(config.base_url(), "https://staging.example.com/api");
        assert_eq!(config.timeout_secs(), 15);
        assert_eq!(config.env_name(), "staging");
    }

    #[test]
    #[serial]
    fn env_var_wins_over_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "env:\n  test:\n    base_url: https://yaml.example.com\n"
        )
        .unwrap();

        std::env::remove_var("TEST_ENV");
        std::env::set_var("API_BASE_URL", "https://env.example.com");
        let config = Config::load(file.path());
        std::env::remove_var("API_BASE_URL");

        assert_eq!(config.base_url(), "https://env.example.com");
    }

    #[test]
    #[serial]
    fn malformed_yaml_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "env: [not: a: mapping").unwrap();

        std::env::remove_var("TEST_ENV");
        std::env::remove_var("API_BASE_URL");
        let config = Config::load(file.path());
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
    }
}
