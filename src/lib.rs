//! # godgpt-e2e
//!
//! End-to-end API test harness for the GodGPT/Aevatar chat service.
//!
//! ## Features
//! - Layered configuration (env vars > YAML > defaults) with dotted-path access
//! - Token acquisition with a provider chain (email login, client credentials)
//!   and an on-disk cache with an expiry safety margin
//! - Retrying HTTP client (429/5xx + transport errors, exponential backoff)
//!   with request/response capture for debugging
//! - Business envelope (`{code, data, message}`) parsing and assertions
//! - cURL import/export and `.curl`-file test generation
//!
//! ## Architecture
//! `Config` is built once and injected into `AuthManager` and `ApiClient`;
//! each test suite logs in, attaches the bearer token, and asserts on the
//! envelopes the typed `api` wrappers return.

pub mod api;
pub mod asserts;
pub mod auth;
pub mod client;
pub mod config;
pub mod constants;
pub mod curl;
pub mod envelope;
pub mod error;

// Re-export commonly used types
pub use auth::{AuthManager, CachedToken, CredentialProvider};
pub use client::{ApiClient, ApiClientBuilder, ApiResponse, RequestOptions};
pub use config::Config;
pub use curl::{generate_test_case, parse_curl, to_curl, AuthSpec, HttpMethod, ParsedRequest};
pub use envelope::{codes, Envelope};
pub use error::{Error, Result};
