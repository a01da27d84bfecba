//! Business response envelope
//!
//! Every business endpoint wraps its payload as `{code, data, message}`.
//! The code is a string status orthogonal to the HTTP status: `"20000"` is
//! success, other numeric strings name specific failure classes. This is a
//! contract of the remote service, asserted on but not owned here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Business status codes returned in the envelope `code` field
pub mod codes {
    pub const SUCCESS: &str = "20000";
    pub const SUCCESS_DELETE: &str = "20001";
    pub const BAD_REQUEST: &str = "40000";
    pub const UNAUTHORIZED: &str = "40100";
    pub const FORBIDDEN: &str = "40300";
    pub const NOT_FOUND: &str = "40400";
    pub const SERVER_ERROR: &str = "50000";
}

/// The `{code, data, message}` wrapper around every business response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub code: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub message: String,
}

impl Envelope {
    /// True for the success codes (`20000` and the delete variant `20001`).
    pub fn is_success(&self) -> bool {
        self.code == codes::SUCCESS || self.code == codes::SUCCESS_DELETE
    }

    /// Fetch a field out of `data` when it is an object.
    pub fn data_field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// String field out of `data`.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data_field(key).and_then(Value::as_str)
    }
}
