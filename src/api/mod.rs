//! Typed wrappers over the business endpoints
//!
//! Thin per-endpoint functions so tests name operations instead of paths.
//! Responses come back unparsed; business-code checks stay explicit in the
//! calling test.

pub mod account;
pub mod godgpt;
