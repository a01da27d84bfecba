//! Assertion helpers for test suites
//!
//! Panic with a descriptive message on mismatch, like any test assertion.
//! Business-code checks are always explicit here, never automatic in the
//! client.

use crate::client::ApiResponse;
use crate::envelope::Envelope;

/// Assert on the HTTP status code.
#[track_caller]
pub fn assert_status(response: &ApiResponse, expected: u16) {
    assert_eq!(
        response.status, expected,
        "expected status {expected}, got {} for {}",
        response.status, response.url
    );
}

/// Parse the body as a business envelope or fail the test.
#[track_caller]
pub fn assert_envelope(response: &ApiResponse) -> Envelope {
    match response.envelope() {
        Ok(envelope) => envelope,
        Err(e) => panic!(
            "response from {} is not a valid envelope: {e}\nbody: {}",
            response.url, response.body
        ),
    }
}

/// Assert the envelope carries the expected business code.
#[track_caller]
pub fn assert_code(response: &ApiResponse, expected: &str) -> Envelope {
    let envelope = assert_envelope(response);
    assert_eq!(
        envelope.code, expected,
        "expected business code {expected}, got {} ({}) for {}",
        envelope.code, envelope.message, response.url
    );
    envelope
}

/// Assert the envelope's code is one of several acceptable values (some
/// endpoints legitimately return either a success or a known failure).
#[track_caller]
pub fn assert_code_in(response: &ApiResponse, expected: &[&str]) -> Envelope {
    let envelope = assert_envelope(response);
    assert!(
        expected.contains(&envelope.code.as_str()),
        "expected business code in {expected:?}, got {} ({}) for {}",
        envelope.code,
        envelope.message,
        response.url
    );
    envelope
}

/// Assert the raw body contains the given text.
#[track_caller]
pub fn assert_body_contains(response: &ApiResponse, text: &str) {
    assert!(
        response.body.contains(text),
        "expected body of {} to contain {text:?}",
        response.url
    );
}

/// Assert the envelope's `data` object has all the given fields.
#[track_caller]
pub fn assert_data_fields(envelope: &Envelope, fields: &[&str]) {
    for field in fields {
        assert!(
            envelope.data_field(field).is_some(),
            "envelope data missing field {field:?}: {}",
            envelope.data
        );
    }
}
