//! Shared fixtures: a wiremock double of the auth server and business API
#![allow(dead_code)]

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header_exists, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use godgpt_e2e::{ApiClient, AuthManager, CredentialProvider};

pub const TEST_EMAIL: &str = "tester@example.com";
pub const TEST_PASSWORD: &str = "Test123456!";
pub const ACCESS_TOKEN: &str = "e2e-access-token";
pub const SESSION_ID: &str = "sess-0001";
pub const GUEST_SESSION_ID: &str = "guest-sess-0001";

/// Wrap a payload in the service's `{code, data, message}` envelope.
pub fn envelope(code: &str, data: Value) -> Value {
    json!({"code": code, "data": data, "message": ""})
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(envelope("20000", data))
}

/// A mock of the token endpoint plus the business API routes the suites
/// exercise. Tests can mount additional mocks on `server` as needed.
pub struct MockService {
    pub server: MockServer,
}

impl MockService {
    pub async fn start() -> Self {
        let server = MockServer::start().await;

        // Token endpoint: the known test user logs in, everyone else is
        // rejected with an OAuth error body. Mount order matters: first
        // match wins.
        Mock::given(method("POST"))
            .and(path("/connect/token"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("tester%40example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": ACCESS_TOKEN,
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/connect/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "invalid credentials",
                "error_uri": null
            })))
            .mount(&server)
            .await;

        // Session lifecycle
        Mock::given(method("POST"))
            .and(path("/godgpt/create-session"))
            .and(header_exists("authorization"))
            .respond_with(ok(json!({"sessionId": SESSION_ID})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/godgpt/create-session"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope("40100", Value::Null)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/godgpt/session-list"))
            .and(header_exists("authorization"))
            .respond_with(ok(json!([{"sessionId": SESSION_ID, "title": "Test Session"}])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/godgpt/session-info/{SESSION_ID}")))
            .and(header_exists("authorization"))
            .respond_with(ok(json!({"sessionId": SESSION_ID, "title": "Test Session"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/godgpt/session-info/.*$"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope("40400", Value::Null)),
            )
            .mount(&server)
            .await;

        // Chat
        Mock::given(method("POST"))
            .and(path("/godgpt/chat"))
            .and(header_exists("authorization"))
            .and(body_string_contains(SESSION_ID))
            .respond_with(ok(json!({"content": "The stars are aligned.", "sessionId": SESSION_ID})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/godgpt/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope("40400", Value::Null)),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/godgpt/chat/rename"))
            .and(header_exists("authorization"))
            .respond_with(ok(Value::Null))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("/godgpt/chat/{SESSION_ID}")))
            .and(header_exists("authorization"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope("20001", Value::Null)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/godgpt/chat/{SESSION_ID}")))
            .and(header_exists("authorization"))
            .respond_with(ok(json!([
                {"role": "user", "content": "What do the stars say?"},
                {"role": "assistant", "content": "The stars are aligned."}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/godgpt/chat/.*$"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope("40400", Value::Null)),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path_regex("^/godgpt/chat/.*$"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope("40400", Value::Null)),
            )
            .mount(&server)
            .await;

        // Guest flow (no auth required)
        Mock::given(method("POST"))
            .and(path("/godgpt/guest/create-session"))
            .respond_with(ok(json!({"sessionId": GUEST_SESSION_ID})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/godgpt/guest/chat"))
            .respond_with(ok(json!({"content": "Welcome, traveler."})))
            .mount(&server)
            .await;

        // Account and profile
        Mock::given(method("GET"))
            .and(path("/godgpt/account"))
            .and(header_exists("authorization"))
            .respond_with(ok(json!({"userId": "user-0001", "email": TEST_EMAIL, "credits": 100})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/account/logout"))
            .respond_with(ok(Value::Null))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/account/check-email-registered"))
            .and(body_string_contains(TEST_EMAIL))
            .respond_with(ok(json!(true)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/account/check-email-registered"))
            .respond_with(ok(json!(false)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/profile/user-info"))
            .and(header_exists("authorization"))
            .respond_with(ok(json!({"userId": "user-0001", "displayName": "Tester"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/query/user-id"))
            .and(header_exists("authorization"))
            .respond_with(ok(json!({"userId": "user-0001"})))
            .mount(&server)
            .await;

        MockService { server }
    }

    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    pub fn token_url(&self) -> String {
        format!("{}/connect/token", self.server.uri())
    }

    /// Provider list matching the mock's known test user.
    pub fn email_provider(&self) -> CredentialProvider {
        CredentialProvider::EmailLogin {
            token_url: self.token_url(),
            client_id: "AevatarAuthServer".to_string(),
            apple_app_id: "com.gpt.god".to_string(),
            scope: "Aevatar offline_access".to_string(),
            email: TEST_EMAIL.to_string(),
            password: TEST_PASSWORD.to_string(),
        }
    }

    /// An auth manager caching into the given temp directory.
    pub fn auth_manager(&self, cache_dir: &tempfile::TempDir) -> AuthManager {
        AuthManager::new(vec![self.email_provider()], cache_dir.path().join("token_cache"))
            .expect("auth manager")
    }

    /// A client that does not raise on non-2xx (the suites assert on
    /// business codes themselves).
    pub fn client(&self) -> ApiClient {
        ApiClient::builder(self.base_url())
            .base_backoff(Duration::from_millis(5))
            .raise_on_error(false)
            .build()
            .expect("api client")
    }

    /// Log in through the provider chain and return a bearer-equipped client.
    pub async fn logged_in_client(&self, cache_dir: &tempfile::TempDir) -> ApiClient {
        let mut auth = self.auth_manager(cache_dir);
        let token = auth.get_token().await.expect("login failed against mock");
        let client = self.client();
        client.set_bearer(token);
        client
    }
}
