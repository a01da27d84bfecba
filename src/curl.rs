//! cURL command parsing and test-case generation
//!
//! `parse_curl` turns a captured curl command line into a structured
//! request; `generate_test_case` reads a `.curl` file with an optional
//! `# Expected Response:` JSON trailer and emits a ready-to-run Rust test.

use std::collections::BTreeMap;

use base64::Engine;
use serde_json::Value;

use crate::error::{Error, Result};

/// Marker separating the curl command from its expected response in a
/// `.curl` file
pub const EXPECTED_RESPONSE_MARKER: &str = "# Expected Response:";

/// HTTP method of a parsed request
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::DELETE => "DELETE",
        }
    }
}

/// Credentials extracted from `-u` or an `Authorization: Bearer` header
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum AuthSpec {
    #[default]
    None,
    Bearer(String),
    Basic {
        username: String,
        password: String,
    },
}

/// A curl command decomposed into its request parts
#[derive(Clone, Debug)]
pub struct ParsedRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Headers split on the first `:`, keyed case-preserving
    pub headers: BTreeMap<String, String>,
    /// Body, JSON-parsed when possible, raw string otherwise
    pub data: Option<Value>,
    pub auth: AuthSpec,
}

/// Parse a curl command line into a [`ParsedRequest`].
pub fn parse_curl(input: &str) -> Result<ParsedRequest> {
    // Remove line continuations and normalize
    let normalized = input.replace("\\\r\n", " ").replace("\\\n", " ");
    let mut tokens = tokenize(&normalized);

    if tokens.first().map(String::as_str) == Some("curl") {
        tokens.remove(0);
    }

    let mut method: Option<HttpMethod> = None;
    let mut url = String::new();
    let mut headers = BTreeMap::new();
    let mut data: Option<Value> = None;
    let mut auth = AuthSpec::None;

    let mut i = 0;
    while i < tokens.len() {
        match tokens[i].as_str() {
            "-X" | "--request" => {
                if i + 1 < tokens.len() {
                    method = Some(parse_method(&tokens[i + 1])?);
                    i += 1;
                }
            }
            "-H" | "--header" => {
                if i + 1 < tokens.len() {
                    let (key, value) = parse_header(&tokens[i + 1])?;
                    if let Some(bearer) = bearer_from_header(&key, &value) {
                        auth = AuthSpec::Bearer(bearer);
                    }
                    // Duplicate headers are dropped regardless of casing
                    if !headers.keys().any(|k: &String| k.eq_ignore_ascii_case(&key)) {
                        headers.insert(key, value);
                    }
                    i += 1;
                }
            }
            "-d" | "--data" | "--data-raw" | "--data-binary" => {
                if i + 1 < tokens.len() {
                    let raw = tokens[i + 1].clone();
                    data = Some(
                        serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
                    );
                    i += 1;
                }
            }
            "-u" | "--user" => {
                if i + 1 < tokens.len() {
                    let (username, password) = match tokens[i + 1].split_once(':') {
                        Some((u, p)) => (u.to_string(), p.to_string()),
                        None => (tokens[i + 1].clone(), String::new()),
                    };
                    auth = AuthSpec::Basic { username, password };
                    i += 1;
                }
            }
            // Flags that carry no request information
            "--compressed" | "-k" | "--insecure" | "-L" | "--location" | "-s" | "--silent"
            | "-v" | "--verbose" => {}
            token => {
                if !token.starts_with('-')
                    && (token.starts_with("http://") || token.starts_with("https://"))
                {
                    url = token.to_string();
                }
            }
        }
        i += 1;
    }

    if url.is_empty() {
        return Err(Error::CurlParse("no URL found in curl command".to_string()));
    }

    // A body without an explicit method implies POST
    let method = method.unwrap_or(if data.is_some() { HttpMethod::POST } else { HttpMethod::GET });

    Ok(ParsedRequest { method, url, headers, data, auth })
}

fn parse_method(s: &str) -> Result<HttpMethod> {
    match s.to_uppercase().as_str() {
        "GET" => Ok(HttpMethod::GET),
        "POST" => Ok(HttpMethod::POST),
        "PUT" => Ok(HttpMethod::PUT),
        "PATCH" => Ok(HttpMethod::PATCH),
        "DELETE" => Ok(HttpMethod::DELETE),
        other => Err(Error::CurlParse(format!("unknown HTTP method: {other}"))),
    }
}

fn parse_header(s: &str) -> Result<(String, String)> {
    match s.split_once(':') {
        Some((key, value)) => Ok((key.trim().to_string(), value.trim().to_string())),
        None => Err(Error::CurlParse(format!("invalid header format: {s}"))),
    }
}

fn bearer_from_header(key: &str, value: &str) -> Option<String> {
    if key.eq_ignore_ascii_case("authorization") {
        let lower = value.to_lowercase();
        if lower.starts_with("bearer ") {
            return Some(value[7..].to_string());
        }
    }
    None
}

/// Tokenize a curl command, respecting quotes and backslash escapes.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;

    for c in input.chars() {
        if escape_next {
            current.push(c);
            escape_next = false;
            continue;
        }
        match c {
            '\\' if !in_single_quote => escape_next = true,
            '\'' if !in_double_quote => in_single_quote = !in_single_quote,
            '"' if !in_single_quote => in_double_quote = !in_double_quote,
            ' ' | '\t' | '\n' if !in_single_quote && !in_double_quote => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Format a parsed request back into a curl command line.
pub fn to_curl(request: &ParsedRequest) -> String {
    let mut parts = vec!["curl".to_string()];

    if request.method != HttpMethod::GET {
        parts.push(format!("-X {}", request.method.as_str()));
    }
    parts.push(format!("'{}'", request.url));

    for (key, value) in &request.headers {
        parts.push(format!("-H '{key}: {value}'"));
    }
    match &request.auth {
        AuthSpec::Bearer(token) if !request.headers.contains_key("Authorization") => {
            parts.push(format!("-H 'Authorization: Bearer {token}'"));
        }
        AuthSpec::Basic { username, password } => {
            parts.push(format!("-u '{username}:{password}'"));
        }
        _ => {}
    }
    if let Some(data) = &request.data {
        let body = match data {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        parts.push(format!("-d '{}'", body.replace('\'', "'\\''")));
    }

    parts.join(" \\\n  ")
}

/// Generate a Rust test case from the contents of a `.curl` file.
///
/// Everything before `# Expected Response:` is the curl command; the
/// trailer, when present and valid JSON, contributes literal assertions on
/// the response body's top-level fields.
pub fn generate_test_case(name: &str, content: &str) -> Result<String> {
    let (curl_part, expected) = match content.split_once(EXPECTED_RESPONSE_MARKER) {
        Some((cmd, trailer)) => {
            (cmd.trim(), serde_json::from_str::<Value>(trailer.trim()).ok())
        }
        None => (content.trim(), None),
    };

    let request = parse_curl(curl_part)?;
    let test_name = test_fn_name(&request);
    let needs_json_macro = request.data.is_some()
        || expected
            .as_ref()
            .and_then(Value::as_object)
            .map(|o| o.values().any(|v| !v.is_object() && !v.is_array()))
            .unwrap_or(false);

    let mut out = String::new();
    out.push_str(&format!("//! Generated from {name} - edit the .curl source instead\n\n"));
    if needs_json_macro {
        out.push_str("use serde_json::json;\n\n");
    }
    out.push_str("#[tokio::test]\n");
    out.push_str(&format!("async fn {test_name}() {{\n"));
    out.push_str("    let client = reqwest::Client::new();\n");
    out.push_str(&format!(
        "    let response = client\n        .{}({:?})\n",
        request.method.as_str().to_lowercase(),
        request.url
    ));

    for (key, value) in &request.headers {
        out.push_str(&format!("        .header({key:?}, {value:?})\n"));
    }
    match &request.auth {
        AuthSpec::Basic { username, password } => {
            let encoded = base64::engine::general_purpose::STANDARD
                .encode(format!("{username}:{password}"));
            out.push_str(&format!(
                "        .header(\"Authorization\", \"Basic {encoded}\")\n"
            ));
        }
        AuthSpec::Bearer(token) if !request.headers.contains_key("Authorization") => {
            out.push_str(&format!("        .bearer_auth({token:?})\n"));
        }
        _ => {}
    }
    if let Some(data) = &request.data {
        out.push_str(&format!("        .json(&json!({data}))\n"));
    }

    out.push_str("        .send()\n        .await\n        .expect(\"request failed\");\n\n");
    out.push_str("    assert_eq!(response.status().as_u16(), 200);\n");

    if let Some(expected) = expected.as_ref().and_then(Value::as_object) {
        out.push_str(
            "    let body: serde_json::Value = response.json().await.expect(\"invalid JSON body\");\n",
        );
        for (key, value) in expected {
            match value {
                Value::Object(_) | Value::Array(_) => {
                    out.push_str(&format!(
                        "    assert!(body.get({key:?}).is_some(), \"missing field {key}\");\n"
                    ));
                }
                scalar => {
                    out.push_str(&format!("    assert_eq!(body[{key:?}], json!({scalar}));\n"));
                }
            }
        }
    }

    out.push_str("}\n");
    Ok(out)
}

/// Derive a test function name from the method and last URL path segment.
fn test_fn_name(request: &ParsedRequest) -> String {
    let segment = request
        .url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("endpoint");
    let mut name = format!("{}_{}", request.method.as_str().to_lowercase(), segment);
    name = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_simple_get() {
        let req = parse_curl("curl https://api.example.com/users").unwrap();
        assert_eq!(req.method, HttpMethod::GET);
        assert_eq!(req.url, "https://api.example.com/users");
        assert!(req.headers.is_empty());
        assert!(req.data.is_none());
    }

    #[test]
    fn parse_post_with_header_and_json_body() {
        let req = parse_curl(r#"curl -X POST 'http://a/b' -H 'X: y' -d '{"k":1}'"#).unwrap();
        assert_eq!(req.method, HttpMethod::POST);
        assert_eq!(req.url, "http://a/b");
        assert_eq!(req.headers.get("X").map(String::as_str), Some("y"));
        assert_eq!(req.data, Some(json!({"k": 1})));
    }

    #[test]
    fn body_implies_post() {
        let req = parse_curl("curl https://api.example.com/login -d 'a=1'").unwrap();
        assert_eq!(req.method, HttpMethod::POST);
        assert_eq!(req.data, Some(Value::String("a=1".to_string())));
    }

    #[test]
    fn header_split_on_first_colon_only() {
        let req =
            parse_curl("curl -H 'Referer: https://x/y' https://api.example.com").unwrap();
        assert_eq!(req.headers.get("Referer").map(String::as_str), Some("https://x/y"));
    }

    #[test]
    fn duplicate_headers_deduped_case_insensitively() {
        let req = parse_curl("curl -H 'x-token: 1' -H 'X-Token: 2' https://api.example.com")
            .unwrap();
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.headers.get("x-token").map(String::as_str), Some("1"));
    }

    #[test]
    fn bearer_token_extracted_from_authorization_header() {
        let req = parse_curl("curl -H 'Authorization: Bearer tok123' https://api.example.com")
            .unwrap();
        assert_eq!(req.auth, AuthSpec::Bearer("tok123".to_string()));
    }

    #[test]
    fn basic_auth_from_user_flag() {
        let req = parse_curl("curl -u alice:pw https://api.example.com").unwrap();
        assert_eq!(
            req.auth,
            AuthSpec::Basic { username: "alice".to_string(), password: "pw".to_string() }
        );
    }

    #[test]
    fn line_continuations_are_stripped() {
        let req = parse_curl("curl \\\n  -X PUT \\\n  'http://a/b'").unwrap();
        assert_eq!(req.method, HttpMethod::PUT);
        assert_eq!(req.url, "http://a/b");
    }

    #[test]
    fn missing_url_is_an_error() {
        assert!(parse_curl("curl -X POST -d '{}'").is_err());
    }

    #[test]
    fn to_curl_round_trips() {
        let original =
            parse_curl(r#"curl -X POST 'http://a/b' -H 'X: y' -d '{"k":1}'"#).unwrap();
        let reparsed = parse_curl(&to_curl(&original)).unwrap();
        assert_eq!(reparsed.method, original.method);
        assert_eq!(reparsed.url, original.url);
        assert_eq!(reparsed.headers, original.headers);
        assert_eq!(reparsed.data, original.data);
    }

    #[test]
    fn generates_test_with_expected_assertions() {
        let content = concat!(
            "curl -X POST 'https://api.example.com/login' -H 'Content-Type: application/json' ",
            "-d '{\"user\":\"a\"}'\n",
            "# Expected Response:\n",
            "{\"code\": \"20000\", \"data\": {\"token\": \"x\"}}\n",
        );
        let source = generate_test_case("login.curl", content).unwrap();
        assert!(source.contains("async fn post_login()"));
        assert!(source.contains(".post(\"https://api.example.com/login\")"));
        assert!(source.contains(r#".header("Content-Type", "application/json")"#));
        assert!(source.contains(r#"assert_eq!(body["code"], json!("20000"));"#));
        assert!(source.contains(r#"assert!(body.get("data").is_some()"#));
    }

    #[test]
    fn generates_test_without_trailer() {
        let source =
            generate_test_case("ping.curl", "curl https://api.example.com/ping").unwrap();
        assert!(source.contains("async fn get_ping()"));
        assert!(source.contains("assert_eq!(response.status().as_u16(), 200);"));
        assert!(!source.contains("body["));
    }
}
