//! `/account/*`, `/profile/*` and `/query/*` endpoints

use serde_json::json;

use crate::client::{ApiClient, ApiResponse};
use crate::error::Result;

pub async fn check_email_registered(client: &ApiClient, email: &str) -> Result<ApiResponse> {
    let body = json!({"emailAddress": email});
    client.post("/account/check-email-registered", &body).await
}

pub async fn send_verification_code(
    client: &ApiClient,
    email: &str,
    code_type: &str,
) -> Result<ApiResponse> {
    let body = json!({"email": email, "type": code_type});
    client.post("/account/send-verification-code", &body).await
}

pub async fn verify_code(
    client: &ApiClient,
    email: &str,
    code: &str,
    code_type: &str,
) -> Result<ApiResponse> {
    let body = json!({"email": email, "code": code, "type": code_type});
    client.post("/account/verify-code", &body).await
}

pub async fn logout(client: &ApiClient) -> Result<ApiResponse> {
    client.get("/account/logout").await
}

pub async fn user_info(client: &ApiClient) -> Result<ApiResponse> {
    client.get("/profile/user-info").await
}

pub async fn user_id(client: &ApiClient) -> Result<ApiResponse> {
    client.get("/query/user-id").await
}
