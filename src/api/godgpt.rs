//! `/godgpt/*` endpoints: sessions, chat, payments, invitations, sharing

use serde_json::{json, Value};

use crate::client::{ApiClient, ApiResponse};
use crate::envelope::Envelope;
use crate::error::Result;

pub async fn create_session(
    client: &ApiClient,
    title: &str,
    session_type: &str,
) -> Result<ApiResponse> {
    let body = json!({"title": title, "type": session_type});
    client.post("/godgpt/create-session", &body).await
}

/// Session IDs come back in two shapes: `{"sessionId": "..."}` or a bare
/// string in `data`.
pub fn session_id_from(envelope: &Envelope) -> Option<String> {
    match &envelope.data {
        Value::Object(map) => map.get("sessionId").and_then(Value::as_str).map(str::to_string),
        Value::String(id) => Some(id.clone()),
        _ => None,
    }
}

pub async fn create_guest_session(
    client: &ApiClient,
    device_id: &str,
    user_agent: &str,
) -> Result<ApiResponse> {
    let body = json!({"deviceId": device_id, "userAgent": user_agent});
    client.post("/godgpt/guest/create-session", &body).await
}

pub async fn session_list(client: &ApiClient) -> Result<ApiResponse> {
    client.get("/godgpt/session-list").await
}

pub async fn session_info(client: &ApiClient, session_id: &str) -> Result<ApiResponse> {
    client.get(&format!("/godgpt/session-info/{session_id}")).await
}

pub async fn chat(
    client: &ApiClient,
    session_id: &str,
    message: &str,
    stream: bool,
) -> Result<ApiResponse> {
    let body = json!({"sessionId": session_id, "message": message, "stream": stream});
    if stream {
        client.post_stream("/godgpt/chat", &body).await
    } else {
        client.post("/godgpt/chat", &body).await
    }
}

/// Messages previously exchanged in a session; `data` is a list.
pub async fn chat_history(client: &ApiClient, session_id: &str) -> Result<ApiResponse> {
    client.get(&format!("/godgpt/chat/{session_id}")).await
}

pub async fn voice_chat(
    client: &ApiClient,
    session_id: &str,
    audio_data: &str,
    format: &str,
) -> Result<ApiResponse> {
    let body = json!({"audioData": audio_data, "sessionId": session_id, "format": format});
    client.post("/godgpt/voice/chat", &body).await
}

pub async fn guest_chat(
    client: &ApiClient,
    device_id: &str,
    message: &str,
) -> Result<ApiResponse> {
    let body = json!({"deviceId": device_id, "message": message});
    client.post("/godgpt/guest/chat", &body).await
}

pub async fn rename_session(
    client: &ApiClient,
    session_id: &str,
    title: &str,
) -> Result<ApiResponse> {
    let body = json!({"sessionId": session_id, "title": title});
    client.put("/godgpt/chat/rename", &body).await
}

pub async fn delete_session(client: &ApiClient, session_id: &str) -> Result<ApiResponse> {
    client.delete(&format!("/godgpt/chat/{session_id}")).await
}

pub async fn account_info(client: &ApiClient) -> Result<ApiResponse> {
    client.get("/godgpt/account").await
}

pub async fn update_account(client: &ApiClient, fields: &Value) -> Result<ApiResponse> {
    client.put("/godgpt/account", fields).await
}

pub async fn payment_products(client: &ApiClient) -> Result<ApiResponse> {
    client.get("/godgpt/payment/products").await
}

pub async fn has_apple_subscription(client: &ApiClient) -> Result<ApiResponse> {
    client.get("/godgpt/payment/has-apple-subscription").await
}

pub async fn verify_receipt(
    client: &ApiClient,
    receipt: &str,
    product_id: &str,
    platform: &str,
) -> Result<ApiResponse> {
    let body = json!({"receipt": receipt, "productId": product_id, "platform": platform});
    client.post("/godgpt/payment/verify-receipt", &body).await
}

pub async fn invitation_info(client: &ApiClient) -> Result<ApiResponse> {
    client.get("/godgpt/invitation/info").await
}

pub async fn invitation_credits_history(client: &ApiClient) -> Result<ApiResponse> {
    client.get("/godgpt/invitation/credits/history").await
}

pub async fn redeem_invitation(client: &ApiClient, code: &str) -> Result<ApiResponse> {
    let body = json!({"invitationCode": code});
    client.post("/godgpt/invitation/redeem", &body).await
}

pub async fn share(client: &ApiClient, share_id: &str) -> Result<ApiResponse> {
    client.get(&format!("/godgpt/share/{share_id}")).await
}

pub async fn share_keyword(client: &ApiClient) -> Result<ApiResponse> {
    client.get("/godgpt/share/keyword").await
}
