use gloo_net::http::Request;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Local storage key holding the login token
pub const TOKEN_KEY: &str = "tictime_token";

/// Path of the time broadcast socket
pub const TIC_PATH: &str = "/time/tic/";

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    Unauthorized,
    Status(u16),
    Network(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized => write!(f, "session expired, please log in again"),
            ApiError::Status(code) => write!(f, "server returned HTTP {}", code),
            ApiError::Network(e) => write!(f, "network error: {}", e),
        }
    }
}

#[derive(Deserialize)]
struct InitialState {
    current: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Frame {
    message: FrameMessage,
}

#[derive(Deserialize)]
struct FrameMessage {
    time: serde_json::Value,
}

#[derive(Serialize)]
struct LoginPayload<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

/// Display text for a JSON value: strings as-is, anything else as JSON
fn display_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Pull `message.time` out of a socket frame. Non-string values are shown as JSON;
/// a missing or `null` time, or a frame that is not JSON, yields `None`.
pub fn time_from_frame(text: &str) -> Option<String> {
    let frame: Frame = serde_json::from_str(text).ok()?;
    display_text(frame.message.time)
}

/// `current` out of an initial-state body
pub fn current_from_body(text: &str) -> Option<String> {
    let state: InitialState = serde_json::from_str(text).ok()?;
    state.current.and_then(display_text)
}

/// Socket URI for a page loaded over `protocol` (e.g. `https:`) from `host`
pub fn ws_uri(protocol: &str, host: &str, token: Option<&str>) -> String {
    let scheme = if protocol == "https:" { "wss" } else { "ws" };
    let mut uri = format!("{}://{}{}", scheme, host, TIC_PATH);
    if let Some(token) = token {
        uri.push_str("?token=");
        uri.push_str(&urlencoding::encode(token));
    }
    uri
}

/// [`ws_uri`] for the page this app is running in
pub fn ws_uri_for_location(token: &str) -> Option<String> {
    let location = web_sys::window()?.location();
    let protocol = location.protocol().ok()?;
    let host = location.host().ok()?;
    Some(ws_uri(&protocol, &host, Some(token)))
}

/// GET /api/initial_state
pub async fn fetch_initial_state(token: &str) -> Result<Option<String>, ApiError> {
    let resp = Request::get("/api/initial_state")
        .header("Authorization", &format!("Bearer {}", token))
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    match resp.status() {
        401 => Err(ApiError::Unauthorized),
        200..=299 => {
            let body = resp.text().await.map_err(|e| ApiError::Network(e.to_string()))?;
            Ok(current_from_body(&body))
        }
        code => Err(ApiError::Status(code)),
    }
}

/// GET /api/account/userinfo, used only to learn whether `token` is still accepted
pub async fn check_session(token: &str) -> Result<(), ApiError> {
    let resp = Request::get("/api/account/userinfo")
        .header("Authorization", &format!("Bearer {}", token))
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    match resp.status() {
        401 => Err(ApiError::Unauthorized),
        200..=299 => Ok(()),
        code => Err(ApiError::Status(code)),
    }
}

/// POST /api/account/login, returning the session token
pub async fn login(username: &str, password: &str) -> Result<String, ApiError> {
    let resp = Request::post("/api/account/login")
        .json(&LoginPayload { username, password })
        .map_err(|e| ApiError::Network(e.to_string()))?
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    match resp.status() {
        401 => Err(ApiError::Unauthorized),
        200..=299 => resp
            .json::<LoginResponse>()
            .await
            .map(|r| r.token)
            .map_err(|e| ApiError::Network(e.to_string())),
        code => Err(ApiError::Status(code)),
    }
}

/// POST /api/account/logout; failures are ignored, the local token goes either way
pub async fn logout(token: &str) {
    let _ = Request::post("/api/account/logout")
        .header("Authorization", &format!("Bearer {}", token))
        .send()
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_follows_page_transport() {
        assert_eq!(ws_uri("https:", "clock.example.com", None), "wss://clock.example.com/time/tic/");
        assert_eq!(ws_uri("http:", "localhost:3030", None), "ws://localhost:3030/time/tic/");
    }

    #[test]
    fn token_is_query_encoded() {
        assert_eq!(
            ws_uri("http:", "h", Some("a b/c")),
            "ws://h/time/tic/?token=a%20b%2Fc"
        );
        assert_eq!(
            ws_uri("http:", "h", Some("550e8400-e29b-41d4-a716-446655440000")),
            "ws://h/time/tic/?token=550e8400-e29b-41d4-a716-446655440000"
        );
    }

    #[test]
    fn frame_time_is_extracted() {
        assert_eq!(time_from_frame(r#"{"message":{"time":"12:00:00"}}"#).as_deref(), Some("12:00:00"));
        assert_eq!(time_from_frame(r#"{"message":{"time":42}}"#).as_deref(), Some("42"));
        assert_eq!(time_from_frame(r#"{"message":{"time":null}}"#), None);
        assert_eq!(time_from_frame(r#"{"message":{}}"#), None);
        assert_eq!(time_from_frame(r#"{"time":"12:00:00"}"#), None);
        assert_eq!(time_from_frame("not json"), None);
    }

    #[test]
    fn initial_state_current_is_extracted() {
        assert_eq!(current_from_body(r#"{"current":"09:30:00"}"#).as_deref(), Some("09:30:00"));
        assert_eq!(current_from_body(r#"{"current":null}"#), None);
        assert_eq!(current_from_body(r#"{}"#), None);
    }
}
