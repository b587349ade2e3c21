use serde::{Deserialize, Serialize};

/// Group name every WebSocket session joins
pub const TIME_GROUP: &str = "time";

/// One tick worth of display data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicMessage {
    pub time: String,
}

/// WebSocket text frame: `{"message": {"time": "..."}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicEnvelope {
    pub message: TicMessage,
}

impl TicEnvelope {
    pub fn new(time: impl Into<String>) -> Self {
        Self {
            message: TicMessage { time: time.into() },
        }
    }
}

/// Body of `GET /api/initial_state`. `current` is null before the first tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialState {
    pub current: Option<String>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Body of `GET /api/account/userinfo`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    pub is_root: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_wire_shape() {
        let frame = serde_json::to_value(TicEnvelope::new("12:00:01")).unwrap();
        assert_eq!(frame, serde_json::json!({ "message": { "time": "12:00:01" } }));
    }

    #[test]
    fn initial_state_before_first_tick_is_null() {
        let body = serde_json::to_string(&InitialState { current: None }).unwrap();
        assert_eq!(body, r#"{"current":null}"#);
    }
}
