use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not logged in: please run `tictime account login` first")]
    NotLoggedIn,

    #[error("server rejected the login token")]
    Unauthorized,

    #[error("gave up after {0} failed reconnect attempts")]
    GaveUp(usize),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("websocket failed: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Connection trouble is worth another attempt; auth and config problems are not
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::WebSocket(e) => !is_auth_failure(e),
            ClientError::Http(e) => e.is_connect() || e.is_timeout(),
            ClientError::Status { status, .. } => *status >= 500,
            ClientError::Io(_) => true,
            _ => false,
        }
    }
}

fn is_auth_failure(e: &tokio_tungstenite::tungstenite::Error) -> bool {
    matches!(
        e,
        tokio_tungstenite::tungstenite::Error::Http(resp)
            if resp.status().as_u16() == 401
    )
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_are_fatal() {
        assert!(!ClientError::Unauthorized.is_retryable());
        assert!(!ClientError::NotLoggedIn.is_retryable());
        assert!(ClientError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(!ClientError::Status { status: 404, body: String::new() }.is_retryable());
    }
}
