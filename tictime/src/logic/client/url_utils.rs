/// Utility functions for building URLs for API and socket requests
/// Supports both traditional host:port format and modern base URL format
use url::Url;

use crate::logic::client::error::ClientResult;

/// Where the client talks to: a full base URL wins over host/port
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub base_url: Option<String>,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(base_url: Option<String>, host: String, port: u16) -> Self {
        Self { base_url, host, port }
    }

    pub fn api_url(&self, path: &str) -> String {
        build_api_url(self.base_url.as_deref(), &self.host, self.port, path)
    }

    /// API URL with each segment percent-encoded, e.g. `["api", "account", name]`
    pub fn api_url_segments(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = Url::parse(&self.api_url("/"))?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn ws_url(&self, path: &str) -> ClientResult<Url> {
        build_ws_url(&self.api_url(path))
    }
}

/// Build API URL from either base_url or host/port combination
///
/// If base_url is provided, it takes precedence and should include the protocol.
/// Otherwise, constructs URL from host and port using http as default protocol.
pub fn build_api_url(
    base_url: Option<&str>,
    host: &str,
    port: u16,
    path: &str,
) -> String {
    if let Some(base) = base_url {
        format!("{}{}", base.trim_end_matches('/'), path)
    } else if host.starts_with("http://") || host.starts_with("https://") {
        // Host already includes protocol, use as-is
        format!("{}{}", host.trim_end_matches('/'), path)
    } else {
        format!("http://{}:{}{}", host, port, path)
    }
}

/// Socket scheme matching the transport of an HTTP scheme
pub fn ws_scheme(http_scheme: &str) -> &'static str {
    if http_scheme == "https" {
        "wss"
    } else {
        "ws"
    }
}

/// Turn an `http(s)://` URL into the matching `ws(s)://` one
pub fn build_ws_url(http_url: &str) -> ClientResult<Url> {
    let mut url = Url::parse(http_url)?;
    let scheme = ws_scheme(url.scheme());
    // http→ws and https→wss are both "special" scheme swaps, which Url allows
    let _ = url.set_scheme(scheme);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_api_url_with_base_url() {
        let url = build_api_url(Some("https://sub.domain.com"), "127.0.0.1", 3030, "/api/initial_state");
        assert_eq!(url, "https://sub.domain.com/api/initial_state");
    }

    #[test]
    fn test_build_api_url_with_base_url_trailing_slash() {
        let url = build_api_url(Some("https://sub.domain.com/"), "127.0.0.1", 3030, "/api/initial_state");
        assert_eq!(url, "https://sub.domain.com/api/initial_state");
    }

    #[test]
    fn test_build_api_url_without_base_url() {
        let url = build_api_url(None, "127.0.0.1", 3030, "/api/initial_state");
        assert_eq!(url, "http://127.0.0.1:3030/api/initial_state");
    }

    #[test]
    fn test_build_api_url_host_with_protocol() {
        let url = build_api_url(None, "https://example.com:8443", 3030, "/health");
        assert_eq!(url, "https://example.com:8443/health");
    }

    #[test]
    fn test_api_url_segments_are_encoded() {
        let endpoint = Endpoint::new(None, "127.0.0.1".into(), 3030);
        let url = endpoint.api_url_segments(&["api", "account", "a/b?c#d"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:3030/api/account/a%2Fb%3Fc%23d");
        assert_eq!(url.path_segments().unwrap().last(), Some("a%2Fb%3Fc%23d"));

        let prefixed = Endpoint::new(Some("https://example.com/clock/".into()), String::new(), 0);
        let url = prefixed.api_url_segments(&["api", "account", "bob"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/clock/api/account/bob");
    }

    #[test]
    fn test_ws_url_follows_transport() {
        let plain = Endpoint::new(None, "127.0.0.1".into(), 3030);
        assert_eq!(plain.ws_url("/time/tic/").unwrap().as_str(), "ws://127.0.0.1:3030/time/tic/");

        let secure = Endpoint::new(Some("https://clock.example.com".into()), String::new(), 0);
        assert_eq!(secure.ws_url("/time/tic/").unwrap().as_str(), "wss://clock.example.com/time/tic/");
    }
}
