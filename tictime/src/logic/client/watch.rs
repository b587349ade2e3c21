//! `tictime watch`: a terminal rendition of the browser display.
//!
//! Opens the time socket, renders every tick, fetches the initial state on
//! each (re)connect, and reconnects on a fixed backoff ladder when the
//! connection drops.

use futures_util::{Stream, StreamExt};
use reqwest::Client;
use std::time::Duration;
use tokio_tungstenite::tungstenite::{
    self,
    client::IntoClientRequest,
    http::{header::AUTHORIZATION, HeaderValue},
    Message,
};

use crate::logic::client::display::{apply_frame, apply_initial_state, DisplaySink, Terminal};
use crate::logic::client::error::{ClientError, ClientResult};
use crate::logic::client::state::fetch_initial_state;
use crate::logic::client::url_utils::Endpoint;
use crate::logic::client::Outcome;

/// Reconnect delays in milliseconds; the last step repeats
pub const BACKOFF_MS: [u64; 5] = [500, 1_000, 2_000, 4_000, 8_000];

#[derive(Debug, Default)]
pub struct Backoff {
    index: usize,
}

impl Backoff {
    pub fn next_delay(&mut self) -> Duration {
        let ms = BACKOFF_MS[self.index.min(BACKOFF_MS.len() - 1)];
        self.index = (self.index + 1).min(BACKOFF_MS.len() - 1);
        Duration::from_millis(ms)
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }
}

#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Consecutive failed reconnects before giving up; 0 retries forever
    pub max_attempts: usize,
    /// Stop after this many rendered updates
    pub count: Option<usize>,
    /// Rewrite a single terminal line instead of printing one per update
    pub inline: bool,
}

fn done(count: Option<usize>, shown: usize) -> bool {
    count.map_or(false, |c| shown >= c)
}

async fn connect(
    endpoint: &Endpoint,
    token: &str,
) -> ClientResult<tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>> {
    let url = endpoint.ws_url("/time/tic/")?;
    let mut request = url.as_str().into_client_request()?;
    let bearer = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| ClientError::Unauthorized)?;
    request.headers_mut().insert(AUTHORIZATION, bearer);

    match tokio_tungstenite::connect_async(request).await {
        Ok((stream, _)) => Ok(stream),
        Err(tungstenite::Error::Http(resp)) if resp.status().as_u16() == 401 => Err(ClientError::Unauthorized),
        Err(e) => Err(e.into()),
    }
}

/// Render frames until the socket ends or `budget` updates were shown
pub async fn pump<S>(mut stream: S, display: &mut dyn DisplaySink, budget: Option<usize>) -> usize
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let mut shown = 0;
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if apply_frame(display, &text) {
                    shown += 1;
                    if done(budget, shown) {
                        break;
                    }
                }
            }
            Ok(Message::Close(frame)) => {
                if let Some(frame) = frame {
                    tracing::debug!(code = u16::from(frame.code), reason = %frame.reason, "server closed socket");
                    display.notice(&format!("server closed the connection: {}", frame.reason));
                }
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "socket read failed");
                break;
            }
        }
    }
    shown
}

/// Drive the display until `count` is reached, auth fails, or reconnects run out
pub async fn watch(
    endpoint: &Endpoint,
    token: &str,
    options: &WatchOptions,
    display: &mut dyn DisplaySink,
) -> ClientResult<usize> {
    let client = Client::new();
    let mut backoff = Backoff::default();
    let mut failures = 0usize;
    let mut shown = 0usize;

    loop {
        match connect(endpoint, token).await {
            Ok(stream) => {
                backoff.reset();
                failures = 0;
                tracing::info!(url = %endpoint.ws_url("/time/tic/")?, "socket open");

                match fetch_initial_state(&client, endpoint, token).await {
                    Ok(state) => {
                        if apply_initial_state(display, &state) {
                            shown += 1;
                        }
                    }
                    Err(ClientError::Unauthorized) => return Err(ClientError::Unauthorized),
                    Err(e) => tracing::warn!(error = %e, "initial state unavailable"),
                }
                if done(options.count, shown) {
                    return Ok(shown);
                }

                let budget = options.count.map(|c| c - shown);
                shown += pump(stream, display, budget).await;
                if done(options.count, shown) {
                    return Ok(shown);
                }
            }
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => tracing::debug!(error = %e, "connect failed"),
        }

        failures += 1;
        if options.max_attempts > 0 && failures > options.max_attempts {
            return Err(ClientError::GaveUp(options.max_attempts));
        }
        let delay = backoff.next_delay();
        display.notice(&format!("disconnected, reconnecting in {} ms", delay.as_millis()));
        tokio::time::sleep(delay).await;
    }
}

/// `tictime watch`
pub async fn run(endpoint: Endpoint, token: String, options: WatchOptions) -> anyhow::Result<Outcome> {
    let mut display = Terminal::new(options.inline);

    let outcome = tokio::select! {
        result = watch(&endpoint, &token, &options, &mut display) => match result {
            Ok(_) => Outcome::Done,
            Err(ClientError::Unauthorized) => {
                eprintln!("✗ Session rejected: please run `tictime account login` again");
                Outcome::Failed
            }
            Err(e) => {
                eprintln!("✗ {}", e);
                Outcome::Failed
            }
        },
        _ = tokio::signal::ctrl_c() => Outcome::Done,
    };

    if options.inline {
        println!();
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::client::display::tests::Recording;
    use futures_util::stream;

    #[test]
    fn backoff_ladder_caps_and_resets() {
        let mut backoff = Backoff::default();
        let delays: Vec<u64> = (0..7).map(|_| backoff.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![500, 1_000, 2_000, 4_000, 8_000, 8_000, 8_000]);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn pump_renders_text_frames_until_close() {
        let frames = vec![
            Ok(Message::Text(r#"{"message":{"time":"10:00:00"}}"#.into())),
            Ok(Message::Ping(vec![1])),
            Ok(Message::Text("garbage".into())),
            Ok(Message::Text(r#"{"message":{"time":"10:00:01"}}"#.into())),
            Ok(Message::Close(None)),
            Ok(Message::Text(r#"{"message":{"time":"never"}}"#.into())),
        ];
        let mut display = Recording::default();
        let shown = pump(stream::iter(frames), &mut display, None).await;

        assert_eq!(shown, 2);
        assert_eq!(display.rendered, vec!["10:00:00", "10:00:01"]);
    }

    #[tokio::test]
    async fn pump_stops_at_budget() {
        let frames = (0..5)
            .map(|i| Ok(Message::Text(format!(r#"{{"message":{{"time":"{}"}}}}"#, i))))
            .collect::<Vec<_>>();
        let mut display = Recording::default();
        assert_eq!(pump(stream::iter(frames), &mut display, Some(3)).await, 3);
        assert_eq!(display.rendered, vec!["0", "1", "2"]);
    }

    #[tokio::test]
    async fn rejected_handshake_is_fatal() {
        let db = crate::logic::serve::database::init_database(":memory:").unwrap();
        let hub = crate::logic::serve::hub::TimeHub::new(4);
        let (addr, server) = warp::serve(crate::logic::serve::routes(db, hub, None, 24))
            .bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let endpoint = Endpoint::new(None, "127.0.0.1".into(), addr.port());
        assert!(matches!(
            connect(&endpoint, "not-a-token").await,
            Err(ClientError::Unauthorized)
        ));

        // One retry allowed: a retryable failure would end in GaveUp instead
        let options = WatchOptions {
            max_attempts: 1,
            ..WatchOptions::default()
        };
        let mut display = Recording::default();
        let result = watch(&endpoint, "not-a-token", &options, &mut display).await;
        assert!(matches!(result, Err(ClientError::Unauthorized)));
        assert!(display.notices.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn watch_gives_up_when_server_is_gone() {
        // Nothing listens on port 1
        let endpoint = Endpoint::new(None, "127.0.0.1".into(), 1);
        let options = WatchOptions {
            max_attempts: 2,
            ..WatchOptions::default()
        };
        let mut display = Recording::default();
        let result = watch(&endpoint, "token", &options, &mut display).await;

        assert!(matches!(result, Err(ClientError::GaveUp(2))));
        assert_eq!(display.notices.len(), 2);
    }
}
