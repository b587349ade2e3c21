use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use warp::{
    path::FullPath,
    ws::{Message, WebSocket, Ws},
    Filter, Rejection,
};

use crate::logic::serve::auth::socket_user;
use crate::logic::serve::database::{Database, Session};
use crate::logic::serve::hub::TimeHub;
use crate::logic::types::{TicEnvelope, TicMessage, TIME_GROUP};

/// Close code sent when the login behind a session runs out
const SESSION_EXPIRED: u16 = 4001;

/// Matches `/time/tic/` with or without the trailing slash
fn tic_path() -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::path::full()
        .and_then(|path: FullPath| async move {
            if path.as_str().trim_end_matches('/') == "/time/tic" {
                Ok(())
            } else {
                Err(warp::reject::not_found())
            }
        })
        .untuple_one()
}

/// GET /time/tic/ (upgrade): joins the time group and streams every tick
pub fn tic_socket(
    db: Database,
    hub: TimeHub,
) -> impl Filter<Extract = impl warp::Reply, Error = Rejection> + Clone {
    warp::get()
        .and(tic_path())
        .and(warp::ws())
        .and(socket_user(db))
        .map(move |ws: Ws, session: Session| {
            // Join before the handshake completes so no tick falls in between
            let group = hub.group_add();
            tracing::info!(
                username = %session.username,
                group = TIME_GROUP,
                members = hub.member_count(),
                "socket joined"
            );
            ws.on_upgrade(move |socket| run_session(socket, group, session))
        })
}

/// Text frame for one tick, or `None` once the session has expired
fn tic_frame(session: &Session, message: TicMessage, now: DateTime<Utc>) -> Option<String> {
    if session.is_expired(now) {
        return None;
    }
    serde_json::to_string(&TicEnvelope { message }).ok()
}

async fn run_session(socket: WebSocket, mut group: broadcast::Receiver<TicMessage>, session: Session) {
    let (mut tx, mut rx) = socket.split();

    loop {
        tokio::select! {
            tick = group.recv() => match tick {
                Ok(message) => {
                    let Some(frame) = tic_frame(&session, message, Utc::now()) else {
                        tracing::info!(username = %session.username, "session expired, closing socket");
                        let _ = tx.send(Message::close_with(SESSION_EXPIRED, "session expired")).await;
                        break;
                    };
                    if tx.send(Message::text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(username = %session.username, skipped, "socket lagging, skipping ticks");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = rx.next() => match incoming {
                Some(Ok(msg)) if msg.is_close() => break,
                // Client frames carry no meaning here
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(username = %session.username, error = %e, "socket read error");
                    break;
                }
                None => break,
            },
        }
    }

    tracing::info!(username = %session.username, "socket left");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_in: Duration) -> Session {
        Session {
            username: "alice".into(),
            expires_at: Utc::now() + expires_in,
        }
    }

    #[test]
    fn live_session_gets_envelope() {
        let frame = tic_frame(
            &session(Duration::hours(1)),
            TicMessage { time: "08:00:00".into() },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(frame, r#"{"message":{"time":"08:00:00"}}"#);
    }

    #[test]
    fn expired_session_gets_nothing() {
        let frame = tic_frame(
            &session(Duration::seconds(-1)),
            TicMessage { time: "08:00:00".into() },
            Utc::now(),
        );
        assert!(frame.is_none());
    }
}
