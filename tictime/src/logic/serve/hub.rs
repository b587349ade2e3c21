use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::logic::types::TicMessage;

/// Latest time value plus the fan-out group every WebSocket session joins.
///
/// The current value is what `/api/initial_state` serves; the group carries
/// each tick to live sessions. Writers must call [`TimeHub::set_current`]
/// before [`TimeHub::group_send`] so a client that receives tick T and then
/// asks for the initial state never sees anything older than T.
#[derive(Clone)]
pub struct TimeHub {
    current: Arc<RwLock<Option<String>>>,
    group: broadcast::Sender<TicMessage>,
}

impl TimeHub {
    pub fn new(capacity: usize) -> Self {
        let (group, _) = broadcast::channel(capacity.max(1));
        Self {
            current: Arc::new(RwLock::new(None)),
            group,
        }
    }

    pub async fn set_current(&self, value: &str) {
        *self.current.write().await = Some(value.to_string());
    }

    pub async fn current(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    /// Join the group; the receiver sees every tick sent after this call
    pub fn group_add(&self) -> broadcast::Receiver<TicMessage> {
        self.group.subscribe()
    }

    /// Deliver to every member. Returns how many members were reached.
    pub fn group_send(&self, message: TicMessage) -> usize {
        // An empty group is not an error, the tick is simply dropped
        self.group.send(message).unwrap_or(0)
    }

    pub fn member_count(&self) -> usize {
        self.group.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn current_starts_empty() {
        let hub = TimeHub::new(4);
        assert_eq!(hub.current().await, None);
        hub.set_current("10:00:00").await;
        assert_eq!(hub.current().await.as_deref(), Some("10:00:00"));
    }

    #[tokio::test]
    async fn members_receive_ticks_sent_after_joining() {
        let hub = TimeHub::new(4);
        assert_eq!(hub.group_send(TicMessage { time: "early".into() }), 0);

        let mut rx = hub.group_add();
        assert_eq!(hub.member_count(), 1);
        assert_eq!(hub.group_send(TicMessage { time: "late".into() }), 1);
        assert_eq!(rx.recv().await.unwrap().time, "late");

        drop(rx);
        assert_eq!(hub.member_count(), 0);
    }

    #[tokio::test]
    async fn slow_member_lags_instead_of_blocking() {
        let hub = TimeHub::new(2);
        let mut rx = hub.group_add();
        for i in 0..5 {
            hub.group_send(TicMessage { time: i.to_string() });
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        // After the lag the member resumes at the oldest retained tick
        assert_eq!(rx.recv().await.unwrap().time, "3");
    }
}
