use chrono::{DateTime, Local, TimeZone};
use std::fmt::{Display, Write};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::logic::serve::hub::TimeHub;
use crate::logic::types::TicMessage;

/// Render `now` with a strftime pattern, e.g. `%X` → `14:03:27`.
/// `None` when the pattern holds a specifier chrono cannot render.
pub fn format_time<Tz>(now: &DateTime<Tz>, pattern: &str) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    write!(out, "{}", now.format(pattern)).ok()?;
    Some(out)
}

/// One beat: record the value as current, then fan it out to the group
pub async fn beat(hub: &TimeHub, value: String) -> usize {
    hub.set_current(&value).await;
    hub.group_send(TicMessage { time: value })
}

/// Tick forever at `period`, rendering local time with `pattern`
pub async fn run(hub: TimeHub, period: Duration, pattern: String) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(period_ms = period.as_millis() as u64, %pattern, "ticker started");

    loop {
        interval.tick().await;
        let Some(value) = format_time(&Local::now(), &pattern) else {
            tracing::warn!(%pattern, "time format failed, skipping tick");
            continue;
        };
        let reached = beat(&hub, value).await;
        tracing::trace!(members = reached, "tick");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn default_pattern_is_clock_time() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(format_time(&t, "%X").as_deref(), Some("09:05:07"));
        assert_eq!(format_time(&t, "%H:%M").as_deref(), Some("09:05"));
    }

    #[test]
    fn bad_pattern_yields_nothing() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(format_time(&t, "%Q"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn run_survives_bad_pattern() {
        let hub = TimeHub::new(4);
        let task = tokio::spawn(run(hub.clone(), Duration::from_millis(500), "%Q".into()));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!task.is_finished());
        assert_eq!(hub.current().await, None);
        task.abort();
    }

    #[tokio::test]
    async fn beat_stores_current_before_broadcast() {
        let hub = TimeHub::new(4);
        let mut rx = hub.group_add();

        assert_eq!(beat(&hub, "09:05:07".into()).await, 1);

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.time, "09:05:07");
        assert_eq!(hub.current().await.as_deref(), Some("09:05:07"));
    }

    #[tokio::test(start_paused = true)]
    async fn run_keeps_current_fresh() {
        let hub = TimeHub::new(4);
        let mut rx = hub.group_add();
        let task = tokio::spawn(run(hub.clone(), Duration::from_millis(500), "%X".into()));

        // First tick fires immediately, the second after one period
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        assert!(hub.current().await.is_some());
        task.abort();
    }
}
