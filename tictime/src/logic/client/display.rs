use colored::*;
use serde::Deserialize;
use std::io::{self, Write};

use crate::logic::types::InitialState;

/// Anything that can show the latest time value
pub trait DisplaySink {
    fn render(&mut self, value: &str);

    /// Connection-level notices (reconnecting, giving up, ...)
    fn notice(&mut self, _text: &str) {}
}

/// Writes each value to stdout, either one per line or rewriting a single line
pub struct Terminal {
    inline: bool,
}

impl Terminal {
    pub fn new(inline: bool) -> Self {
        Self { inline }
    }
}

impl DisplaySink for Terminal {
    fn render(&mut self, value: &str) {
        let mut out = io::stdout().lock();
        if self.inline {
            let _ = write!(out, "\r\x1b[2K{}", value.bright_white().bold());
        } else {
            let _ = writeln!(out, "{}", value);
        }
        let _ = out.flush();
    }

    fn notice(&mut self, text: &str) {
        if self.inline {
            eprintln!();
        }
        eprintln!("{}", text.yellow());
    }
}

#[derive(Deserialize)]
struct Frame {
    message: FrameMessage,
}

#[derive(Deserialize)]
struct FrameMessage {
    time: serde_json::Value,
}

/// Pull `message.time` out of a socket frame. Non-string values are shown as JSON;
/// a missing or `null` time, or a frame that is not JSON, yields `None`.
pub fn time_from_frame(text: &str) -> Option<String> {
    let frame: Frame = serde_json::from_str(text).ok()?;
    match frame.message.time {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Render one socket frame; returns whether anything was shown
pub fn apply_frame(display: &mut dyn DisplaySink, text: &str) -> bool {
    match time_from_frame(text) {
        Some(value) => {
            display.render(&value);
            true
        }
        None => {
            tracing::debug!(frame = text, "ignoring frame without message.time");
            false
        }
    }
}

/// Render the initial state if the server has one yet
pub fn apply_initial_state(display: &mut dyn DisplaySink, state: &InitialState) -> bool {
    match &state.current {
        Some(value) => {
            display.render(value);
            true
        }
        None => false,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Default)]
    pub(crate) struct Recording {
        pub rendered: Vec<String>,
        pub notices: Vec<String>,
    }

    impl DisplaySink for Recording {
        fn render(&mut self, value: &str) {
            self.rendered.push(value.to_string());
        }

        fn notice(&mut self, text: &str) {
            self.notices.push(text.to_string());
        }
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
    fn socket_frame_renders_message_time() {
        let mut display = Recording::default();
        assert!(apply_frame(&mut display, r#"{"message":{"time":"12:34:56"}}"#));
        assert_eq!(display.rendered, vec!["12:34:56"]);
    }

    #[test]
    fn malformed_frames_leave_display_alone() {
        let mut display = Recording::default();
        assert!(!apply_frame(&mut display, "not json"));
        assert!(!apply_frame(&mut display, r#"{"message":{}}"#));
        assert!(!apply_frame(&mut display, r#"{"time":"12:00:00"}"#));
        assert!(display.rendered.is_empty());
    }

    #[test]
    fn initial_state_renders_current() {
        let mut display = Recording::default();
        assert!(!apply_initial_state(&mut display, &InitialState { current: None }));
        assert!(apply_initial_state(
            &mut display,
            &InitialState { current: Some("01:02:03".into()) }
        ));
        assert_eq!(display.rendered, vec!["01:02:03"]);
    }
}
