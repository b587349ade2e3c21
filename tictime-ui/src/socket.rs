//! A WebSocket that reopens itself.
//!
//! Wraps `web_sys::WebSocket`. On close it waits the next step of a fixed
//! backoff ladder and opens a fresh socket to the same URL; a successful open
//! resets the ladder. A close with [`SESSION_EXPIRED`] stops reconnecting, as
//! does dropping the [`ReconnectingSocket`].

use gloo_timers::callback::Timeout;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, MessageEvent, WebSocket};
use yew::Callback;

/// Reconnect delays in milliseconds; the last step repeats
pub const BACKOFF_MS: [u32; 5] = [500, 1_000, 2_000, 4_000, 8_000];

/// Close code the server sends when the login behind a socket runs out
pub const SESSION_EXPIRED: u16 = 4001;

pub fn backoff_delay(attempt: usize) -> u32 {
    BACKOFF_MS[attempt.min(BACKOFF_MS.len() - 1)]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    /// Whether this socket got as far as `open` before closing
    pub was_open: bool,
}

impl CloseInfo {
    pub fn session_expired(&self) -> bool {
        self.code == SESSION_EXPIRED
    }

    /// A refused handshake (e.g. HTTP 401) surfaces only as a close before open
    pub fn needs_auth_check(&self) -> bool {
        !self.was_open && !self.session_expired()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        }
    }
}

pub struct SocketHandlers {
    pub on_open: Callback<()>,
    pub on_message: Callback<String>,
    pub on_status: Callback<ConnectionStatus>,
    pub on_close: Callback<CloseInfo>,
}

struct Inner {
    url: String,
    handlers: SocketHandlers,
    ws: Option<WebSocket>,
    open: bool,
    attempt: usize,
    closed: bool,
    retry: Option<Timeout>,
    // Closures retained so the browser can keep calling them
    _on_open: Option<Closure<dyn FnMut()>>,
    _on_message: Option<Closure<dyn FnMut(MessageEvent)>>,
    _on_close: Option<Closure<dyn FnMut(CloseEvent)>>,
}

pub struct ReconnectingSocket {
    inner: Rc<RefCell<Inner>>,
}

impl ReconnectingSocket {
    pub fn open(url: String, handlers: SocketHandlers) -> Self {
        let inner = Rc::new(RefCell::new(Inner {
            url,
            handlers,
            ws: None,
            open: false,
            attempt: 0,
            closed: false,
            retry: None,
            _on_open: None,
            _on_message: None,
            _on_close: None,
        }));
        connect(&inner);
        Self { inner }
    }

    /// Close the socket and stop reconnecting
    pub fn close(&self) {
        let mut s = self.inner.borrow_mut();
        if s.closed {
            return;
        }
        s.closed = true;
        s.retry = None;
        if let Some(ws) = s.ws.take() {
            ws.set_onopen(None);
            ws.set_onmessage(None);
            ws.set_onclose(None);
            let _ = ws.close();
        }
        let on_status = s.handlers.on_status.clone();
        drop(s);
        on_status.emit(ConnectionStatus::Closed);
    }
}

impl Drop for ReconnectingSocket {
    fn drop(&mut self) {
        self.close();
    }
}

fn connect(inner: &Rc<RefCell<Inner>>) {
    let url = inner.borrow().url.clone();
    let ws = match WebSocket::new(&url) {
        Ok(ws) => ws,
        Err(e) => {
            gloo_console::error!("WebSocket open failed:", e);
            schedule_reconnect(inner);
            return;
        }
    };

    // Closures hold a Weak so the socket never keeps itself alive
    let on_open = {
        let weak = Rc::downgrade(inner);
        Closure::wrap(Box::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            let (on_status, on_open) = {
                let mut s = inner.borrow_mut();
                s.open = true;
                s.attempt = 0;
                (s.handlers.on_status.clone(), s.handlers.on_open.clone())
            };
            on_status.emit(ConnectionStatus::Connected);
            on_open.emit(());
        }) as Box<dyn FnMut()>)
    };

    let on_message = {
        let weak = Rc::downgrade(inner);
        Closure::wrap(Box::new(move |event: MessageEvent| {
            let Some(inner) = weak.upgrade() else { return };
            if let Some(text) = event.data().as_string() {
                let on_message = inner.borrow().handlers.on_message.clone();
                on_message.emit(text);
            }
        }) as Box<dyn FnMut(MessageEvent)>)
    };

    // `error` is always followed by `close`, so close alone drives reconnects
    let on_close = {
        let weak: Weak<RefCell<Inner>> = Rc::downgrade(inner);
        Closure::wrap(Box::new(move |event: CloseEvent| {
            let Some(inner) = weak.upgrade() else { return };
            let (info, on_close) = {
                let s = inner.borrow();
                if s.closed {
                    return;
                }
                let info = CloseInfo {
                    code: event.code(),
                    was_open: s.open,
                };
                (info, s.handlers.on_close.clone())
            };
            gloo_console::debug!("socket closed, code", info.code);
            on_close.emit(info);

            if info.session_expired() {
                let on_status = {
                    let mut s = inner.borrow_mut();
                    s.closed = true;
                    s.ws = None;
                    s.handlers.on_status.clone()
                };
                on_status.emit(ConnectionStatus::Closed);
            } else {
                schedule_reconnect(&inner);
            }
        }) as Box<dyn FnMut(CloseEvent)>)
    };

    ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));
    ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
    ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

    let mut s = inner.borrow_mut();
    s.ws = Some(ws);
    s.open = false;
    s._on_open = Some(on_open);
    s._on_message = Some(on_message);
    s._on_close = Some(on_close);
}

fn schedule_reconnect(inner: &Rc<RefCell<Inner>>) {
    let (delay, on_status) = {
        let mut s = inner.borrow_mut();
        if s.closed {
            return;
        }
        let delay = backoff_delay(s.attempt);
        s.attempt += 1;
        (delay, s.handlers.on_status.clone())
    };
    on_status.emit(ConnectionStatus::Reconnecting);

    let weak = Rc::downgrade(inner);
    let retry = Timeout::new(delay, move || {
        if let Some(inner) = weak.upgrade() {
            if !inner.borrow().closed {
                connect(&inner);
            }
        }
    });
    inner.borrow_mut().retry = Some(retry);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_ladder_caps() {
        let delays: Vec<u32> = (0..7).map(backoff_delay).collect();
        assert_eq!(delays, vec![500, 1_000, 2_000, 4_000, 8_000, 8_000, 8_000]);
    }

    #[test]
    fn expired_session_close_is_final() {
        let expired = CloseInfo {
            code: SESSION_EXPIRED,
            was_open: true,
        };
        assert!(expired.session_expired());
        assert!(!expired.needs_auth_check());
    }

    #[test]
    fn close_before_open_asks_for_auth_check() {
        let refused = CloseInfo {
            code: 1006,
            was_open: false,
        };
        assert!(!refused.session_expired());
        assert!(refused.needs_auth_check());

        let dropped = CloseInfo {
            code: 1006,
            was_open: true,
        };
        assert!(!dropped.needs_auth_check());
    }

    #[test]
    fn status_names_match_css_classes() {
        assert_eq!(ConnectionStatus::Connected.as_str(), "connected");
        assert_eq!(ConnectionStatus::Reconnecting.as_str(), "reconnecting");
    }
}
