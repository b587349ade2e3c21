use gloo_storage::{LocalStorage, Storage};
use wasm_bindgen_futures::spawn_local;
use web_sys::Element;
use yew::prelude::*;
use yew_router::prelude::*;

use crate::api::{self, ApiError, TOKEN_KEY};
use crate::socket::{CloseInfo, ConnectionStatus, ReconnectingSocket, SocketHandlers};
use crate::Route;

/// Write a value into the display element, replacing whatever was shown
fn show(display_ref: &NodeRef, value: &str) {
    if let Some(el) = display_ref.cast::<Element>() {
        el.set_inner_html(value);
    }
}

/// Forget the stored login and go back to the login view
fn end_session(navigator: &Navigator) {
    LocalStorage::delete(TOKEN_KEY);
    navigator.push(&Route::Login);
}

#[function_component(Display)]
pub fn display() -> Html {
    let navigator = use_navigator().unwrap();
    let status = use_state(|| ConnectionStatus::Connecting);
    let display_ref = use_node_ref();

    let token = LocalStorage::get::<String>(TOKEN_KEY).ok();

    {
        let navigator = navigator.clone();
        let status = status.clone();
        let display_ref = display_ref.clone();

        use_effect_with_deps(
            move |token: &Option<String>| {
                let socket = match token.clone() {
                    None => {
                        navigator.push(&Route::Login);
                        None
                    }
                    Some(token) => {
                        let on_message = {
                            let display_ref = display_ref.clone();
                            Callback::from(move |text: String| match api::time_from_frame(&text) {
                                Some(value) => show(&display_ref, &value),
                                None => gloo_console::warn!("ignoring frame:", text),
                            })
                        };

                        // Every (re)open re-syncs from the server's current value
                        let on_open = {
                            let display_ref = display_ref.clone();
                            let navigator = navigator.clone();
                            let token = token.clone();
                            Callback::from(move |_: ()| {
                                let display_ref = display_ref.clone();
                                let navigator = navigator.clone();
                                let token = token.clone();
                                spawn_local(async move {
                                    match api::fetch_initial_state(&token).await {
                                        Ok(Some(value)) => show(&display_ref, &value),
                                        Ok(None) => {}
                                        Err(ApiError::Unauthorized) => end_session(&navigator),
                                        Err(e) => {
                                            gloo_console::error!("Failed to fetch initial state:", e.to_string())
                                        }
                                    }
                                });
                            })
                        };

                        let on_status = Callback::from(move |s: ConnectionStatus| status.set(s));

                        // A refused handshake looks like any other close, so ask the API
                        let on_close = {
                            let navigator = navigator.clone();
                            let token = token.clone();
                            Callback::from(move |info: CloseInfo| {
                                if !info.session_expired() && !info.needs_auth_check() {
                                    return;
                                }
                                let navigator = navigator.clone();
                                let token = token.clone();
                                spawn_local(async move {
                                    if info.session_expired() {
                                        gloo_console::log!("session expired");
                                        end_session(&navigator);
                                        return;
                                    }
                                    match api::check_session(&token).await {
                                        Err(ApiError::Unauthorized) => end_session(&navigator),
                                        Ok(()) => {}
                                        Err(e) => gloo_console::debug!("session check failed:", e.to_string()),
                                    }
                                });
                            })
                        };

                        match api::ws_uri_for_location(&token) {
                            Some(url) => Some(ReconnectingSocket::open(
                                url,
                                SocketHandlers {
                                    on_open,
                                    on_message,
                                    on_status,
                                    on_close,
                                },
                            )),
                            None => {
                                gloo_console::error!("cannot determine page location");
                                None
                            }
                        }
                    }
                };

                move || drop(socket)
            },
            token.clone(),
        );
    }

    let logout = {
        let navigator = navigator.clone();
        let token = token.clone();
        Callback::from(move |_| {
            if let Some(token) = token.clone() {
                spawn_local(async move { api::logout(&token).await });
            }
            end_session(&navigator);
        })
    };

    let state = status.as_str();

    html! {
        <div class="display-container">
            <div id="display" ref={display_ref}></div>
            <div class={classes!("connection-status", state)}>{ state }</div>
            <button class="logout-button" onclick={logout}>{ "Log out" }</button>
        </div>
    }
}
