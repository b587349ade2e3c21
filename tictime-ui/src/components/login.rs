use gloo_storage::{LocalStorage, Storage};
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;
use yew_router::prelude::*;

use crate::api::{self, ApiError, TOKEN_KEY};
use crate::Route;

#[function_component(Login)]
pub fn login() -> Html {
    let navigator = use_navigator().unwrap();
    let username = use_state(String::new);
    let password = use_state(String::new);
    let error = use_state(|| None::<String>);
    let busy = use_state(|| false);

    let on_username = {
        let username = username.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            username.set(input.value());
        })
    };

    let on_password = {
        let password = password.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            password.set(input.value());
        })
    };

    let onsubmit = {
        let username = username.clone();
        let password = password.clone();
        let error = error.clone();
        let busy = busy.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            let username = (*username).clone();
            let password = (*password).clone();
            let error = error.clone();
            let busy = busy.clone();
            let navigator = navigator.clone();

            busy.set(true);
            spawn_local(async move {
                match api::login(&username, &password).await {
                    Ok(token) => match LocalStorage::set(TOKEN_KEY, token) {
                        Ok(()) => navigator.push(&Route::Display),
                        Err(e) => error.set(Some(format!("could not store session: {}", e))),
                    },
                    Err(ApiError::Unauthorized) => error.set(Some("Invalid username or password".into())),
                    Err(e) => error.set(Some(e.to_string())),
                }
                busy.set(false);
            });
        })
    };

    html! {
        <div class="auth-container">
            <form class="auth-form" {onsubmit}>
                <h1>{ "tictime" }</h1>
                if let Some(message) = (*error).clone() {
                    <div class="error-message">{ message }</div>
                }
                <input
                    type="text"
                    placeholder="Username"
                    value={(*username).clone()}
                    oninput={on_username}
                />
                <input
                    type="password"
                    placeholder="Password"
                    value={(*password).clone()}
                    oninput={on_password}
                />
                <button type="submit" disabled={*busy}>{ "Log in" }</button>
            </form>
        </div>
    }
}
