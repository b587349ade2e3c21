use wasm_bindgen::prelude::*;
use yew::prelude::*;
use yew::Renderer;
use yew_router::prelude::*;

pub mod api;
mod components;
pub mod socket;

use components::{Display, Login};

#[derive(Clone, Routable, PartialEq)]
pub enum Route {
    #[at("/")]
    Display,
    #[at("/login")]
    Login,
    #[not_found]
    #[at("/404")]
    NotFound,
}

fn switch(route: Route) -> Html {
    match route {
        Route::Display => html! { <Display /> },
        Route::Login => html! { <Login /> },
        Route::NotFound => html! { <Redirect<Route> to={Route::Display} /> },
    }
}

#[function_component(App)]
fn app() -> Html {
    html! {
        <BrowserRouter>
            <Switch<Route> render={switch} />
        </BrowserRouter>
    }
}

/// Mounts the app into `#root` when the module loads
#[wasm_bindgen(start)]
pub fn run_app() {
    let root = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id("root"));
    match root {
        Some(root) => Renderer::<App>::with_root(root).render(),
        None => Renderer::<App>::new().render(),
    };
}
