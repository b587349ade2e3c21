use warp::{reply::json as warp_json, Filter, Rejection};

use crate::logic::serve::auth::authenticated_user;
use crate::logic::serve::database::{Database, Session};
use crate::logic::serve::hub::TimeHub;
use crate::logic::types::{HealthStatus, InitialState};

/// GET /api/initial_state: latest ticked value for a freshly opened display
pub fn initial_state(
    db: Database,
    hub: TimeHub,
) -> impl Filter<Extract = impl warp::Reply, Error = Rejection> + Clone {
    warp::get()
        .and(warp::path!("api" / "initial_state"))
        .and(authenticated_user(db))
        .and_then(move |_: Session| {
            let hub = hub.clone();
            async move {
                let current = hub.current().await;
                Ok::<_, Rejection>(warp_json(&InitialState { current }))
            }
        })
}

/// GET /health
pub fn health() -> impl Filter<Extract = impl warp::Reply, Error = Rejection> + Clone {
    warp::get()
        .and(warp::path!("health"))
        .map(|| warp_json(&HealthStatus::ok()))
}
