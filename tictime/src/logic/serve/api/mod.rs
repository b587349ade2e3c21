pub mod account_routes;
pub mod password_utils;
pub mod state_routes;

use crate::logic::serve::api::account_routes::{delete_user, list_users, login, logout, register, user_info};
use crate::logic::serve::api::state_routes::{health, initial_state};
use crate::logic::serve::database::Database;
use crate::logic::serve::hub::TimeHub;
use warp::Filter;

/// Compose the account, state and health routes into one API filter.
pub fn api_routes(
    db: Database,
    hub: TimeHub,
    root_pass: Option<String>,
    session_hours: i64,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let reg = register(db.clone(), root_pass);
    let log = login(db.clone(), session_hours);
    let out = logout(db.clone());
    let info = user_info(db.clone());
    let list = list_users(db.clone());
    let del = delete_user(db.clone());

    let state = initial_state(db, hub);

    reg.or(log)
        .or(out)
        .or(info)
        .or(list)
        .or(del)
        .or(state)
        .or(health())
}
