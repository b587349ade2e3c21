use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use warp::{
    header::optional,
    http::StatusCode,
    reply::{json as warp_json, with_status},
    Filter, Rejection,
};

use crate::logic::serve::api::password_utils::{hash_password, verify_password};
use crate::logic::serve::auth::{authenticated_user, bearer_token};
use crate::logic::serve::database::{self, Database, Session};
use crate::logic::types::UserInfo;

#[derive(Deserialize)]
struct AccountPayload {
    username: String,
    password: String,
    rootpass: Option<String>,
}

#[derive(Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

/// POST /api/account/register
pub fn register(
    db: Database,
    root_pass: Option<String>,
) -> impl Filter<Extract = impl warp::Reply, Error = Rejection> + Clone {
    warp::post()
        .and(warp::path!("api" / "account" / "register"))
        .and(warp::body::json())
        .map(move |payload: AccountPayload| {
            if payload.username.trim().is_empty() || payload.password.is_empty() {
                return StatusCode::BAD_REQUEST;
            }

            let hashed_password = match hash_password(&payload.password) {
                Ok(h) => h,
                Err(status_code) => return status_code,
            };

            let role = if payload
                .rootpass
                .as_ref()
                .and_then(|rp| root_pass.as_ref().map(|rp2| rp == rp2))
                .unwrap_or(false)
            {
                "root"
            } else {
                "user"
            };

            match database::create_user(&db, &payload.username, &hashed_password, role) {
                Ok(_) => {
                    tracing::info!(username = %payload.username, role, "registered user");
                    StatusCode::CREATED
                }
                Err(status_code) => status_code,
            }
        })
}

/// POST /api/account/login
pub fn login(
    db: Database,
    session_hours: i64,
) -> impl Filter<Extract = impl warp::Reply, Error = Rejection> + Clone {
    warp::post()
        .and(warp::path!("api" / "account" / "login"))
        .and(warp::body::json())
        .map(move |payload: LoginPayload| {
            let err = || {
                with_status(
                    warp_json(&json!({ "error": "invalid credentials" })),
                    StatusCode::UNAUTHORIZED,
                )
            };

            let stored_hash = match database::get_user_password_hash(&db, &payload.username) {
                Ok(Some(hash)) => hash,
                Ok(None) => return err(), // User not found
                Err(status_code) => {
                    return with_status(warp_json(&json!({ "error": "login failed" })), status_code)
                }
            };

            match verify_password(&payload.password, &stored_hash) {
                Ok(true) => {}
                Ok(false) | Err(_) => return err(),
            }

            let token = Uuid::new_v4().to_string();
            let expires_at = Utc::now() + Duration::hours(session_hours);
            match database::store_token(&db, &token, &payload.username, expires_at) {
                Ok(()) => {
                    tracing::info!(username = %payload.username, "login");
                    with_status(
                        warp_json(&json!({ "token": token, "expires_at": expires_at })),
                        StatusCode::OK,
                    )
                }
                Err(status_code) => {
                    with_status(warp_json(&json!({ "error": "login failed" })), status_code)
                }
            }
        })
}

/// POST /api/account/logout
pub fn logout(db: Database) -> impl Filter<Extract = impl warp::Reply, Error = Rejection> + Clone {
    let auth = authenticated_user(db.clone());
    warp::post()
        .and(warp::path!("api" / "account" / "logout"))
        .and(auth)
        .and(optional::<String>("authorization"))
        .map(move |session: Session, auth_header: Option<String>| {
            let Some(token) = auth_header.as_deref().and_then(bearer_token) else {
                return with_status(
                    warp_json(&json!({ "error": "invalid token format" })),
                    StatusCode::BAD_REQUEST,
                );
            };
            match database::revoke_token(&db, token) {
                Ok(_) => {
                    tracing::info!(username = %session.username, "logout, token revoked");
                    with_status(warp_json(&json!({ "message": "logged out" })), StatusCode::OK)
                }
                Err(status_code) => {
                    with_status(warp_json(&json!({ "error": "logout failed" })), status_code)
                }
            }
        })
}

/// GET /api/account/userinfo
pub fn user_info(db: Database) -> impl Filter<Extract = impl warp::Reply, Error = Rejection> + Clone {
    let auth = authenticated_user(db.clone());
    warp::get()
        .and(warp::path!("api" / "account" / "userinfo"))
        .and(auth)
        .map(move |session: Session| {
            let is_root = database::is_root(&db, &session.username).unwrap_or(false);
            warp_json(&UserInfo {
                username: session.username,
                is_root,
            })
        })
}

/// GET /api/account/users
pub fn list_users(db: Database) -> impl Filter<Extract = impl warp::Reply, Error = Rejection> + Clone {
    let auth = authenticated_user(db.clone());
    warp::get()
        .and(warp::path!("api" / "account" / "users"))
        .and(auth)
        .map(move |session: Session| {
            match database::is_root(&db, &session.username) {
                Ok(true) => {}
                Ok(false) => {
                    return with_status(warp_json(&json!({ "error": "forbidden" })), StatusCode::FORBIDDEN)
                }
                Err(status_code) => return with_status(warp_json(&json!({ "error": "error" })), status_code),
            }
            match database::list_all_users(&db) {
                Ok(users) => with_status(warp_json(&users), StatusCode::OK),
                Err(status_code) => with_status(warp_json(&json!({ "error": "error" })), status_code),
            }
        })
}

/// DELETE /api/account/<username>
pub fn delete_user(db: Database) -> impl Filter<Extract = impl warp::Reply, Error = Rejection> + Clone {
    let auth = authenticated_user(db.clone());
    warp::delete()
        .and(warp::path!("api" / "account" / String))
        .and(auth)
        .map(move |target: String, session: Session| {
            match database::is_root(&db, &session.username) {
                Ok(true) => {}
                Ok(false) => return StatusCode::FORBIDDEN,
                Err(status_code) => return status_code,
            }
            // Path segments arrive percent-encoded
            let target = match urlencoding::decode(&target) {
                Ok(name) => name.into_owned(),
                Err(_) => return StatusCode::BAD_REQUEST,
            };
            match database::delete_user(&db, &target) {
                Ok(true) => {
                    tracing::info!(%target, by = %session.username, "deleted user");
                    StatusCode::OK
                }
                Ok(false) => StatusCode::NOT_FOUND,
                Err(status_code) => status_code,
            }
        })
}
