use chrono::Utc;
use serde::Deserialize;
use warp::{header::optional, reject::Reject, Filter, Rejection};

use crate::logic::serve::database::{validate_token, Database, Session};

/// Marker for unauthorized rejection
#[derive(Debug)]
pub struct Unauthorized;
impl Reject for Unauthorized {}

#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Pull the token out of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn resolve(db: &Database, token: Option<&str>) -> Result<Session, Rejection> {
    let token = token.ok_or_else(|| warp::reject::custom(Unauthorized))?;
    match validate_token(db, token, Utc::now()) {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(warp::reject::custom(Unauthorized)),
        Err(status) => {
            tracing::warn!(%status, "token lookup failed");
            Err(warp::reject::custom(Unauthorized)) // DB error, treat as unauthorized
        }
    }
}

/// A filter that extracts `Authorization: Bearer <token>` and resolves the session.
pub fn authenticated_user(
    db: Database,
) -> impl Filter<Extract = (Session,), Error = Rejection> + Clone {
    optional::<String>("authorization").and_then(move |auth_header: Option<String>| {
        let db = db.clone();
        async move { resolve(&db, auth_header.as_deref().and_then(bearer_token)) }
    })
}

/// Like [`authenticated_user`], but browsers cannot set headers on a
/// WebSocket handshake, so `?token=<token>` is accepted as well.
pub fn socket_user(
    db: Database,
) -> impl Filter<Extract = (Session,), Error = Rejection> + Clone {
    optional::<String>("authorization")
        .and(warp::query::<TokenQuery>())
        .and_then(move |auth_header: Option<String>, query: TokenQuery| {
            let db = db.clone();
            async move {
                let token = auth_header
                    .as_deref()
                    .and_then(bearer_token)
                    .map(str::to_string)
                    .or(query.token);
                resolve(&db, token.as_deref())
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
    }
}
