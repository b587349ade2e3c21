use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use warp::http::StatusCode;

pub type Database = Arc<Mutex<Connection>>;

/// An authenticated login session resolved from a token
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Open (or create) the account database. `:memory:` gives a throwaway one.
pub fn init_database<P: AsRef<Path>>(db_path: P) -> anyhow::Result<Database> {
    let conn = Connection::open(db_path)?;

    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            username TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tokens (
            token TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            expires_at INTEGER NOT NULL,
            FOREIGN KEY(username) REFERENCES users(username) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tokens_expires_at ON tokens(expires_at)",
        [],
    )?;

    Ok(Arc::new(Mutex::new(conn)))
}

// User management functions
pub fn create_user(db: &Database, username: &str, password_hash: &str, role: &str) -> Result<(), StatusCode> {
    let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    match conn.execute(
        "INSERT INTO users (username, password_hash, role) VALUES (?1, ?2, ?3)",
        [username, password_hash, role],
    ) {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == rusqlite::ErrorCode::ConstraintViolation => {
            Err(StatusCode::CONFLICT) // User already exists
        }
        Err(e) => {
            tracing::error!(%username, error = %e, "failed to insert user");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub fn get_user_password_hash(db: &Database, username: &str) -> Result<Option<String>, StatusCode> {
    let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    conn.query_row(
        "SELECT password_hash FROM users WHERE username = ?1",
        [username],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

pub fn get_user_role(db: &Database, username: &str) -> Result<Option<String>, StatusCode> {
    let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    conn.query_row(
        "SELECT role FROM users WHERE username = ?1",
        [username],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

pub fn is_root(db: &Database, username: &str) -> Result<bool, StatusCode> {
    Ok(get_user_role(db, username)?.as_deref() == Some("root"))
}

pub fn delete_user(db: &Database, username: &str) -> Result<bool, StatusCode> {
    let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    match conn.execute("DELETE FROM users WHERE username = ?1", [username]) {
        Ok(0) => Ok(false), // No user was deleted
        Ok(_) => Ok(true),  // User was deleted
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub fn list_all_users(db: &Database) -> Result<Value, StatusCode> {
    let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let mut stmt = conn
        .prepare("SELECT username, role, created_at FROM users ORDER BY username")
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let user_iter = stmt
        .query_map([], |row| {
            Ok(json!({
                "username": row.get::<_, String>(0)?,
                "role": row.get::<_, String>(1)?,
                "created_at": row.get::<_, String>(2)?
            }))
        })
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let mut users = Vec::new();
    for user in user_iter {
        users.push(user.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?);
    }

    Ok(Value::Array(users))
}

// Token management functions
pub fn store_token(
    db: &Database,
    token: &str,
    username: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), StatusCode> {
    let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    conn.execute(
        "INSERT INTO tokens (token, username, expires_at) VALUES (?1, ?2, ?3)",
        params![token, username, expires_at.timestamp()],
    )
    .map_err(|e| {
        tracing::error!(%username, error = %e, "failed to store token");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(())
}

/// Resolve a token into its session if it exists and has not expired at `now`
pub fn validate_token(db: &Database, token: &str, now: DateTime<Utc>) -> Result<Option<Session>, StatusCode> {
    let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let row = conn
        .query_row(
            "SELECT username, expires_at FROM tokens WHERE token = ?1 AND expires_at > ?2",
            params![token, now.timestamp()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(row.and_then(|(username, expires)| {
        Utc.timestamp_opt(expires, 0)
            .single()
            .map(|expires_at| Session { username, expires_at })
    }))
}

pub fn revoke_token(db: &Database, token: &str) -> Result<bool, StatusCode> {
    let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    match conn.execute("DELETE FROM tokens WHERE token = ?1", [token]) {
        Ok(0) => Ok(false),
        Ok(_) => Ok(true),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// Drop every token that expired before `now`; returns how many went away
pub fn cleanup_expired_tokens(db: &Database, now: DateTime<Utc>) -> Result<usize, StatusCode> {
    let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    conn.execute(
        "DELETE FROM tokens WHERE expires_at <= ?1",
        params![now.timestamp()],
    )
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn db_with_user(name: &str, role: &str) -> Database {
        let db = init_database(":memory:").unwrap();
        create_user(&db, name, "hash", role).unwrap();
        db
    }

    #[test]
    fn duplicate_user_is_conflict() {
        let db = db_with_user("alice", "user");
        assert_eq!(create_user(&db, "alice", "other", "user"), Err(StatusCode::CONFLICT));
    }

    #[test]
    fn roles_are_stored() {
        let db = db_with_user("root_user", "root");
        create_user(&db, "bob", "hash", "user").unwrap();
        assert!(is_root(&db, "root_user").unwrap());
        assert!(!is_root(&db, "bob").unwrap());
        assert!(!is_root(&db, "nobody").unwrap());
    }

    #[test]
    fn token_lifecycle() {
        let db = db_with_user("alice", "user");
        let now = Utc::now();
        store_token(&db, "tok", "alice", now + Duration::hours(1)).unwrap();

        let session = validate_token(&db, "tok", now).unwrap().unwrap();
        assert_eq!(session.username, "alice");
        assert!(!session.is_expired(now));

        assert!(revoke_token(&db, "tok").unwrap());
        assert!(validate_token(&db, "tok", now).unwrap().is_none());
        assert!(!revoke_token(&db, "tok").unwrap());
    }

    #[test]
    fn expired_tokens_do_not_validate() {
        let db = db_with_user("alice", "user");
        let now = Utc::now();
        store_token(&db, "old", "alice", now - Duration::seconds(1)).unwrap();
        store_token(&db, "new", "alice", now + Duration::hours(1)).unwrap();

        assert!(validate_token(&db, "old", now).unwrap().is_none());
        assert_eq!(cleanup_expired_tokens(&db, now).unwrap(), 1);
        assert!(validate_token(&db, "new", now).unwrap().is_some());
    }

    #[test]
    fn deleting_user_drops_their_tokens() {
        let db = db_with_user("alice", "user");
        let now = Utc::now();
        store_token(&db, "tok", "alice", now + Duration::hours(1)).unwrap();

        assert!(delete_user(&db, "alice").unwrap());
        assert!(validate_token(&db, "tok", now).unwrap().is_none());
        assert!(!delete_user(&db, "alice").unwrap());
    }

    #[test]
    fn users_are_listed_in_name_order() {
        let db = db_with_user("zed", "user");
        create_user(&db, "amy", "hash", "root").unwrap();
        let users = list_all_users(&db).unwrap();
        let names: Vec<&str> = users
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["username"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["amy", "zed"]);
    }
}
