use bcrypt::{hash as bcrypt_hash, verify as bcrypt_verify, DEFAULT_COST};
use warp::http::StatusCode;

/// Hashes a password using bcrypt.
pub fn hash_password(password: &str) -> Result<String, StatusCode> {
    bcrypt_hash(password, DEFAULT_COST).map_err(|e| {
        tracing::error!(error = %e, "password hashing failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Verifies a password against a stored hash. A malformed hash counts as a mismatch.
pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, StatusCode> {
    bcrypt_verify(password, hashed_password).map_err(|e| {
        tracing::warn!(error = %e, "password verification failed");
        StatusCode::UNAUTHORIZED
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn garbage_hash_is_unauthorized() {
        assert_eq!(verify_password("x", "not-a-hash"), Err(StatusCode::UNAUTHORIZED));
    }
}
