use crate::errors::ServiceError;

const BCRYPT_COST: u32 = 10;

/// Hashes on the blocking pool; bcrypt is CPU bound
pub async fn hash_password(password: String) -> Result<String, ServiceError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| ServiceError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| ServiceError::Internal(format!("Password hashing failed: {}", e)))
}

pub async fn verify_password(password: String, password_hash: String) -> Result<bool, ServiceError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
        .await
        .map_err(|e| ServiceError::Internal(format!("Password check task failed: {}", e)))?
        .map_err(|e| ServiceError::Internal(format!("Password check failed: {}", e)))
}
