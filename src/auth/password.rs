use actix_web::web;
use bcrypt::{hash, verify};
use std::sync::Arc;

use crate::error::AppError;

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AppError>;

    /// `Ok(false)` for a mismatch; errors are reserved for unusable hashes.
    fn verify(&self, password: &str, password_hash: &str) -> Result<bool, AppError>;
}

/// bcrypt with a configurable work factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(8)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost)
            .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
    }

    fn verify(&self, password: &str, password_hash: &str) -> Result<bool, AppError> {
        verify(password, password_hash)
            .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
    }
}

/// Hashes on the blocking pool so request workers stay free.
pub async fn hash_password(
    hasher: Arc<dyn PasswordHasher>,
    password: String,
) -> Result<String, AppError> {
    web::block(move || hasher.hash(&password)).await?
}

pub async fn verify_password(
    hasher: Arc<dyn PasswordHasher>,
    password: String,
    password_hash: String,
) -> Result<bool, AppError> {
    web::block(move || hasher.verify(&password, &password_hash)).await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing_and_verification() {
        let hasher = BcryptHasher::new(4);
        let password = "test_secret123";
        let hashed = hasher.hash(password).unwrap();

        assert_ne!(hashed, password);
        assert!(hasher.verify(password, &hashed).unwrap());
        assert!(!hasher.verify("wrong_secret", &hashed).unwrap());
    }

    #[test]
    fn test_verify_with_invalid_hash() {
        let hasher = BcryptHasher::new(4);
        match hasher.verify("test_secret123", "invalidhashformat") {
            Err(AppError::InternalServerError(msg)) => {
                assert!(msg.contains("Failed to verify password"));
            }
            Ok(false) => {}
            Ok(true) => panic!("Password verification should fail for invalid hash format"),
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }

    #[actix_rt::test]
    async fn test_blocking_helpers() {
        let hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptHasher::new(4));
        let hashed = hash_password(hasher.clone(), "abc12345".to_string()).await.unwrap();
        assert!(verify_password(hasher, "abc12345".to_string(), hashed).await.unwrap());
    }
}
