use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::password::{hash_password, verify_password, PasswordHasher};
use super::token::TokenKeys;
use crate::error::AppError;
use crate::models::user::normalize_email;
use crate::models::User;
use crate::store::UserRepository;

/// Issues, checks and revokes per-device session tokens.
///
/// A token is valid while it is signed with our key and still present in its
/// owner's session list.
#[derive(Clone)]
pub struct SessionManager {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    keys: TokenKeys,
    // Verified against when the email is unknown.
    dummy_hash: Arc<OnceCell<String>>,
}

impl SessionManager {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        keys: TokenKeys,
    ) -> Self {
        Self {
            users,
            hasher,
            keys,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Signs a new token and appends it to the user's session list.
    pub async fn issue_token(&self, user: &User) -> Result<String, AppError> {
        let token = self.keys.generate(user.id)?;
        if !self.users.append_token(user.id, &token).await? {
            return Err(AppError::NotFound("User not found".into()));
        }
        log::debug!("issued session token for user {}", user.id);
        Ok(token)
    }

    /// Resolves a raw token to its owner.
    pub async fn verify_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.keys.decode(token)?;
        self.users
            .find_by_id_and_token(claims.sub, token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Drops one token. Revoking a token that is already gone is a no-op.
    pub async fn revoke_token(&self, user_id: Uuid, token: &str) -> Result<(), AppError> {
        self.users.remove_token(user_id, token).await?;
        Ok(())
    }

    pub async fn revoke_all_tokens(&self, user_id: Uuid) -> Result<(), AppError> {
        self.users.clear_tokens(user_id).await?;
        log::info!("cleared all sessions of user {}", user_id);
        Ok(())
    }

    /// Checks an email/password pair.
    ///
    /// An unknown email and a wrong password fail with the same error.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = normalize_email(email);
        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                let dummy = self
                    .dummy_hash
                    .get_or_try_init(|| {
                        hash_password(self.hasher.clone(), "unused-login-placeholder".into())
                    })
                    .await?;
                verify_password(self.hasher.clone(), password.trim().to_string(), dummy.clone())
                    .await?;
                return Err(AppError::InvalidCredentials);
            }
        };

        let matches = verify_password(
            self.hasher.clone(),
            password.trim().to_string(),
            user.password_hash.clone(),
        )
        .await?;

        if matches {
            Ok(user)
        } else {
            Err(AppError::InvalidCredentials)
        }
    }
}
