//! User records: registration, lookup, profile updates and account removal.
//!
//! Every write is normalized first (trim, lowercase email) and validated after,
//! so stored records always satisfy the field rules. Passwords reach the
//! repository only as hashes.

use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::password::{hash_password, PasswordHasher};
use crate::error::AppError;
use crate::models::user::normalize_email;
use crate::models::{NewUserRecord, RegisterRequest, User, UserChanges, UserPatch};
use crate::store::{TaskRepository, UserRepository};

#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserRepository>,
    tasks: Arc<dyn TaskRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl CredentialStore {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tasks: Arc<dyn TaskRepository>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            users,
            tasks,
            hasher,
        }
    }

    pub async fn create(&self, request: RegisterRequest) -> Result<User, AppError> {
        let request = request.normalized();
        request.validate()?;

        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }

        let password_hash = hash_password(self.hasher.clone(), request.password).await?;
        // The repository still rejects a racing insert of the same email.
        let user = self
            .users
            .insert(NewUserRecord {
                name: request.name,
                email: request.email,
                password_hash,
                age: request.age.unwrap_or(0),
            })
            .await?;

        log::info!("registered user {}", user.id);
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.users.find_by_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.users.find_by_email(&normalize_email(email)).await
    }

    /// Applies an already allow-listed patch.
    pub async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User, AppError> {
        let patch = patch.normalized();
        patch.validate()?;

        if patch.is_empty() {
            return self
                .users
                .find_by_id(id)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".into()));
        }

        let password_hash = match patch.password {
            Some(password) => Some(hash_password(self.hasher.clone(), password).await?),
            None => None,
        };

        let changes = UserChanges {
            name: patch.name,
            email: patch.email,
            password_hash,
            age: patch.age,
        };

        self.users
            .update(id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    /// Removes the user together with every task they own.
    pub async fn delete(&self, id: Uuid) -> Result<User, AppError> {
        let user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        let removed = self.tasks.delete_by_owner(id).await?;
        if !self.users.delete(id).await? {
            return Err(AppError::NotFound("User not found".into()));
        }

        log::info!("deleted user {} and {} task(s)", id, removed);
        Ok(user)
    }

    pub async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> Result<(), AppError> {
        if self.users.set_avatar(id, avatar).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("User not found".into()))
        }
    }
}
