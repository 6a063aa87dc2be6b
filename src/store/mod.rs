//! Persistence ports for users and tasks.
//!
//! The services only ever talk to these traits. [`PgUserStore`] and
//! [`PgTaskStore`] back them with Postgres; [`InMemoryStore`] backs both with
//! process memory for tests and database-less development.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewUserRecord, Task, TaskPatch, User, UserChanges};
use crate::query::TaskQuery;

pub use memory::InMemoryStore;
pub use postgres::{PgTaskStore, PgUserStore};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a user. Fails with `DuplicateEmail` when the email is taken.
    async fn insert(&self, user: NewUserRecord) -> Result<User, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Finds the user only if `token` is still in its session list.
    async fn find_by_id_and_token(&self, id: Uuid, token: &str) -> Result<Option<User>, AppError>;

    /// Applies `changes` and bumps `updated_at`. `None` when the user does not exist.
    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError>;

    /// Replaces (or clears) the avatar. Returns `false` when the user does not exist.
    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> Result<bool, AppError>;

    async fn append_token(&self, id: Uuid, token: &str) -> Result<bool, AppError>;

    /// Removes one occurrence of `token`. Removing an absent token is not an error.
    async fn remove_token(&self, id: Uuid, token: &str) -> Result<bool, AppError>;

    async fn clear_tokens(&self, id: Uuid) -> Result<bool, AppError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert(&self, task: Task) -> Result<Task, AppError>;

    async fn list(&self, query: &TaskQuery) -> Result<Vec<Task>, AppError>;

    async fn find_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Task>, AppError>;

    async fn update_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: TaskPatch,
    ) -> Result<Option<Task>, AppError>;

    async fn delete_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Task>, AppError>;

    /// Deletes every task of `owner_id` and returns how many were removed.
    async fn delete_by_owner(&self, owner_id: Uuid) -> Result<u64, AppError>;
}
