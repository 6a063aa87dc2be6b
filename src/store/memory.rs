use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{TaskRepository, UserRepository};
use crate::error::AppError;
use crate::models::{NewUserRecord, Task, TaskPatch, User, UserChanges};
use crate::query::TaskQuery;

/// Process-local store implementing both repositories.
///
/// Tasks are kept in a `Vec` so that unsorted listings come back in creation order.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    tasks: RwLock<Vec<Task>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks held for `owner_id`, including any not reachable through a user.
    pub async fn task_count_for(&self, owner_id: Uuid) -> usize {
        self.tasks.read().await.iter().filter(|t| t.owner_id == owner_id).count()
    }

    async fn with_user<F>(&self, id: Uuid, mutate: F) -> Option<User>
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.users.write().await;
        users.get_mut(&id).map(|user| {
            mutate(user);
            user.updated_at = Utc::now();
            user.clone()
        })
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert(&self, record: NewUserRecord) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == record.email) {
            return Err(AppError::DuplicateEmail);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: record.name,
            email: record.email,
            password_hash: record.password_hash,
            age: record.age,
            session_tokens: Vec::new(),
            avatar: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id_and_token(&self, id: Uuid, token: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .get(&id)
            .filter(|u| u.has_token(token))
            .cloned())
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        if let Some(email) = &changes.email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(AppError::DuplicateEmail);
            }
        }
        Ok(users.get_mut(&id).map(|user| {
            changes.apply_to(user);
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> Result<bool, AppError> {
        Ok(self.with_user(id, |u| u.avatar = avatar).await.is_some())
    }

    async fn append_token(&self, id: Uuid, token: &str) -> Result<bool, AppError> {
        Ok(self
            .with_user(id, |u| u.session_tokens.push(token.to_string()))
            .await
            .is_some())
    }

    async fn remove_token(&self, id: Uuid, token: &str) -> Result<bool, AppError> {
        Ok(self
            .with_user(id, |u| {
                if let Some(pos) = u.session_tokens.iter().position(|t| t == token) {
                    u.session_tokens.remove(pos);
                }
            })
            .await
            .is_some())
    }

    async fn clear_tokens(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .with_user(id, |u| u.session_tokens.clear())
            .await
            .is_some())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl TaskRepository for InMemoryStore {
    async fn insert(&self, task: Task) -> Result<Task, AppError> {
        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn list(&self, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        let tasks = self.tasks.read().await;
        Ok(query.apply(tasks.iter().cloned()))
    }

    async fn find_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Task>, AppError> {
        Ok(self
            .tasks
            .read()
            .await
            .iter()
            .find(|t| t.id == id && t.owner_id == owner_id)
            .cloned())
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: TaskPatch,
    ) -> Result<Option<Task>, AppError> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks
            .iter_mut()
            .find(|t| t.id == id && t.owner_id == owner_id)
            .map(|task| {
                patch.apply_to(task);
                task.updated_at = Utc::now();
                task.clone()
            }))
    }

    async fn delete_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Task>, AppError> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks
            .iter()
            .position(|t| t.id == id && t.owner_id == owner_id)
            .map(|pos| tasks.remove(pos)))
    }

    async fn delete_by_owner(&self, owner_id: Uuid) -> Result<u64, AppError> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| t.owner_id != owner_id);
        Ok((before - tasks.len()) as u64)
    }
}
