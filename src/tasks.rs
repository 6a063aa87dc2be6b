//! Owner-scoped task operations.
//!
//! Every call takes the requester's id and passes it down to the repository,
//! so a task that belongs to someone else is indistinguishable from a task
//! that does not exist.

use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::{parse_patch, Task, TaskInput, TaskPatch, TASK_UPDATABLE_FIELDS};
use crate::query::{TaskListParams, TaskQuery};
use crate::store::TaskRepository;

const TASK_NOT_FOUND: &str = "Task not found";

/// Parses a path id. Anything that is not a uuid cannot name a task.
pub fn parse_task_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::NotFound(TASK_NOT_FOUND.into()))
}

#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskRepository>) -> Self {
        Self { tasks }
    }

    /// Creates a task owned by `owner_id`.
    pub async fn create(&self, owner_id: Uuid, input: TaskInput) -> Result<Task, AppError> {
        let input = input.normalized();
        input.validate()?;
        self.tasks.insert(Task::new(input, owner_id)).await
    }

    pub async fn list(&self, owner_id: Uuid, params: &TaskListParams) -> Result<Vec<Task>, AppError> {
        let query = TaskQuery::from_params(owner_id, params);
        log::debug!("listing tasks with {:?}", query);
        self.tasks.list(&query).await
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Task, AppError> {
        self.tasks
            .find_owned(id, owner_id)
            .await?
            .ok_or_else(|| AppError::NotFound(TASK_NOT_FOUND.into()))
    }

    /// Applies a raw JSON patch after the allow-list check.
    ///
    /// Nothing is written if any key is outside the allow-list or any value is invalid.
    pub async fn update(&self, owner_id: Uuid, id: Uuid, body: Value) -> Result<Task, AppError> {
        let patch: TaskPatch = parse_patch(body, TASK_UPDATABLE_FIELDS)?;
        let patch = patch.normalized();
        patch.validate()?;

        self.tasks
            .update_owned(id, owner_id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound(TASK_NOT_FOUND.into()))
    }

    /// Deletes and returns the task.
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<Task, AppError> {
        self.tasks
            .delete_owned(id, owner_id)
            .await?
            .ok_or_else(|| AppError::NotFound(TASK_NOT_FOUND.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use serde_json::json;

    fn input(description: &str) -> TaskInput {
        TaskInput {
            description: description.to_string(),
            completed: false,
        }
    }

    #[actix_rt::test]
    async fn test_create_trims_and_validates() {
        let service = TaskService::new(Arc::new(InMemoryStore::new()));
        let owner = Uuid::new_v4();

        let task = service.create(owner, input("  Water plants ")).await.unwrap();
        assert_eq!(task.description, "Water plants");
        assert_eq!(task.owner_id, owner);

        assert!(matches!(
            service.create(owner, input("   ")).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[actix_rt::test]
    async fn test_foreign_tasks_look_missing() {
        let service = TaskService::new(Arc::new(InMemoryStore::new()));
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let task = service.create(owner, input("Private")).await.unwrap();

        assert!(matches!(service.get(stranger, task.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            service.update(stranger, task.id, json!({ "completed": true })).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(service.delete(stranger, task.id).await, Err(AppError::NotFound(_))));
        assert!(!service.get(owner, task.id).await.unwrap().completed);
    }

    #[actix_rt::test]
    async fn test_update_rejects_owner_change() {
        let service = TaskService::new(Arc::new(InMemoryStore::new()));
        let owner = Uuid::new_v4();
        let task = service.create(owner, input("Keep me")).await.unwrap();

        let result = service
            .update(
                owner,
                task.id,
                json!({ "description": "Stolen", "owner_id": Uuid::new_v4() }),
            )
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert_eq!(service.get(owner, task.id).await.unwrap(), task);
    }

    #[actix_rt::test]
    async fn test_update_and_delete() {
        let service = TaskService::new(Arc::new(InMemoryStore::new()));
        let owner = Uuid::new_v4();
        let task = service.create(owner, input("Draft")).await.unwrap();

        let updated = service
            .update(owner, task.id, json!({ "completed": true, "description": " Final " }))
            .await
            .unwrap();
        assert!(updated.completed);
        assert_eq!(updated.description, "Final");

        let deleted = service.delete(owner, task.id).await.unwrap();
        assert_eq!(deleted.id, task.id);
        assert!(matches!(service.get(owner, task.id).await, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_parse_task_id() {
        assert!(parse_task_id("not-a-uuid").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_task_id(&id.to_string()).unwrap(), id);
    }
}
