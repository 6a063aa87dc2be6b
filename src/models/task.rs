use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Fields a user may change through `PATCH /tasks/{id}`.
pub const TASK_UPDATABLE_FIELDS: &[&str] = &["description", "completed"];

/// Input structure for creating a task.
///
/// Any owner supplied by the client is ignored; the owner is always the
/// authenticated requester.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// What needs doing. Trimmed, must not be empty.
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    /// Whether the task is already done. Defaults to `false`.
    #[serde(default)]
    pub completed: bool,
}

impl TaskInput {
    pub fn normalized(self) -> Self {
        Self {
            description: self.description.trim().to_string(),
            completed: self.completed,
        }
    }
}

/// Partial update for a task, accepted only after the allow-list check.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TaskPatch {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn normalized(self) -> Self {
        Self {
            description: self.description.map(|d| d.trim().to_string()),
            completed: self.completed,
        }
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    pub description: String,
    pub completed: bool,
    /// The user who created the task. Never changes.
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new `Task` owned by `owner_id`, stamped with the current time.
    pub fn new(input: TaskInput, owner_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            description: input.description,
            completed: input.completed,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let owner = Uuid::new_v4();
        let input = TaskInput {
            description: "  Buy milk ".to_string(),
            completed: false,
        }
        .normalized();

        let task = Task::new(input, owner);
        assert_eq!(task.description, "Buy milk");
        assert_eq!(task.owner_id, owner);
        assert!(!task.completed);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_task_validation() {
        let valid_input = TaskInput {
            description: "Valid Task".to_string(),
            completed: true,
        };
        assert!(valid_input.validate().is_ok());

        let blank_input = TaskInput {
            description: "   ".to_string(),
            completed: false,
        }
        .normalized();
        assert!(blank_input.validate().is_err());
    }

    #[test]
    fn test_completed_defaults_to_false() {
        let input: TaskInput = serde_json::from_str(r#"{"description":"Read"}"#).unwrap();
        assert!(!input.completed);
    }

    #[test]
    fn test_patch_applies_only_given_fields() {
        let mut task = Task::new(
            TaskInput {
                description: "Write report".to_string(),
                completed: false,
            },
            Uuid::new_v4(),
        );

        TaskPatch {
            completed: Some(true),
            ..Default::default()
        }
        .apply_to(&mut task);

        assert_eq!(task.description, "Write report");
        assert!(task.completed);
    }
}
