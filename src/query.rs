//! Filter, sort and pagination parameters for listing a user's tasks.
//!
//! A [`TaskQuery`] can only be built for a specific owner, so every list
//! request carries an `owner_id` filter no matter which other parameters the
//! client sends.

use serde::Deserialize;
use std::cmp::Ordering;
use uuid::Uuid;

use crate::models::Task;

/// Raw query string of `GET /tasks`.
///
/// Everything is kept as text so that malformed numbers degrade to "no bound"
/// instead of failing the request.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListParams {
    pub completed: Option<String>,
    pub sort_by: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `desc` selects descending order; any other value means ascending.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Task fields a list may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSortField {
    Description,
    Completed,
    CreatedAt,
    UpdatedAt,
}

impl TaskSortField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "description" => Some(TaskSortField::Description),
            "completed" => Some(TaskSortField::Completed),
            "createdAt" | "created_at" => Some(TaskSortField::CreatedAt),
            "updatedAt" | "updated_at" => Some(TaskSortField::UpdatedAt),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            TaskSortField::Description => "description",
            TaskSortField::Completed => "completed",
            TaskSortField::CreatedAt => "created_at",
            TaskSortField::UpdatedAt => "updated_at",
        }
    }

    fn compare(&self, a: &Task, b: &Task) -> Ordering {
        match self {
            TaskSortField::Description => a.description.cmp(&b.description),
            TaskSortField::Completed => a.completed.cmp(&b.completed),
            TaskSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            TaskSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSort {
    pub field: TaskSortField,
    pub direction: SortDirection,
}

impl TaskSort {
    /// Parses `field:direction`. Unknown fields yield no sort at all.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(2, ':');
        let field = TaskSortField::parse(parts.next()?)?;
        let direction = parts.next().map(SortDirection::parse).unwrap_or_default();
        Some(Self { field, direction })
    }

    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let ordering = self.field.compare(a, b);
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// A fully resolved list query for one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    owner_id: Uuid,
    pub completed: Option<bool>,
    pub sort: Option<TaskSort>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl TaskQuery {
    /// All tasks of `owner_id`, unfiltered, in creation order.
    pub fn for_owner(owner_id: Uuid) -> Self {
        Self {
            owner_id,
            completed: None,
            sort: None,
            skip: None,
            limit: None,
        }
    }

    /// Builds the query for `owner_id` from raw list parameters.
    pub fn from_params(owner_id: Uuid, params: &TaskListParams) -> Self {
        Self {
            owner_id,
            completed: params
                .completed
                .as_deref()
                .filter(|raw| !raw.is_empty())
                .map(|raw| raw == "true"),
            sort: params.sort_by.as_deref().and_then(TaskSort::parse),
            skip: params.skip.as_deref().and_then(parse_bound),
            limit: params.limit.as_deref().and_then(parse_bound),
        }
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn matches(&self, task: &Task) -> bool {
        task.owner_id == self.owner_id && self.completed.map_or(true, |c| task.completed == c)
    }

    /// Filters, sorts, skips and limits `tasks`, which must be in creation order.
    pub fn apply<I>(&self, tasks: I) -> Vec<Task>
    where
        I: IntoIterator<Item = Task>,
    {
        let mut selected: Vec<Task> = tasks.into_iter().filter(|t| self.matches(t)).collect();
        if let Some(sort) = &self.sort {
            selected.sort_by(|a, b| sort.compare(a, b));
        }
        selected
            .into_iter()
            .skip(self.skip.map_or(0, |n| n as usize))
            .take(self.limit.map_or(usize::MAX, |n| n as usize))
            .collect()
    }
}

/// Zero, negative and non-numeric values all mean "no bound".
fn parse_bound(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskInput;
    use pretty_assertions::assert_eq;

    fn params(completed: Option<&str>, sort_by: Option<&str>, limit: Option<&str>, skip: Option<&str>) -> TaskListParams {
        TaskListParams {
            completed: completed.map(str::to_string),
            sort_by: sort_by.map(str::to_string),
            limit: limit.map(str::to_string),
            skip: skip.map(str::to_string),
        }
    }

    fn task(owner: Uuid, description: &str, completed: bool) -> Task {
        Task::new(
            TaskInput {
                description: description.to_string(),
                completed,
            },
            owner,
        )
    }

    fn descriptions(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.description.as_str()).collect()
    }

    #[test]
    fn test_completed_filter() {
        let owner = Uuid::new_v4();
        assert_eq!(TaskQuery::from_params(owner, &params(Some("true"), None, None, None)).completed, Some(true));
        assert_eq!(TaskQuery::from_params(owner, &params(Some("false"), None, None, None)).completed, Some(false));
        assert_eq!(TaskQuery::from_params(owner, &params(Some("yes"), None, None, None)).completed, Some(false));
        assert_eq!(TaskQuery::from_params(owner, &params(Some(""), None, None, None)).completed, None);
        assert_eq!(TaskQuery::from_params(owner, &params(None, None, None, None)).completed, None);
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!(
            TaskSort::parse("createdAt:desc"),
            Some(TaskSort { field: TaskSortField::CreatedAt, direction: SortDirection::Desc })
        );
        assert_eq!(
            TaskSort::parse("description:sideways"),
            Some(TaskSort { field: TaskSortField::Description, direction: SortDirection::Asc })
        );
        assert_eq!(
            TaskSort::parse("completed"),
            Some(TaskSort { field: TaskSortField::Completed, direction: SortDirection::Asc })
        );
        assert_eq!(TaskSort::parse("owner_id:desc"), None);
    }

    #[test]
    fn test_bounds_parsing() {
        let owner = Uuid::new_v4();
        let query = TaskQuery::from_params(owner, &params(None, None, Some("10"), Some("3")));
        assert_eq!((query.limit, query.skip), (Some(10), Some(3)));

        let query = TaskQuery::from_params(owner, &params(None, None, Some("ten"), Some("-2")));
        assert_eq!((query.limit, query.skip), (None, None));

        let query = TaskQuery::from_params(owner, &params(None, None, Some("0"), Some("0")));
        assert_eq!((query.limit, query.skip), (None, None));
    }

    #[test]
    fn test_apply_never_returns_foreign_tasks() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let tasks = vec![
            task(me, "a", false),
            task(other, "b", false),
            task(me, "c", true),
            task(other, "d", true),
        ];

        let combos = [
            params(None, None, None, None),
            params(Some("true"), Some("description:desc"), Some("1"), None),
            params(Some("false"), Some("completed:asc"), None, Some("1")),
            params(None, Some("owner_id:asc"), Some("100"), Some("0")),
        ];
        for combo in combos {
            let result = TaskQuery::from_params(me, &combo).apply(tasks.clone());
            assert!(result.iter().all(|t| t.owner_id == me), "leak with {:?}", combo);
        }
    }

    #[test]
    fn test_skip_is_applied_before_limit() {
        let owner = Uuid::new_v4();
        let tasks: Vec<Task> = ["a", "b", "c", "d"].iter().map(|d| task(owner, d, false)).collect();

        let page = TaskQuery::from_params(owner, &params(None, None, Some("2"), Some("1"))).apply(tasks.clone());
        assert_eq!(descriptions(&page), vec!["b", "c"]);

        let last = TaskQuery::from_params(owner, &params(None, None, Some("3"), Some("3"))).apply(tasks);
        assert_eq!(descriptions(&last), vec!["d"]);
    }

    #[test]
    fn test_sort_then_paginate() {
        let owner = Uuid::new_v4();
        let tasks: Vec<Task> = ["b", "d", "a", "c"].iter().map(|d| task(owner, d, false)).collect();

        let sorted = TaskQuery::from_params(owner, &params(None, Some("description:desc"), Some("2"), None)).apply(tasks.clone());
        assert_eq!(descriptions(&sorted), vec!["d", "c"]);

        let unsorted = TaskQuery::for_owner(owner).apply(tasks);
        assert_eq!(descriptions(&unsorted), vec!["b", "d", "a", "c"]);
    }
}
