use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{TaskRepository, UserRepository};
use crate::error::AppError;
use crate::models::{NewUserRecord, Task, TaskPatch, User, UserChanges};
use crate::query::TaskQuery;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, age, session_tokens, avatar, created_at, updated_at";

const TASK_COLUMNS: &str = "id, description, completed, owner_id, created_at, updated_at";

/// Applies the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, condition: &str, id: Uuid, token: Option<&str>) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, condition);
        let mut query = sqlx::query_as::<_, User>(&sql).bind(id);
        if let Some(token) = token {
            query = query.bind(token);
        }
        Ok(query.fetch_optional(&self.pool).await?)
    }
}

#[async_trait]
impl UserRepository for PgUserStore {
    async fn insert(&self, record: NewUserRecord) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, age) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );
        // A unique violation on users.email surfaces as DuplicateEmail via From<sqlx::Error>.
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&record.name)
            .bind(&record.email)
            .bind(&record.password_hash)
            .bind(record.age)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.fetch_one_where("id = $1", id, None).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id_and_token(&self, id: Uuid, token: &str) -> Result<Option<User>, AppError> {
        self.fetch_one_where("id = $1 AND $2 = ANY(session_tokens)", id, Some(token))
            .await
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError> {
        let sql = format!(
            "UPDATE users SET \
                 name = COALESCE($2, name), \
                 email = COALESCE($3, email), \
                 password_hash = COALESCE($4, password_hash), \
                 age = COALESCE($5, age), \
                 updated_at = now() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.email)
            .bind(changes.password_hash)
            .bind(changes.age)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET avatar = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(avatar)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_token(&self, id: Uuid, token: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET session_tokens = array_append(session_tokens, $2), updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_token(&self, id: Uuid, token: &str) -> Result<bool, AppError> {
        // array_remove would drop every copy; only the first match goes.
        let result = sqlx::query(
            "UPDATE users SET session_tokens = \
                 COALESCE(session_tokens[:array_position(session_tokens, $2) - 1], '{}') \
                 || COALESCE(session_tokens[array_position(session_tokens, $2) + 1:], '{}'), \
                 updated_at = now() \
             WHERE id = $1 AND $2 = ANY(session_tokens)",
        )
        .bind(id)
        .bind(token)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() > 0 {
            return Ok(true);
        }
        Ok(self.find_by_id(id).await?.is_some())
    }

    async fn clear_tokens(&self, id: Uuid) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE users SET session_tokens = '{}', updated_at = now() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Builds the SELECT for a list query. `$1` is always the owner.
///
/// The sort column comes from a closed enum, never from client text.
pub fn list_sql(query: &TaskQuery) -> String {
    let mut sql = format!("SELECT {} FROM tasks WHERE owner_id = $1", TASK_COLUMNS);
    let mut param_count = 2;

    if query.completed.is_some() {
        sql.push_str(&format!(" AND completed = ${}", param_count));
        param_count += 1;
    }

    match &query.sort {
        Some(sort) => sql.push_str(&format!(
            " ORDER BY {} {}, created_at ASC",
            sort.field.column(),
            sort.direction.as_sql()
        )),
        None => sql.push_str(" ORDER BY created_at ASC"),
    }

    if query.limit.is_some() {
        sql.push_str(&format!(" LIMIT ${}", param_count));
        param_count += 1;
    }
    if query.skip.is_some() {
        sql.push_str(&format!(" OFFSET ${}", param_count));
    }
    sql
}

#[async_trait]
impl TaskRepository for PgTaskStore {
    async fn insert(&self, task: Task) -> Result<Task, AppError> {
        let sql = format!(
            "INSERT INTO tasks (id, description, completed, owner_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            TASK_COLUMNS
        );
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(task.id)
            .bind(task.description)
            .bind(task.completed)
            .bind(task.owner_id)
            .bind(task.created_at)
            .bind(task.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(task)
    }

    async fn list(&self, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        let sql = list_sql(query);
        let mut query_builder = sqlx::query_as::<_, Task>(&sql).bind(query.owner_id());

        if let Some(completed) = query.completed {
            query_builder = query_builder.bind(completed);
        }
        if let Some(limit) = query.limit {
            query_builder = query_builder.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(skip) = query.skip {
            query_builder = query_builder.bind(i64::try_from(skip).unwrap_or(i64::MAX));
        }

        Ok(query_builder.fetch_all(&self.pool).await?)
    }

    async fn find_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Task>, AppError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1 AND owner_id = $2", TASK_COLUMNS);
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: TaskPatch,
    ) -> Result<Option<Task>, AppError> {
        let sql = format!(
            "UPDATE tasks SET \
                 description = COALESCE($3, description), \
                 completed = COALESCE($4, completed), \
                 updated_at = now() \
             WHERE id = $1 AND owner_id = $2 RETURNING {}",
            TASK_COLUMNS
        );
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(patch.description)
            .bind(patch.completed)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn delete_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Task>, AppError> {
        let sql = format!(
            "DELETE FROM tasks WHERE id = $1 AND owner_id = $2 RETURNING {}",
            TASK_COLUMNS
        );
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn delete_by_owner(&self, owner_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::TaskListParams;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_list_sql_is_always_owner_scoped() {
        let sql = list_sql(&TaskQuery::for_owner(Uuid::new_v4()));
        assert_eq!(
            sql,
            "SELECT id, description, completed, owner_id, created_at, updated_at \
             FROM tasks WHERE owner_id = $1 ORDER BY created_at ASC"
        );
    }

    #[test]
    fn test_list_sql_with_every_parameter() {
        let params = TaskListParams {
            completed: Some("true".to_string()),
            sort_by: Some("createdAt:desc".to_string()),
            limit: Some("10".to_string()),
            skip: Some("20".to_string()),
        };
        let sql = list_sql(&TaskQuery::from_params(Uuid::new_v4(), &params));
        assert!(sql.contains("WHERE owner_id = $1 AND completed = $2"));
        assert!(sql.contains("ORDER BY created_at DESC, created_at ASC"));
        assert!(sql.ends_with("LIMIT $3 OFFSET $4"));
    }

    #[test]
    fn test_list_sql_numbers_parameters_without_gaps() {
        let params = TaskListParams {
            skip: Some("5".to_string()),
            ..Default::default()
        };
        let sql = list_sql(&TaskQuery::from_params(Uuid::new_v4(), &params));
        assert!(sql.ends_with("ORDER BY created_at ASC OFFSET $2"));
    }
}
