use crate::{
    auth::CurrentSession,
    error::AppError,
    models::TaskInput,
    query::TaskListParams,
    state::AppState,
    tasks::parse_task_id,
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::Value;

/// Retrieves a list of tasks for the authenticated user.
///
/// Only tasks owned by the requester are ever returned, whatever the query says.
///
/// ## Query Parameters:
/// - `completed` (optional): `true` keeps finished tasks, any other value keeps unfinished ones.
/// - `sortBy` (optional): `field:direction`, e.g. `createdAt:desc`. Unknown fields are ignored.
/// - `limit` (optional): page size. Zero or invalid means no limit.
/// - `skip` (optional): number of tasks to skip, applied before `limit`.
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of `Task` objects.
/// - `401 Unauthorized`: If the request lacks a valid session token.
#[get("")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    query_params: web::Query<TaskListParams>,
    session: CurrentSession,
) -> Result<impl Responder, AppError> {
    let tasks = state.tasks.list(session.user.id, &query_params).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task for the authenticated user.
///
/// ## Request Body:
/// - `description`: what needs doing (required, trimmed, non-empty).
/// - `completed` (optional): defaults to `false`.
///
/// Any owner field in the body is ignored; the owner is always the requester.
///
/// ## Responses:
/// - `201 Created`: Returns the newly created `Task` object as JSON.
/// - `400 Bad Request`: If validation fails.
/// - `401 Unauthorized`: If the request lacks a valid session token.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    task_data: web::Json<TaskInput>,
    session: CurrentSession,
) -> Result<impl Responder, AppError> {
    let task = state
        .tasks
        .create(session.user.id, task_data.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a specific task by its ID.
///
/// ## Responses:
/// - `200 OK`: Returns the `Task` object as JSON.
/// - `404 Not Found`: If the task does not exist or belongs to another user.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    path: web::Path<String>,
    session: CurrentSession,
) -> Result<impl Responder, AppError> {
    let task_id = parse_task_id(&path)?;
    let task = state.tasks.get(session.user.id, task_id).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Updates an existing task.
///
/// ## Request Body:
/// Any subset of `description` and `completed`. Any other key rejects the whole update.
///
/// ## Responses:
/// - `200 OK`: Returns the updated `Task` object as JSON.
/// - `400 Bad Request`: Unknown keys or invalid values.
/// - `404 Not Found`: If the task does not exist or belongs to another user.
#[patch("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<Value>,
    session: CurrentSession,
) -> Result<impl Responder, AppError> {
    let task_id = parse_task_id(&path)?;
    let task = state
        .tasks
        .update(session.user.id, task_id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task and returns it.
///
/// ## Responses:
/// - `200 OK`: The deleted `Task`.
/// - `404 Not Found`: If the task does not exist or belongs to another user.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    path: web::Path<String>,
    session: CurrentSession,
) -> Result<impl Responder, AppError> {
    let task_id = parse_task_id(&path)?;
    let task = state.tasks.delete(session.user.id, task_id).await?;
    Ok(HttpResponse::Ok().json(task))
}
