/// Task endpoints
///
/// # Endpoints
///
/// - `GET /tasks` - List tasks
/// - `GET /tasks/category` - Category names
/// - `GET /tasks/:id` - Task with its assignee
/// - `POST /tasks` - Create
/// - `PATCH /tasks/:id` - Partial update
/// - `DELETE /tasks/:id` - Delete
///
/// # Example
///
/// ```text
/// POST /tasks
/// {
///   "title": "Take out recycling",
///   "category": "Chore",
///   "due_date": "2025-03-01",
///   "assignee_id": "5f0c..."
/// }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::users::OkResponse,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use taskhub_shared::models::task::{
    CreateTask, Task, TaskCategory, TaskDetail, TaskStatus, UpdateTask,
};
use uuid::Uuid;
use validator::Validate;

/// Task creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub category: TaskCategory,
    pub due_date: NaiveDate,

    #[serde(default)]
    pub status: TaskStatus,
}

impl From<CreateTaskRequest> for CreateTask {
    fn from(req: CreateTaskRequest) -> Self {
        CreateTask {
            title: req.title,
            description: req.description,
            assignee_id: req.assignee_id,
            category: req.category,
            due_date: req.due_date,
            status: req.status,
        }
    }
}

fn not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

/// Lists all tasks
pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(Task::list(&state.db).await?))
}

/// Lists the category names
pub async fn list_categories() -> Json<Vec<&'static str>> {
    Json(TaskCategory::ALL.iter().map(TaskCategory::as_str).collect())
}

/// Fetches a task with its assignee
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<TaskDetail>> {
    let detail = Task::find_detail(&state.db, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(detail))
}

/// Creates a task
///
/// An `assignee_id` that references no user is a 400.
pub async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let task = Task::create(&state.db, req.into()).await?;
    tracing::info!(task_id = task.id, "Created task");

    Ok((StatusCode::CREATED, Json(task)))
}

/// Applies a partial update
///
/// Absent keys are left alone; `"assignee_id": null` unassigns.
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(update): Json<UpdateTask>,
) -> ApiResult<Json<Task>> {
    update.validate()?;

    let task = if update.is_empty() {
        Task::find_by_id(&state.db, id).await?
    } else {
        Task::update(&state.db, id, update).await?
    };

    Ok(Json(task.ok_or_else(not_found)?))
}

/// Deletes a task
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<OkResponse>> {
    if !Task::delete(&state.db, id).await? {
        return Err(not_found());
    }

    tracing::info!(task_id = id, "Deleted task");

    Ok(Json(OkResponse { ok: true }))
}
