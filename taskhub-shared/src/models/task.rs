//! Task model and database operations
//!
//! Tasks are plain household to-dos. A task may be assigned to a user; the
//! reference is weak (`ON DELETE SET NULL`), a task never owns its assignee.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE task_category AS ENUM ('Chore', 'Shopping', 'Homework', 'Other');
//! CREATE TYPE task_status AS ENUM ('todo', 'in-progress', 'completed');
//!
//! CREATE TABLE tasks (
//!     id SERIAL PRIMARY KEY,
//!     title VARCHAR(255) NOT NULL,
//!     description TEXT,
//!     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
//!     category task_category NOT NULL,
//!     due_date DATE NOT NULL,
//!     status task_status NOT NULL DEFAULT 'todo',
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! # Example
//!
//! ```no_run
//! use taskhub_shared::models::task::{CreateTask, Task, TaskCategory, TaskStatus};
//! use taskhub_shared::db::pool::{create_pool, DatabaseConfig};
//! use chrono::NaiveDate;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::default()).await?;
//!
//! let task = Task::create(&pool, CreateTask {
//!     title: "Buy milk".to_string(),
//!     description: None,
//!     assignee_id: None,
//!     category: TaskCategory::Shopping,
//!     due_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
//!     status: TaskStatus::Todo,
//! }).await?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::user::User;

/// Task category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_category")]
pub enum TaskCategory {
    Chore,
    Shopping,
    Homework,
    Other,
}

impl TaskCategory {
    /// All categories in display order
    pub const ALL: [TaskCategory; 4] = [
        TaskCategory::Chore,
        TaskCategory::Shopping,
        TaskCategory::Homework,
        TaskCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Chore => "Chore",
            TaskCategory::Shopping => "Shopping",
            TaskCategory::Homework => "Homework",
            TaskCategory::Other => "Other",
        }
    }
}

/// Task progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status")]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "todo")]
    #[sqlx(rename = "todo")]
    Todo,

    #[serde(rename = "in-progress")]
    #[sqlx(rename = "in-progress")]
    InProgress,

    #[serde(rename = "completed")]
    #[sqlx(rename = "completed")]
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Task row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,

    /// Weak reference to `users.id`
    pub assignee_id: Option<Uuid>,

    pub category: TaskCategory,
    pub due_date: NaiveDate,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task together with its assignee, as returned by the detail endpoint
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,

    pub assignee: Option<User>,
}

/// Input for creating a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub category: TaskCategory,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub status: TaskStatus,
}

/// Input for updating a task
///
/// All fields are optional. For the nullable columns, an explicit JSON
/// `null` deserializes to `Some(None)` and clears the column, while an absent
/// key leaves it untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateTask {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<Uuid>>,

    pub category: Option<TaskCategory>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
}

impl UpdateTask {
    /// Whether the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.assignee_id.is_none()
            && self.category.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
    }
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl Task {
    /// Creates a new task
    ///
    /// # Errors
    ///
    /// Returns a foreign key violation if `assignee_id` does not reference an
    /// existing user.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title, description, assignee_id, category, due_date, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, assignee_id, category, due_date, status,
                      created_at, updated_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.assignee_id)
        .bind(data.category)
        .bind(data.due_date)
        .bind(data.status)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, assignee_id, category, due_date, status,
                   created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task and resolves its assignee
    pub async fn find_detail(pool: &PgPool, id: i32) -> Result<Option<TaskDetail>, sqlx::Error> {
        let Some(task) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let assignee = match task.assignee_id {
            Some(user_id) => User::find_by_id(pool, user_id).await?,
            None => None,
        };

        Ok(Some(TaskDetail { task, assignee }))
    }

    /// Lists all tasks ordered by due date
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, assignee_id, category, due_date, status,
                   created_at, updated_at
            FROM tasks
            ORDER BY due_date, id
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Updates an existing task
    ///
    /// Only fields present in `data` are written. Returns `None` if the task
    /// doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: i32,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.assignee_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", assignee_id = ${}", bind_count));
        }
        if data.category.is_some() {
            bind_count += 1;
            query.push_str(&format!(", category = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 RETURNING id, title, description, assignee_id, category, due_date, status, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(assignee_id) = data.assignee_id {
            q = q.bind(assignee_id);
        }
        if let Some(category) = data.category {
            q = q.bind(category);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Deletes a task
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_serialization_matches_names() {
        for category in TaskCategory::ALL {
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json, json!(category.as_str()));
        }
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_value(TaskStatus::InProgress).unwrap(), json!("in-progress"));
        assert_eq!(serde_json::to_value(TaskStatus::Todo).unwrap(), json!("todo"));

        let status: TaskStatus = serde_json::from_value(json!("completed")).unwrap();
        assert_eq!(status, TaskStatus::Completed);
        assert_eq!(TaskStatus::default(), TaskStatus::Todo);
    }

    #[test]
    fn test_create_task_defaults_status() {
        let task: CreateTask = serde_json::from_value(json!({
            "title": "Dishes",
            "category": "Chore",
            "due_date": "2025-02-01"
        }))
        .unwrap();

        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.assignee_id.is_none());
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
    }

    #[test]
    fn test_update_task_distinguishes_null_from_absent() {
        let update: UpdateTask = serde_json::from_value(json!({
            "assignee_id": null,
            "status": "in-progress"
        }))
        .unwrap();

        assert_eq!(update.assignee_id, Some(None));
        assert!(update.description.is_none());
        assert_eq!(update.status, Some(TaskStatus::InProgress));
        assert!(!update.is_empty());

        let empty: UpdateTask = serde_json::from_value(json!({})).unwrap();
        assert!(empty.is_empty());
    }
}
