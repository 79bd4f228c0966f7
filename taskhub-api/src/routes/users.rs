/// User endpoints
///
/// Users normally arrive through the Clerk webhook. These endpoints list them
/// and let an operator create or permanently remove local accounts.
///
/// # Endpoints
///
/// - `GET /users?limit=&offset=` - List users (default 100/0)
/// - `GET /users/:id` - Fetch one user
/// - `POST /users` - Create a user with a password
/// - `DELETE /users/:id` - Hard delete

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use taskhub_shared::{
    auth::password,
    models::user::{NewUser, User, EMAIL_CONSTRAINT},
    store::StoreError,
};
use uuid::Uuid;
use validator::Validate;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

/// Pagination query
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Administrative user creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email too long")
    )]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,

    #[validate(length(max = 255, message = "Name too long"))]
    pub full_name: Option<String>,

    #[serde(default = "default_active")]
    pub is_active: bool,

    #[serde(default)]
    pub is_superuser: bool,
}

fn default_active() -> bool {
    true
}

/// Generic acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Lists users
pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<User>>> {
    let users = User::list(&state.db, page.limit(), page.offset()).await?;
    Ok(Json(users))
}

/// Fetches one user
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Creates a user outside of Clerk
///
/// The password is stored as an Argon2id hash; the account has no
/// `clerk_id` until one is linked by the sync tool.
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    req.validate()?;

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::BadRequest("Email already registered".to_string()));
    }

    let hashed_password = password::hash_password(&req.password)?;

    let new_user = NewUser {
        clerk_id: None,
        email: req.email,
        full_name: req.full_name.filter(|name| !name.trim().is_empty()),
        image_url: None,
        hashed_password: Some(hashed_password),
        is_active: req.is_active,
        is_superuser: req.is_superuser,
    };

    // The pre-check can race with a concurrent insert; the constraint decides.
    let user = User::create(&state.db, new_user).await.map_err(|e| {
        let err = StoreError::from(e);
        if err.violates(EMAIL_CONSTRAINT) {
            ApiError::BadRequest("Email already registered".to_string())
        } else {
            ApiError::InternalError(err.to_string())
        }
    })?;

    tracing::info!(user_id = %user.id, "Created user");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Permanently deletes a user
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<OkResponse>> {
    if !User::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %id, "Deleted user");

    Ok(Json(OkResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_bounds() {
        let page = Pagination::default();
        assert_eq!(page.limit(), 100);
        assert_eq!(page.offset(), 0);

        let page = Pagination {
            limit: Some(5000),
            offset: Some(-3),
        };
        assert_eq!(page.limit(), 1000);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_create_user_request_validation() {
        let req: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "email": "admin@example.com",
            "password": "correct horse battery"
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert!(req.is_active);
        assert!(!req.is_superuser);

        let req: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "email": "not-an-email",
            "password": "short"
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("password"));
    }
}
