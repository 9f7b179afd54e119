//! User and role API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::auth::{forbidden, AdminUser, AuthUser};
use crate::errors::AppError;
use crate::models::{AdminStatus, InsertResult, RegisterUserRequest, Role, UpdateResult, User};
use crate::AppState;

/// GET /users - List all users (admin only).
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> ApiResult<Vec<User>> {
    tracing::debug!("User list requested by {}", admin.email);
    success(state.repo.list_users().await?)
}

/// POST /users - Register a user unless the email is taken.
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> ApiResult<InsertResult> {
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }

    match state.repo.create_user_if_absent(&request).await? {
        Some(user) => {
            tracing::info!("Registered user {}", user.email);
            success(InsertResult::inserted(user.id))
        }
        None => success(InsertResult::already_exists()),
    }
}

/// GET /user/:email - Look up a user by email.
pub async fn get_user_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Vec<User>> {
    let user = state.repo.find_user_by_email(&email).await?;
    success(user.into_iter().collect())
}

/// GET /user/admin/:email - Whether the caller is an admin.
///
/// Callers may only ask about themselves.
pub async fn check_admin(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(email): Path<String>,
) -> ApiResult<AdminStatus> {
    if auth.email() != Some(email.as_str()) {
        return Err(forbidden());
    }

    let admin = state
        .repo
        .find_user_by_email(&email)
        .await?
        .is_some_and(|user| user.has_role(Role::Admin));

    success(AdminStatus { admin })
}

/// PATCH /user/admin/:id - Promote a user to admin (admin only).
pub async fn promote_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<UpdateResult> {
    let result = state
        .repo
        .set_role(&id, Role::Admin)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

    tracing::info!("User {} promoted to admin by {}", id, admin.email);
    success(result)
}
