//! Profile endpoints for the authenticated user.

use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::api::auth::AuthUser;
use crate::api::error::ApiError;
use crate::api::validation;
use crate::api::ApiResponse;
use crate::db::{UpdateUserRequest, User, UserResponse};
use crate::AppState;

/// `GET /users/me`
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&user_id)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(ApiResponse::new(UserResponse::from(user))))
}

/// `PUT /users/me`
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    let gender = validation::validate_gender(&request.gender).map_err(ApiError::validation)?;
    let address = request.address.trim();

    sqlx::query("UPDATE users SET name = ?, gender = ?, address = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(gender.to_string())
        .bind(address)
        .bind(Utc::now().to_rfc3339())
        .bind(&user_id)
        .execute(&state.db)
        .await?;

    get_me(State(state), AuthUser(user_id)).await
}
