//! Ride endpoints. Handlers stay thin: parse, delegate to the lifecycle
//! manager, wrap the result in the response envelope.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::auth::AuthUser;
use crate::api::error::ApiError;
use crate::api::ApiResponse;
use crate::db::{CancelRideRequest, CreateRideRequest, RideResponse};
use crate::lifecycle::RideLifecycle;
use crate::AppState;

/// `POST /rides`
pub async fn create_ride(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<CreateRideRequest>,
) -> Result<Json<ApiResponse<RideResponse>>, ApiError> {
    let ride = RideLifecycle::new(state.db.clone())
        .create_ride(&user_id, request)
        .await?;
    Ok(Json(ApiResponse::new(ride)))
}

/// `GET /rides` - rides the caller owns, newest first
pub async fn list_rides(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<Vec<RideResponse>>>, ApiError> {
    let rides = RideLifecycle::new(state.db.clone())
        .list_rides(&user_id)
        .await?;
    Ok(Json(ApiResponse::new(rides)))
}

/// `GET /rides/current` - the pending ride the caller owns or joined
pub async fn current_ride(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<RideResponse>>, ApiError> {
    let ride = RideLifecycle::new(state.db.clone())
        .current_ride(&user_id)
        .await?;
    Ok(Json(ApiResponse::new(ride)))
}

/// `DELETE /rides/:id` - cancel with a reason
pub async fn cancel_ride(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(ride_id): Path<String>,
    Json(request): Json<CancelRideRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    RideLifecycle::new(state.db.clone())
        .cancel_ride(&user_id, &ride_id, &request.reason)
        .await?;
    Ok(Json(ApiResponse::empty()))
}

/// `POST /rides/:id/complete`
pub async fn complete_ride(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(ride_id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    RideLifecycle::new(state.db.clone())
        .complete_ride(&user_id, &ride_id)
        .await?;
    Ok(Json(ApiResponse::empty()))
}
