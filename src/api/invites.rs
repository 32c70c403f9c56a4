//! Invite endpoints. The listing passes through the visibility filter
//! before it is serialized.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::auth::AuthUser;
use crate::api::error::ApiError;
use crate::api::ApiResponse;
use crate::db::{DeclineInviteRequest, Invite, InvitesResponse, SendInviteRequest};
use crate::lifecycle::{visibility, InviteLifecycle};
use crate::AppState;

/// `POST /invites`
pub async fn send_invite(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<SendInviteRequest>,
) -> Result<Json<ApiResponse<Invite>>, ApiError> {
    let invite = InviteLifecycle::new(state.db.clone())
        .send_invite(&user_id, &request.ride_id)
        .await?;
    Ok(Json(ApiResponse::new(invite)))
}

/// `GET /invites` - sent and received, phone numbers masked unless the
/// invite is accepted
pub async fn list_invites(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<InvitesResponse>>, ApiError> {
    let mut response = InviteLifecycle::new(state.db.clone())
        .list_invites(&user_id)
        .await?;
    visibility::filter_invites(&mut response);
    Ok(Json(ApiResponse::new(response)))
}

/// `POST /invites/:id/accept`
pub async fn accept_invite(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(invite_id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    InviteLifecycle::new(state.db.clone())
        .accept_invite(&user_id, &invite_id)
        .await?;
    Ok(Json(ApiResponse::empty()))
}

/// `POST /invites/:id/decline`
pub async fn decline_invite(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(invite_id): Path<String>,
    Json(request): Json<DeclineInviteRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    InviteLifecycle::new(state.db.clone())
        .decline_invite(&user_id, &invite_id, &request.reason)
        .await?;
    Ok(Json(ApiResponse::empty()))
}
