//! Ride suggestions: pending rides from other users the caller could
//! ask to join, with the caller's own invite attached when one exists.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::auth::AuthUser;
use crate::api::error::ApiError;
use crate::api::ApiResponse;
use crate::db::{Invite, OwnerInfo, Ride, Stop, SuggestedRide};
use crate::lifecycle::visibility;
use crate::AppState;

/// `GET /suggestions`
pub async fn list_suggestions(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<Vec<SuggestedRide>>>, ApiError> {
    let rides: Vec<Ride> = sqlx::query_as(
        "SELECT * FROM rides WHERE status = 'PENDING' AND owner_id != ? ORDER BY created_at DESC",
    )
    .bind(&user_id)
    .fetch_all(&state.db)
    .await?;

    let mut suggestions = Vec::with_capacity(rides.len());
    for ride in rides {
        let owner: OwnerInfo = sqlx::query_as("SELECT id, name FROM users WHERE id = ?")
            .bind(&ride.owner_id)
            .fetch_one(&state.db)
            .await?;
        let stops: Vec<Stop> =
            sqlx::query_as("SELECT * FROM stops WHERE ride_id = ? ORDER BY position")
                .bind(&ride.id)
                .fetch_all(&state.db)
                .await?;
        let participant_ids: Vec<String> = sqlx::query_scalar(
            "SELECT user_id FROM ride_participants WHERE ride_id = ? ORDER BY joined_at",
        )
        .bind(&ride.id)
        .fetch_all(&state.db)
        .await?;
        let my_invite: Option<Invite> = sqlx::query_as(
            "SELECT * FROM invites WHERE ride_id = ? AND sender_id = ? \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(&ride.id)
        .bind(&user_id)
        .fetch_optional(&state.db)
        .await?;

        suggestions.push(SuggestedRide {
            id: ride.id,
            owner,
            status: ride.status,
            people_count: ride.people_count,
            vehicle_type: ride.vehicle_type,
            prefers_gender: ride.prefers_gender,
            earliest_departure: ride.earliest_departure,
            latest_departure: ride.latest_departure,
            stops,
            participant_ids,
            my_invite,
            created_at: ride.created_at,
        });
    }

    visibility::filter_suggestions(&mut suggestions);
    Ok(Json(ApiResponse::new(suggestions)))
}
