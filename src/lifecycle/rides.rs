//! Ride lifecycle manager: create, cancel, complete, and the listing
//! queries behind the rides API.

use chrono::Utc;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::validation;
use crate::db::{
    CreateRideRequest, DbPool, Invite, InviteStatus, OwnerInfo, PublicUser, Ride, RideResponse,
    RideStatus, Stop,
};

use super::push_notification;

/// Minimum length for a cancellation reason
const CANCEL_REASON_MIN_LEN: usize = 10;

pub struct RideLifecycle {
    db: DbPool,
}

impl RideLifecycle {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Create a ride. The owner is auto-joined as the sole participant and
    /// may hold at most one PENDING ride at a time.
    pub async fn create_ride(
        &self,
        owner_id: &str,
        req: CreateRideRequest,
    ) -> Result<RideResponse, ApiError> {
        validation::validate_stops(&req.stops).map_err(ApiError::validation)?;
        validation::validate_people_count(req.people_count).map_err(ApiError::validation)?;
        let vehicle_type =
            validation::validate_vehicle_type(&req.vehicle_type).map_err(ApiError::validation)?;
        let (earliest, latest) =
            validation::validate_departure_window(req.earliest_departure, req.latest_departure)
                .map_err(ApiError::validation)?;
        let prefers_gender = match req.prefers_gender.as_deref() {
            Some(g) if !g.is_empty() => Some(
                validation::validate_gender(g)
                    .map_err(ApiError::validation)?
                    .to_string(),
            ),
            _ => None,
        };

        let existing: Option<(String,)> =
            sqlx::query_as("SELECT id FROM rides WHERE owner_id = ? AND status = 'PENDING'")
                .bind(owner_id)
                .fetch_optional(&self.db)
                .await?;
        if existing.is_some() {
            return Err(ApiError::conflict("You already have a pending ride"));
        }

        let ride_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.db.begin().await?;

        // The partial unique index on (owner_id, status = 'PENDING') turns a
        // concurrent double-create into a constraint violation here.
        sqlx::query(
            "INSERT INTO rides (id, owner_id, status, people_count, vehicle_type, \
             prefers_gender, earliest_departure, latest_departure, created_at) \
             VALUES (?, ?, 'PENDING', ?, ?, ?, ?, ?, ?)",
        )
        .bind(&ride_id)
        .bind(owner_id)
        .bind(req.people_count)
        .bind(vehicle_type.to_string())
        .bind(&prefers_gender)
        .bind(earliest.to_rfc3339())
        .bind(latest.to_rfc3339())
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err)
                if db_err.message().contains("UNIQUE constraint failed") =>
            {
                ApiError::conflict("You already have a pending ride")
            }
            _ => ApiError::from(e),
        })?;

        for (position, stop) in req.stops.iter().enumerate() {
            sqlx::query(
                "INSERT INTO stops (id, ride_id, name, position, lat, lon) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&ride_id)
            .bind(stop.name.trim())
            .bind(position as i64)
            .bind(stop.lat)
            .bind(stop.lon)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("INSERT INTO ride_participants (ride_id, user_id, joined_at) VALUES (?, ?, ?)")
            .bind(&ride_id)
            .bind(owner_id)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(ride_id = %ride_id, owner_id = %owner_id, "Ride created");

        self.get_ride(&ride_id).await
    }

    /// Cancel a PENDING ride. Inside one transaction: every PENDING and
    /// ACCEPTED invite is forced to DECLINED with the cancellation reason,
    /// all participants are detached, and each affected sender is notified.
    pub async fn cancel_ride(
        &self,
        owner_id: &str,
        ride_id: &str,
        reason: &str,
    ) -> Result<(), ApiError> {
        validation::validate_reason(reason, CANCEL_REASON_MIN_LEN).map_err(ApiError::validation)?;

        let (ride, owner_name) = self.ride_for_owner(owner_id, ride_id).await?;

        let mut tx = self.db.begin().await?;

        let updated =
            sqlx::query("UPDATE rides SET status = 'CANCELLED' WHERE id = ? AND status = 'PENDING'")
                .bind(&ride.id)
                .execute(&mut *tx)
                .await?;
        if updated.rows_affected() == 0 {
            return Err(ApiError::conflict("Ride is no longer pending"));
        }

        let outstanding: Vec<Invite> = sqlx::query_as(
            "SELECT * FROM invites WHERE ride_id = ? AND status IN ('PENDING', 'ACCEPTED')",
        )
        .bind(&ride.id)
        .fetch_all(&mut *tx)
        .await?;

        for invite in &outstanding {
            sqlx::query("UPDATE invites SET status = 'DECLINED', decline_reason = ? WHERE id = ?")
                .bind(reason)
                .bind(&invite.id)
                .execute(&mut *tx)
                .await?;

            let message = match invite.get_status() {
                InviteStatus::Accepted => format!(
                    "Your active ride was cancelled by {}. Reason: {}",
                    owner_name, reason
                ),
                _ => format!(
                    "Your invite was declined by {} as the ride was cancelled. Reason: {}",
                    owner_name, reason
                ),
            };
            push_notification(&mut tx, &invite.sender_id, &message).await?;
        }

        sqlx::query("DELETE FROM ride_participants WHERE ride_id = ?")
            .bind(&ride.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(ride_id = %ride.id, invites = outstanding.len(), "Ride cancelled");

        Ok(())
    }

    /// Complete a PENDING ride and notify every participant. Outstanding
    /// invites are left untouched; the ride status guard stops them from
    /// being accepted afterwards.
    pub async fn complete_ride(&self, owner_id: &str, ride_id: &str) -> Result<(), ApiError> {
        let (ride, owner_name) = self.ride_for_owner(owner_id, ride_id).await?;

        let mut tx = self.db.begin().await?;

        let updated =
            sqlx::query("UPDATE rides SET status = 'COMPLETED' WHERE id = ? AND status = 'PENDING'")
                .bind(&ride.id)
                .execute(&mut *tx)
                .await?;
        if updated.rows_affected() == 0 {
            return Err(ApiError::conflict("Ride is no longer pending"));
        }

        let participants: Vec<(String,)> =
            sqlx::query_as("SELECT user_id FROM ride_participants WHERE ride_id = ? AND user_id != ?")
                .bind(&ride.id)
                .bind(owner_id)
                .fetch_all(&mut *tx)
                .await?;

        for (participant_id,) in &participants {
            push_notification(
                &mut tx,
                participant_id,
                &format!("The ride by {} was completed", owner_name),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(ride_id = %ride.id, "Ride completed");

        Ok(())
    }

    /// The viewer's current PENDING ride, owned or joined
    pub async fn current_ride(&self, user_id: &str) -> Result<RideResponse, ApiError> {
        let ride: Option<Ride> = sqlx::query_as(
            "SELECT r.* FROM rides r \
             JOIN ride_participants rp ON rp.ride_id = r.id \
             WHERE rp.user_id = ? AND r.status = 'PENDING'",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        match ride {
            Some(ride) => self.get_ride(&ride.id).await,
            None => Err(ApiError::not_found("Ride not found")),
        }
    }

    /// All rides the viewer owns, newest first
    pub async fn list_rides(&self, owner_id: &str) -> Result<Vec<RideResponse>, ApiError> {
        let rides: Vec<Ride> =
            sqlx::query_as("SELECT * FROM rides WHERE owner_id = ? ORDER BY created_at DESC")
                .bind(owner_id)
                .fetch_all(&self.db)
                .await?;

        let mut responses = Vec::with_capacity(rides.len());
        for ride in rides {
            responses.push(self.ride_response(ride).await?);
        }
        Ok(responses)
    }

    /// Materialize one ride with owner, stops and participants
    pub async fn get_ride(&self, ride_id: &str) -> Result<RideResponse, ApiError> {
        let ride: Option<Ride> = sqlx::query_as("SELECT * FROM rides WHERE id = ?")
            .bind(ride_id)
            .fetch_optional(&self.db)
            .await?;

        match ride {
            Some(ride) => self.ride_response(ride).await,
            None => Err(ApiError::not_found("Ride not found")),
        }
    }

    async fn ride_response(&self, ride: Ride) -> Result<RideResponse, ApiError> {
        let owner: OwnerInfo = sqlx::query_as("SELECT id, name FROM users WHERE id = ?")
            .bind(&ride.owner_id)
            .fetch_one(&self.db)
            .await?;

        let stops: Vec<Stop> =
            sqlx::query_as("SELECT * FROM stops WHERE ride_id = ? ORDER BY position")
                .bind(&ride.id)
                .fetch_all(&self.db)
                .await?;

        let participants: Vec<PublicUser> = sqlx::query_as(
            "SELECT u.id, u.name, u.phone_number FROM users u \
             JOIN ride_participants rp ON rp.user_id = u.id \
             WHERE rp.ride_id = ? ORDER BY rp.joined_at",
        )
        .bind(&ride.id)
        .fetch_all(&self.db)
        .await?;

        Ok(RideResponse {
            id: ride.id,
            owner,
            status: ride.status,
            people_count: ride.people_count,
            vehicle_type: ride.vehicle_type,
            prefers_gender: ride.prefers_gender,
            earliest_departure: ride.earliest_departure,
            latest_departure: ride.latest_departure,
            stops,
            participants,
            created_at: ride.created_at,
        })
    }

    /// Load a ride and check the caller may mutate it. Absent ride is 404,
    /// foreign ride is 403, terminal ride is 409 carrying the status.
    async fn ride_for_owner(
        &self,
        owner_id: &str,
        ride_id: &str,
    ) -> Result<(Ride, String), ApiError> {
        let ride: Option<Ride> = sqlx::query_as("SELECT * FROM rides WHERE id = ?")
            .bind(ride_id)
            .fetch_optional(&self.db)
            .await?;

        let ride = ride.ok_or_else(|| ApiError::not_found("Ride not found"))?;

        if ride.owner_id != owner_id {
            return Err(ApiError::forbidden("You are not the owner of this ride"));
        }

        if ride.get_status() != RideStatus::Pending {
            return Err(ApiError::conflict(format!(
                "Ride is already {}",
                ride.status.to_lowercase()
            )));
        }

        let owner_name: String = sqlx::query_scalar("SELECT name FROM users WHERE id = ?")
            .bind(owner_id)
            .fetch_one(&self.db)
            .await?;

        Ok((ride, owner_name))
    }
}
