//! Invite lifecycle manager: send, accept, decline, and the sent/received
//! listing behind the invites API.
//!
//! Commitment policy, fixed and tested: a sender may hold any number of
//! PENDING invites but at most one ACCEPTED commitment. Accepting an invite
//! auto-declines every other PENDING invite from the same sender, and a
//! sender with an ACCEPTED commitment (or a pending ride of their own)
//! cannot send new invites.

use chrono::Utc;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::validation;
use crate::db::{
    DbPool, Invite, InviteStatus, InvitedRide, InvitesResponse, OwnerInfo, ParticipantInfo,
    PublicUser, ReceivedInvite, Ride, RideInvites, RideResponse, RideStatus, SentInvite, Stop,
};

use super::push_notification;

/// Minimum length for a decline reason
const DECLINE_REASON_MIN_LEN: usize = 2;

/// Decline reason recorded when accepting one invite retires the
/// sender's other pending invites
const SIBLING_DECLINE_REASON: &str = "Joined another ride";

pub struct InviteLifecycle {
    db: DbPool,
}

impl InviteLifecycle {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Send a join invite to a PENDING ride
    pub async fn send_invite(&self, sender_id: &str, ride_id: &str) -> Result<Invite, ApiError> {
        if ride_id.is_empty() {
            return Err(ApiError::validation("Ride id is required"));
        }

        let ride: Option<Ride> = sqlx::query_as("SELECT * FROM rides WHERE id = ?")
            .bind(ride_id)
            .fetch_optional(&self.db)
            .await?;
        let ride = ride.ok_or_else(|| ApiError::not_found("Ride not found"))?;

        if ride.get_status() != RideStatus::Pending {
            return Err(ApiError::conflict(format!(
                "Ride is already {}",
                ride.status.to_lowercase()
            )));
        }

        if ride.owner_id == sender_id {
            return Err(ApiError::conflict("You cannot invite your own ride"));
        }

        // Duplicate guard: one non-terminal invite per sender per ride
        let duplicate: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM invites \
             WHERE ride_id = ? AND sender_id = ? AND status IN ('PENDING', 'ACCEPTED')",
        )
        .bind(ride_id)
        .bind(sender_id)
        .fetch_one(&self.db)
        .await?;
        if duplicate > 0 {
            return Err(ApiError::conflict("You already sent an invite to this ride"));
        }

        // Commitment guard: no accepted invite on a live ride, no pending
        // ride of the sender's own
        let committed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM invites i \
             JOIN rides r ON r.id = i.ride_id \
             WHERE i.sender_id = ? AND i.status = 'ACCEPTED' AND r.status = 'PENDING'",
        )
        .bind(sender_id)
        .fetch_one(&self.db)
        .await?;
        if committed > 0 {
            return Err(ApiError::conflict("You already joined another ride"));
        }

        let owns_pending: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM rides WHERE owner_id = ? AND status = 'PENDING'")
                .bind(sender_id)
                .fetch_one(&self.db)
                .await?;
        if owns_pending > 0 {
            return Err(ApiError::conflict("You already have a pending ride of your own"));
        }

        let sender_name: String = sqlx::query_scalar("SELECT name FROM users WHERE id = ?")
            .bind(sender_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        let invite = Invite {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            ride_id: ride_id.to_string(),
            status: InviteStatus::Pending.to_string(),
            decline_reason: None,
            created_at: Utc::now().to_rfc3339(),
        };

        let mut tx = self.db.begin().await?;

        self.assert_ride_pending(&mut tx, ride_id).await?;

        // The partial unique index on (ride_id, sender_id, status = 'PENDING')
        // turns a concurrent double-send into a constraint violation here.
        sqlx::query(
            "INSERT INTO invites (id, sender_id, ride_id, status, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&invite.id)
        .bind(&invite.sender_id)
        .bind(&invite.ride_id)
        .bind(&invite.status)
        .bind(&invite.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err)
                if db_err.message().contains("UNIQUE constraint failed") =>
            {
                ApiError::conflict("You already sent an invite to this ride")
            }
            _ => ApiError::from(e),
        })?;

        push_notification(
            &mut tx,
            &ride.owner_id,
            &format!("{} wants to join your ride", sender_name),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(invite_id = %invite.id, ride_id = %ride_id, "Invite sent");

        Ok(invite)
    }

    /// Accept an invite. Inside one transaction: the invite is marked
    /// ACCEPTED under an optimistic status guard, the sender joins the
    /// participant list, the sender's other pending invites are retired,
    /// and everyone affected is notified.
    pub async fn accept_invite(&self, caller_id: &str, invite_id: &str) -> Result<(), ApiError> {
        let (invite, ride) = self.invite_with_ride(invite_id).await?;

        if ride.owner_id != caller_id {
            return Err(ApiError::forbidden("You are not the owner of this ride"));
        }

        if ride.get_status() != RideStatus::Pending {
            return Err(ApiError::conflict(format!(
                "Ride is already {}",
                ride.status.to_lowercase()
            )));
        }

        if invite.get_status() != InviteStatus::Pending {
            return Err(ApiError::conflict(format!(
                "Invite is already {}",
                invite.status.to_lowercase()
            )));
        }

        let sender_name: String = sqlx::query_scalar("SELECT name FROM users WHERE id = ?")
            .bind(&invite.sender_id)
            .fetch_one(&self.db)
            .await?;
        let owner_name: String = sqlx::query_scalar("SELECT name FROM users WHERE id = ?")
            .bind(&ride.owner_id)
            .fetch_one(&self.db)
            .await?;

        let mut tx = self.db.begin().await?;

        self.assert_ride_pending(&mut tx, &ride.id).await?;

        // Exactly one concurrent accept can win this guard
        let updated =
            sqlx::query("UPDATE invites SET status = 'ACCEPTED' WHERE id = ? AND status = 'PENDING'")
                .bind(&invite.id)
                .execute(&mut *tx)
                .await?;
        if updated.rows_affected() == 0 {
            return Err(ApiError::conflict("Invite is no longer pending"));
        }

        sqlx::query("INSERT INTO ride_participants (ride_id, user_id, joined_at) VALUES (?, ?, ?)")
            .bind(&ride.id)
            .bind(&invite.sender_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

        // Retire the sender's other pending invites; each affected ride
        // owner hears about it
        let siblings: Vec<(String, String)> = sqlx::query_as(
            "SELECT i.id, r.owner_id FROM invites i \
             JOIN rides r ON r.id = i.ride_id \
             WHERE i.sender_id = ? AND i.status = 'PENDING' AND i.id != ?",
        )
        .bind(&invite.sender_id)
        .bind(&invite.id)
        .fetch_all(&mut *tx)
        .await?;

        for (sibling_id, other_owner_id) in &siblings {
            sqlx::query(
                "UPDATE invites SET status = 'DECLINED', decline_reason = ? \
                 WHERE id = ? AND status = 'PENDING'",
            )
            .bind(SIBLING_DECLINE_REASON)
            .bind(sibling_id)
            .execute(&mut *tx)
            .await?;

            push_notification(
                &mut tx,
                other_owner_id,
                &format!("{} withdrew their invite after joining another ride", sender_name),
            )
            .await?;
        }

        // "X joined" to every pre-existing participant, owner included
        let participants: Vec<(String,)> =
            sqlx::query_as("SELECT user_id FROM ride_participants WHERE ride_id = ? AND user_id != ?")
                .bind(&ride.id)
                .bind(&invite.sender_id)
                .fetch_all(&mut *tx)
                .await?;

        for (participant_id,) in &participants {
            push_notification(
                &mut tx,
                participant_id,
                &format!("{} joined the ride by {}", sender_name, owner_name),
            )
            .await?;
        }

        push_notification(
            &mut tx,
            &invite.sender_id,
            &format!("Your invite to the ride by {} was accepted", owner_name),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            invite_id = %invite.id,
            ride_id = %ride.id,
            retired = siblings.len(),
            "Invite accepted"
        );

        Ok(())
    }

    /// Decline a pending invite. The sender withdraws, or the ride owner
    /// rejects; the counterparty is notified either way. Accepted invites
    /// are terminal and can only be revoked by cancelling the ride.
    pub async fn decline_invite(
        &self,
        caller_id: &str,
        invite_id: &str,
        reason: &str,
    ) -> Result<(), ApiError> {
        validation::validate_reason(reason, DECLINE_REASON_MIN_LEN).map_err(ApiError::validation)?;

        let (invite, ride) = self.invite_with_ride(invite_id).await?;

        let is_sender = invite.sender_id == caller_id;
        if !is_sender && ride.owner_id != caller_id {
            return Err(ApiError::forbidden("You cannot decline this invite"));
        }

        if ride.get_status() != RideStatus::Pending {
            return Err(ApiError::conflict(format!(
                "Ride is already {}",
                ride.status.to_lowercase()
            )));
        }

        if invite.get_status() != InviteStatus::Pending {
            return Err(ApiError::conflict(format!(
                "Invite is already {}",
                invite.status.to_lowercase()
            )));
        }

        let sender_name: String = sqlx::query_scalar("SELECT name FROM users WHERE id = ?")
            .bind(&invite.sender_id)
            .fetch_one(&self.db)
            .await?;
        let owner_name: String = sqlx::query_scalar("SELECT name FROM users WHERE id = ?")
            .bind(&ride.owner_id)
            .fetch_one(&self.db)
            .await?;

        let decline_reason = if is_sender {
            format!("Left: {}", reason)
        } else {
            reason.to_string()
        };

        let mut tx = self.db.begin().await?;

        self.assert_ride_pending(&mut tx, &ride.id).await?;

        let updated = sqlx::query(
            "UPDATE invites SET status = 'DECLINED', decline_reason = ? \
             WHERE id = ? AND status = 'PENDING'",
        )
        .bind(&decline_reason)
        .bind(&invite.id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(ApiError::conflict("Invite is no longer pending"));
        }

        if is_sender {
            push_notification(
                &mut tx,
                &ride.owner_id,
                &format!("{} left your ride. Reason: {}", sender_name, reason),
            )
            .await?;
        } else {
            push_notification(
                &mut tx,
                &invite.sender_id,
                &format!(
                    "Your invite to the ride by {} was declined. Reason: {}",
                    owner_name, reason
                ),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(invite_id = %invite.id, by_sender = is_sender, "Invite declined");

        Ok(())
    }

    /// Everything the viewer sent plus everything their rides received.
    /// Phone numbers are still real here; the visibility filter masks them
    /// before the response leaves the API.
    pub async fn list_invites(&self, user_id: &str) -> Result<InvitesResponse, ApiError> {
        let sent_rows: Vec<Invite> =
            sqlx::query_as("SELECT * FROM invites WHERE sender_id = ? ORDER BY created_at DESC")
                .bind(user_id)
                .fetch_all(&self.db)
                .await?;

        let mut sent = Vec::with_capacity(sent_rows.len());
        for invite in sent_rows {
            let ride: Ride = sqlx::query_as("SELECT * FROM rides WHERE id = ?")
                .bind(&invite.ride_id)
                .fetch_one(&self.db)
                .await?;
            let owner: PublicUser =
                sqlx::query_as("SELECT id, name, phone_number FROM users WHERE id = ?")
                    .bind(&ride.owner_id)
                    .fetch_one(&self.db)
                    .await?;
            let stops: Vec<Stop> =
                sqlx::query_as("SELECT * FROM stops WHERE ride_id = ? ORDER BY position")
                    .bind(&ride.id)
                    .fetch_all(&self.db)
                    .await?;
            let participants: Vec<ParticipantInfo> = sqlx::query_as(
                "SELECT u.id, u.name, u.gender FROM users u \
                 JOIN ride_participants rp ON rp.user_id = u.id \
                 WHERE rp.ride_id = ? ORDER BY rp.joined_at",
            )
            .bind(&ride.id)
            .fetch_all(&self.db)
            .await?;

            sent.push(SentInvite {
                id: invite.id,
                status: invite.status,
                decline_reason: invite.decline_reason,
                created_at: invite.created_at,
                ride: InvitedRide {
                    id: ride.id,
                    status: ride.status,
                    people_count: ride.people_count,
                    vehicle_type: ride.vehicle_type,
                    prefers_gender: ride.prefers_gender,
                    earliest_departure: ride.earliest_departure,
                    latest_departure: ride.latest_departure,
                    owner,
                    stops,
                    participants,
                },
            });
        }

        let own_rides: Vec<Ride> =
            sqlx::query_as("SELECT * FROM rides WHERE owner_id = ? ORDER BY created_at DESC")
                .bind(user_id)
                .fetch_all(&self.db)
                .await?;

        let mut received = Vec::with_capacity(own_rides.len());
        for ride in own_rides {
            let invites: Vec<Invite> =
                sqlx::query_as("SELECT * FROM invites WHERE ride_id = ? ORDER BY created_at DESC")
                    .bind(&ride.id)
                    .fetch_all(&self.db)
                    .await?;

            let mut shaped = Vec::with_capacity(invites.len());
            for invite in invites {
                let sender: PublicUser =
                    sqlx::query_as("SELECT id, name, phone_number FROM users WHERE id = ?")
                        .bind(&invite.sender_id)
                        .fetch_one(&self.db)
                        .await?;
                shaped.push(ReceivedInvite {
                    id: invite.id,
                    status: invite.status,
                    decline_reason: invite.decline_reason,
                    created_at: invite.created_at,
                    sender,
                });
            }

            received.push(RideInvites {
                ride: self.ride_response(ride).await?,
                invites: shaped,
            });
        }

        Ok(InvitesResponse { sent, received })
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

    /// Re-assert the ride is still PENDING inside the transaction. The
    /// pool read that preceded the transaction can go stale against a
    /// concurrent cancel or complete; the self-assignment takes the write
    /// lock and serializes against them, and zero affected rows means the
    /// ride turned terminal in the meantime.
    async fn assert_ride_pending(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        ride_id: &str,
    ) -> Result<(), ApiError> {
        let live =
            sqlx::query("UPDATE rides SET status = 'PENDING' WHERE id = ? AND status = 'PENDING'")
                .bind(ride_id)
                .execute(&mut **tx)
                .await?;
        if live.rows_affected() == 0 {
            return Err(ApiError::conflict("Ride is no longer pending"));
        }
        Ok(())
    }

    async fn invite_with_ride(&self, invite_id: &str) -> Result<(Invite, Ride), ApiError> {
        if invite_id.is_empty() {
            return Err(ApiError::validation("Invite id is required"));
        }

        let invite: Option<Invite> = sqlx::query_as("SELECT * FROM invites WHERE id = ?")
            .bind(invite_id)
            .fetch_optional(&self.db)
            .await?;
        let invite = invite.ok_or_else(|| ApiError::not_found("Invite not found"))?;

        let ride: Ride = sqlx::query_as("SELECT * FROM rides WHERE id = ?")
            .bind(&invite.ride_id)
            .fetch_one(&self.db)
            .await?;

        Ok((invite, ride))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorCode;
    use crate::lifecycle::testutil::*;
    use crate::lifecycle::RideLifecycle;

    async fn setup() -> (crate::db::DbPool, RideLifecycle, InviteLifecycle) {
        let pool = test_pool().await;
        (
            pool.clone(),
            RideLifecycle::new(pool.clone()),
            InviteLifecycle::new(pool),
        )
    }

    #[tokio::test]
    async fn test_send_invite_guards() {
        let (pool, rides, invites) = setup().await;
        let owner = seed_user(&pool, "Alice", "+919876543210").await;
        let sender = seed_user(&pool, "Bob", "+919876543211").await;

        let ride = rides
            .create_ride(&owner, ride_request(&["A", "B"]))
            .await
            .unwrap();

        // Unknown ride
        let err = invites.send_invite(&sender, "no-such-ride").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        // Owner inviting their own ride
        let err = invites.send_invite(&owner, &ride.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);

        // First invite goes through, duplicate does not
        invites.send_invite(&sender, &ride.id).await.unwrap();
        let err = invites.send_invite(&sender, &ride.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);

        // The owner heard about the invite
        assert_eq!(notification_count(&pool, &owner).await, 1);
    }

    #[tokio::test]
    async fn test_send_invite_to_terminal_ride() {
        let (pool, rides, invites) = setup().await;
        let owner = seed_user(&pool, "Alice", "+919876543210").await;
        let sender = seed_user(&pool, "Bob", "+919876543211").await;

        let ride = rides
            .create_ride(&owner, ride_request(&["A", "B"]))
            .await
            .unwrap();
        rides.complete_ride(&owner, &ride.id).await.unwrap();

        let err = invites.send_invite(&sender, &ride.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert!(err.message().contains("completed"));
    }

    #[tokio::test]
    async fn test_resend_after_decline() {
        let (pool, rides, invites) = setup().await;
        let owner = seed_user(&pool, "Alice", "+919876543210").await;
        let sender = seed_user(&pool, "Bob", "+919876543211").await;

        let ride = rides
            .create_ride(&owner, ride_request(&["A", "B"]))
            .await
            .unwrap();

        let invite = invites.send_invite(&sender, &ride.id).await.unwrap();
        invites
            .decline_invite(&owner, &invite.id, "car is full")
            .await
            .unwrap();

        // A declined invite is terminal; the sender may try again
        invites.send_invite(&sender, &ride.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_pending_invite_rejected_by_store() {
        let (pool, rides, invites) = setup().await;
        let owner = seed_user(&pool, "Alice", "+919876543210").await;
        let sender = seed_user(&pool, "Bob", "+919876543211").await;

        let ride = rides
            .create_ride(&owner, ride_request(&["A", "B"]))
            .await
            .unwrap();
        invites.send_invite(&sender, &ride.id).await.unwrap();

        // A second PENDING row for the same (ride, sender) must be refused
        // by the store itself, so a racing send that slips past the COUNT
        // check still cannot commit
        let result = sqlx::query(
            "INSERT INTO invites (id, sender_id, ride_id, status, created_at) \
             VALUES (?, ?, ?, 'PENDING', ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&sender)
        .bind(&ride.id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_accept_on_completed_ride_changes_nothing() {
        let (pool, rides, invites) = setup().await;
        let owner = seed_user(&pool, "Alice", "+919876543210").await;
        let sender = seed_user(&pool, "Bob", "+919876543211").await;

        let ride = rides
            .create_ride(&owner, ride_request(&["A", "B"]))
            .await
            .unwrap();
        let invite = invites.send_invite(&sender, &ride.id).await.unwrap();

        // Completion leaves the invite PENDING, so only the ride status
        // guard stands between the invite and the participant list
        rides.complete_ride(&owner, &ride.id).await.unwrap();

        let err = invites.accept_invite(&owner, &invite.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(invite_status(&pool, &invite.id).await, "PENDING");
        assert_eq!(participant_count(&pool, &ride.id).await, 1);
    }

    #[tokio::test]
    async fn test_commitment_guard_on_send() {
        let (pool, rides, invites) = setup().await;
        let owner_a = seed_user(&pool, "Alice", "+919876543210").await;
        let owner_b = seed_user(&pool, "Dan", "+919876543213").await;
        let sender = seed_user(&pool, "Bob", "+919876543211").await;

        let ride_a = rides
            .create_ride(&owner_a, ride_request(&["A", "B"]))
            .await
            .unwrap();
        let ride_b = rides
            .create_ride(&owner_b, ride_request(&["C", "D"]))
            .await
            .unwrap();

        let invite = invites.send_invite(&sender, &ride_a.id).await.unwrap();
        invites.accept_invite(&owner_a, &invite.id).await.unwrap();

        // Accepted commitment blocks further invites
        let err = invites.send_invite(&sender, &ride_b.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);

        // A ride owner with a pending ride cannot invite either
        let err = invites.send_invite(&owner_b, &ride_a.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn test_accept_invite_side_effects() {
        let (pool, rides, invites) = setup().await;
        let owner = seed_user(&pool, "Alice", "+919876543210").await;
        let sender = seed_user(&pool, "Bob", "+919876543211").await;

        let ride = rides
            .create_ride(&owner, ride_request(&["A", "B"]))
            .await
            .unwrap();
        let invite = invites.send_invite(&sender, &ride.id).await.unwrap();

        invites.accept_invite(&owner, &invite.id).await.unwrap();

        assert_eq!(invite_status(&pool, &invite.id).await, "ACCEPTED");
        assert_eq!(participant_count(&pool, &ride.id).await, 2);

        // Sender got "accepted", owner got "wants to join" + "joined"
        assert_eq!(notification_count(&pool, &sender).await, 1);
        assert_eq!(notification_count(&pool, &owner).await, 2);
    }

    #[tokio::test]
    async fn test_accept_retires_sibling_invites() {
        let (pool, rides, invites) = setup().await;
        let owner_a = seed_user(&pool, "Alice", "+919876543210").await;
        let owner_b = seed_user(&pool, "Dan", "+919876543213").await;
        let sender = seed_user(&pool, "Bob", "+919876543211").await;

        let ride_a = rides
            .create_ride(&owner_a, ride_request(&["A", "B"]))
            .await
            .unwrap();
        let ride_b = rides
            .create_ride(&owner_b, ride_request(&["C", "D"]))
            .await
            .unwrap();

        let invite_a = invites.send_invite(&sender, &ride_a.id).await.unwrap();
        let invite_b = invites.send_invite(&sender, &ride_b.id).await.unwrap();

        invites.accept_invite(&owner_a, &invite_a.id).await.unwrap();

        assert_eq!(invite_status(&pool, &invite_a.id).await, "ACCEPTED");
        assert_eq!(invite_status(&pool, &invite_b.id).await, "DECLINED");
        let reason: Option<String> =
            sqlx::query_scalar("SELECT decline_reason FROM invites WHERE id = ?")
                .bind(&invite_b.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(reason.as_deref(), Some(SIBLING_DECLINE_REASON));

        // Bob never joined ride B
        assert_eq!(participant_count(&pool, &ride_b.id).await, 1);
        // Owner B heard about the invite and the withdrawal
        assert_eq!(notification_count(&pool, &owner_b).await, 2);
    }

    #[tokio::test]
    async fn test_accept_requires_owner() {
        let (pool, rides, invites) = setup().await;
        let owner = seed_user(&pool, "Alice", "+919876543210").await;
        let sender = seed_user(&pool, "Bob", "+919876543211").await;

        let ride = rides
            .create_ride(&owner, ride_request(&["A", "B"]))
            .await
            .unwrap();
        let invite = invites.send_invite(&sender, &ride.id).await.unwrap();

        let err = invites.accept_invite(&sender, &invite.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_accept_non_pending_invite_is_conflict() {
        let (pool, rides, invites) = setup().await;
        let owner = seed_user(&pool, "Alice", "+919876543210").await;
        let sender = seed_user(&pool, "Bob", "+919876543211").await;

        let ride = rides
            .create_ride(&owner, ride_request(&["A", "B"]))
            .await
            .unwrap();
        let invite = invites.send_invite(&sender, &ride.id).await.unwrap();

        invites.accept_invite(&owner, &invite.id).await.unwrap();
        let participants_before = participant_count(&pool, &ride.id).await;
        let notifications_before = notification_count(&pool, &sender).await;

        // Second accept observes the terminal status and changes nothing
        let err = invites.accept_invite(&owner, &invite.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(participant_count(&pool, &ride.id).await, participants_before);
        assert_eq!(notification_count(&pool, &sender).await, notifications_before);
    }

    #[tokio::test]
    async fn test_decline_by_owner_and_by_sender() {
        let (pool, rides, invites) = setup().await;
        let owner = seed_user(&pool, "Alice", "+919876543210").await;
        let bob = seed_user(&pool, "Bob", "+919876543211").await;
        let carol = seed_user(&pool, "Carol", "+919876543212").await;

        let ride = rides
            .create_ride(&owner, ride_request(&["A", "B"]))
            .await
            .unwrap();

        // Owner rejects Bob
        let bob_invite = invites.send_invite(&bob, &ride.id).await.unwrap();
        invites
            .decline_invite(&owner, &bob_invite.id, "car is full")
            .await
            .unwrap();
        let message: String = sqlx::query_scalar(
            "SELECT message FROM notifications WHERE receiver_id = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(&bob)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(message.contains("was declined"));

        // Carol withdraws her own invite
        let carol_invite = invites.send_invite(&carol, &ride.id).await.unwrap();
        invites
            .decline_invite(&carol, &carol_invite.id, "found another ride")
            .await
            .unwrap();
        let reason: Option<String> =
            sqlx::query_scalar("SELECT decline_reason FROM invites WHERE id = ?")
                .bind(&carol_invite.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(reason.as_deref(), Some("Left: found another ride"));
        let message: String = sqlx::query_scalar(
            "SELECT message FROM notifications WHERE receiver_id = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(&owner)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(message.contains("left your ride"));
    }

    #[tokio::test]
    async fn test_decline_guards() {
        let (pool, rides, invites) = setup().await;
        let owner = seed_user(&pool, "Alice", "+919876543210").await;
        let sender = seed_user(&pool, "Bob", "+919876543211").await;
        let stranger = seed_user(&pool, "Eve", "+919876543214").await;

        let ride = rides
            .create_ride(&owner, ride_request(&["A", "B"]))
            .await
            .unwrap();
        let invite = invites.send_invite(&sender, &ride.id).await.unwrap();

        // Reason too short
        let err = invites
            .decline_invite(&owner, &invite.id, "x")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);

        // Neither sender nor owner
        let err = invites
            .decline_invite(&stranger, &invite.id, "not mine")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        // No backward transition from ACCEPTED
        invites.accept_invite(&owner, &invite.id).await.unwrap();
        let err = invites
            .decline_invite(&owner, &invite.id, "test")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(invite_status(&pool, &invite.id).await, "ACCEPTED");
    }

    #[tokio::test]
    async fn test_concurrent_accept_single_winner() {
        let (pool, rides, invites) = setup().await;
        let owner = seed_user(&pool, "Alice", "+919876543210").await;
        let sender = seed_user(&pool, "Bob", "+919876543211").await;

        let ride = rides
            .create_ride(&owner, ride_request(&["A", "B"]))
            .await
            .unwrap();
        let invite = invites.send_invite(&sender, &ride.id).await.unwrap();

        let a = InviteLifecycle::new(pool.clone());
        let b = InviteLifecycle::new(pool.clone());
        let (ra, rb) = tokio::join!(
            a.accept_invite(&owner, &invite.id),
            b.accept_invite(&owner, &invite.id),
        );

        // Exactly one winner; the loser sees a conflict
        assert_eq!(
            ra.is_ok() as u8 + rb.is_ok() as u8,
            1,
            "exactly one accept must win"
        );
        let loser = if ra.is_err() { ra } else { rb };
        assert_eq!(loser.unwrap_err().code(), ErrorCode::Conflict);

        // Participant count increased by exactly one
        assert_eq!(participant_count(&pool, &ride.id).await, 2);
    }

    #[tokio::test]
    async fn test_list_invites_shapes_both_directions() {
        let (pool, rides, invites) = setup().await;
        let owner = seed_user(&pool, "Alice", "+919876543210").await;
        let sender = seed_user(&pool, "Bob", "+919876543211").await;

        let ride = rides
            .create_ride(&owner, ride_request(&["A", "B"]))
            .await
            .unwrap();
        let invite = invites.send_invite(&sender, &ride.id).await.unwrap();

        let sender_view = invites.list_invites(&sender).await.unwrap();
        assert_eq!(sender_view.sent.len(), 1);
        assert_eq!(sender_view.sent[0].id, invite.id);
        assert_eq!(sender_view.sent[0].ride.id, ride.id);
        assert!(sender_view.received.is_empty());

        let owner_view = invites.list_invites(&owner).await.unwrap();
        assert!(owner_view.sent.is_empty());
        assert_eq!(owner_view.received.len(), 1);
        assert_eq!(owner_view.received[0].invites.len(), 1);
        assert_eq!(owner_view.received[0].invites[0].sender.id, sender);
    }
}
