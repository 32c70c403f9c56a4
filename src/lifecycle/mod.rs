//! Ride and invite lifecycle managers.
//!
//! Every state transition runs inside one store transaction: the status
//! change, participant membership, cascading invite resolution and the
//! notification fan-out either all commit or none do. Status changes use
//! conditional UPDATEs keyed on the current status, so a concurrent writer
//! that loses the race observes a precondition failure instead of a
//! corrupted intermediate state.

pub mod invites;
pub mod rides;
pub mod visibility;

pub use invites::InviteLifecycle;
pub use rides::RideLifecycle;

use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

/// Insert a notification row on the transaction's connection.
pub(crate) async fn push_notification(
    conn: &mut SqliteConnection,
    receiver_id: &str,
    message: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO notifications (id, receiver_id, message, created_at) VALUES (?, ?, ?, ?)")
        .bind(Uuid::new_v4().to_string())
        .bind(receiver_id)
        .bind(message)
        .bind(Utc::now().to_rfc3339())
        .execute(conn)
        .await?;
    Ok(())
}
