//! Notification model. Rows are append-only and created only inside
//! lifecycle transactions.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: String,
    pub receiver_id: String,
    pub message: String,
    pub created_at: String,
}
