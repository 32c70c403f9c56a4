//! Invite models and the sent/received listing DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ride::Stop;
use super::user::{ParticipantInfo, PublicUser};

/// Invite lifecycle states. PENDING is the sole initial state;
/// ACCEPTED and DECLINED are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
}

impl std::fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::Declined => write!(f, "DECLINED"),
        }
    }
}

impl std::str::FromStr for InviteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "ACCEPTED" => Ok(Self::Accepted),
            "DECLINED" => Ok(Self::Declined),
            _ => Err(format!("Unknown invite status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invite {
    pub id: String,
    pub sender_id: String,
    pub ride_id: String,
    pub status: String,
    pub decline_reason: Option<String>,
    pub created_at: String,
}

impl Invite {
    /// Parse the stored status, failing closed: a row with an
    /// unrecognized status reads as terminal and stays immutable.
    pub fn get_status(&self) -> InviteStatus {
        self.status.parse().unwrap_or(InviteStatus::Declined)
    }
}

#[derive(Debug, Deserialize)]
pub struct SendInviteRequest {
    pub ride_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeclineInviteRequest {
    pub reason: String,
}

/// The ride a sent invite points at, with the owner's contact details
/// (masked until the invite is accepted)
#[derive(Debug, Clone, Serialize)]
pub struct InvitedRide {
    pub id: String,
    pub status: String,
    pub people_count: i64,
    pub vehicle_type: String,
    pub prefers_gender: Option<String>,
    pub earliest_departure: String,
    pub latest_departure: String,
    pub owner: PublicUser,
    pub stops: Vec<Stop>,
    pub participants: Vec<ParticipantInfo>,
}

/// One invite the viewer sent
#[derive(Debug, Clone, Serialize)]
pub struct SentInvite {
    pub id: String,
    pub status: String,
    pub decline_reason: Option<String>,
    pub created_at: String,
    pub ride: InvitedRide,
}

/// One invite received on a ride the viewer owns, with the sender's
/// contact details (masked until accepted)
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedInvite {
    pub id: String,
    pub status: String,
    pub decline_reason: Option<String>,
    pub created_at: String,
    pub sender: PublicUser,
}

/// A ride the viewer owns together with every invite it received
#[derive(Debug, Clone, Serialize)]
pub struct RideInvites {
    pub ride: super::ride::RideResponse,
    pub invites: Vec<ReceivedInvite>,
}

/// Payload of `GET /invites`
#[derive(Debug, Clone, Serialize)]
pub struct InvitesResponse {
    pub sent: Vec<SentInvite>,
    pub received: Vec<RideInvites>,
}
