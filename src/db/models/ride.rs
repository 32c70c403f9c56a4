//! Ride and stop models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::user::{OwnerInfo, PublicUser};

/// Ride lifecycle states. PENDING is the sole initial state;
/// CANCELLED and COMPLETED are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RideStatus {
    Pending,
    Cancelled,
    Completed,
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl std::str::FromStr for RideStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "CANCELLED" => Ok(Self::Cancelled),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(format!("Unknown ride status: {}", s)),
        }
    }
}

/// Accepted vehicle types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum VehicleType {
    Car,
    Auto,
    Suv,
}

impl std::fmt::Display for VehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Car => write!(f, "CAR"),
            Self::Auto => write!(f, "AUTO"),
            Self::Suv => write!(f, "SUV"),
        }
    }
}

impl std::str::FromStr for VehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CAR" => Ok(Self::Car),
            "AUTO" => Ok(Self::Auto),
            "SUV" => Ok(Self::Suv),
            _ => Err(format!("Unknown vehicle type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ride {
    pub id: String,
    pub owner_id: String,
    pub status: String,
    pub people_count: i64,
    pub vehicle_type: String,
    pub prefers_gender: Option<String>,
    pub earliest_departure: String,
    pub latest_departure: String,
    pub created_at: String,
}

impl Ride {
    /// Parse the stored status, failing closed: a row with an
    /// unrecognized status reads as terminal and stays immutable.
    pub fn get_status(&self) -> RideStatus {
        self.status.parse().unwrap_or(RideStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Stop {
    pub id: String,
    pub ride_id: String,
    pub name: String,
    pub position: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// A stop in a create-ride request
#[derive(Debug, Clone, Deserialize)]
pub struct StopInput {
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRideRequest {
    pub stops: Vec<StopInput>,
    pub people_count: i64,
    pub vehicle_type: String,
    /// Epoch milliseconds
    pub earliest_departure: i64,
    /// Epoch milliseconds
    pub latest_departure: i64,
    pub prefers_gender: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelRideRequest {
    pub reason: String,
}

/// A pending ride offered to other users, with the viewer's own invite
/// attached when one exists
#[derive(Debug, Clone, Serialize)]
pub struct SuggestedRide {
    pub id: String,
    pub owner: OwnerInfo,
    pub status: String,
    pub people_count: i64,
    pub vehicle_type: String,
    pub prefers_gender: Option<String>,
    pub earliest_departure: String,
    pub latest_departure: String,
    pub stops: Vec<Stop>,
    pub participant_ids: Vec<String>,
    pub my_invite: Option<super::invite::Invite>,
    pub created_at: String,
}

/// A ride as seen by its owner or a participant
#[derive(Debug, Clone, Serialize)]
pub struct RideResponse {
    pub id: String,
    pub owner: OwnerInfo,
    pub status: String,
    pub people_count: i64,
    pub vehicle_type: String,
    pub prefers_gender: Option<String>,
    pub earliest_departure: String,
    pub latest_departure: String,
    pub stops: Vec<Stop>,
    pub participants: Vec<PublicUser>,
    pub created_at: String,
}
