//! User models and profile DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User gender, stored as TEXT in the users table
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "MALE"),
            Self::Female => write!(f, "FEMALE"),
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MALE" => Ok(Self::Male),
            "FEMALE" => Ok(Self::Female),
            _ => Err(format!("Unknown gender: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub phone_number: String,
    pub address: Option<String>,
    pub password_hash: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Profile returned to the user themselves (never masked)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub phone_number: String,
    pub address: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            gender: user.gender,
            phone_number: user.phone_number,
            address: user.address,
        }
    }
}

/// A user embedded in a ride or invite response. The phone number is
/// subject to the visibility filter before serialization.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub phone_number: String,
}

/// Owner summary without contact details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OwnerInfo {
    pub id: String,
    pub name: String,
}

/// Participant summary shown on rides the viewer has not joined
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParticipantInfo {
    pub id: String,
    pub name: String,
    pub gender: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub gender: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone_number: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub phone_number: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub phone_number: String,
    pub otp: String,
    pub password: String,
    pub name: Option<String>,
    pub gender: Option<String>,
}
