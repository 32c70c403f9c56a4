//! Input validation for API requests.
//!
//! All validation runs before any store mutation so a rejected request
//! never leaves partial writes behind.

use chrono::{DateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::db::{Gender, StopInput, VehicleType};

lazy_static! {
    /// Indian phone number with country code, e.g. +919876543210
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+91\d{10}$").unwrap();

    /// Alphanumeric passwords only
    static ref PASSWORD_REGEX: Regex = Regex::new(r"^[A-Za-z0-9]+$").unwrap();
}

/// Validate a phone number
pub fn validate_phone_number(phone: &str) -> Result<(), String> {
    if phone.is_empty() {
        return Err("Phone number is required".to_string());
    }

    if !PHONE_REGEX.is_match(phone) {
        return Err("Please provide an Indian phone number with country code".to_string());
    }

    Ok(())
}

/// Validate a password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if !PASSWORD_REGEX.is_match(password) {
        return Err("Password must be alphanumeric".to_string());
    }

    Ok(())
}

/// Validate a cancel/decline reason against a minimum length
pub fn validate_reason(reason: &str, min_len: usize) -> Result<(), String> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err("Reason is required".to_string());
    }

    if trimmed.len() < min_len {
        return Err(format!("Reason must be at least {} characters", min_len));
    }

    if trimmed.len() > 500 {
        return Err("Reason is too long (max 500 characters)".to_string());
    }

    Ok(())
}

/// Validate a vehicle type against the fixed set
pub fn validate_vehicle_type(vehicle_type: &str) -> Result<VehicleType, String> {
    if vehicle_type.is_empty() {
        return Err("Please provide a vehicle type".to_string());
    }

    vehicle_type
        .parse()
        .map_err(|_| "Vehicle type must be one of CAR, AUTO, SUV".to_string())
}

/// Validate a gender value
pub fn validate_gender(gender: &str) -> Result<Gender, String> {
    if gender.is_empty() {
        return Err("Please provide gender".to_string());
    }

    gender
        .parse()
        .map_err(|_| "Gender must be MALE or FEMALE".to_string())
}

/// Validate a departure window given as epoch milliseconds.
/// Returns the parsed timestamps on success.
pub fn validate_departure_window(
    earliest_ms: i64,
    latest_ms: i64,
) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
    let earliest = Utc
        .timestamp_millis_opt(earliest_ms)
        .single()
        .ok_or_else(|| "Earliest departure must be a valid timestamp".to_string())?;

    let latest = Utc
        .timestamp_millis_opt(latest_ms)
        .single()
        .ok_or_else(|| "Latest departure must be a valid timestamp".to_string())?;

    if earliest > latest {
        return Err("Earliest departure must be before latest departure".to_string());
    }

    Ok((earliest, latest))
}

/// Validate the stops of a create-ride request
pub fn validate_stops(stops: &[StopInput]) -> Result<(), String> {
    if stops.len() < 2 {
        return Err("Ride must have at least two stops".to_string());
    }

    if stops.iter().any(|s| s.name.trim().is_empty()) {
        return Err("Stop names must not be empty".to_string());
    }

    if stops[0].name == stops[stops.len() - 1].name {
        return Err("First and last stops must be different".to_string());
    }

    Ok(())
}

/// Validate a people count
pub fn validate_people_count(count: i64) -> Result<(), String> {
    if count < 1 {
        return Err("People count must be at least 1".to_string());
    }

    if count > 16 {
        return Err("People count is too large (max 16)".to_string());
    }

    Ok(())
}
