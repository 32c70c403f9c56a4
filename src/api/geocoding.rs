//! Geocoding proxy.
//!
//! The mobile client searches stop names through us so the GraphHopper
//! API key never ships in the app. Responses are passed through as-is.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::auth::AuthUser;
use crate::api::error::ApiError;
use crate::api::ApiResponse;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: u8,
}

fn default_limit() -> u8 {
    5
}

/// `GET /geocoding/autocomplete?q=...`
pub async fn autocomplete(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Query(query): Query<GeocodeQuery>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(ApiError::validation("Search query is required"));
    }

    let api_key = state
        .config
        .geocoding
        .api_key
        .as_deref()
        .ok_or_else(|| ApiError::unavailable("Geocoding is not available"))?;

    let url = format!("{}/geocode", state.config.geocoding.base_url);
    let response = state
        .http
        .get(&url)
        .query(&[
            ("q", q),
            ("limit", &query.limit.min(10).to_string()),
            ("key", api_key),
        ])
        .send()
        .await
        .map_err(|e| {
            tracing::error!("Geocoding request failed: {}", e);
            ApiError::unavailable("Geocoding provider unreachable, please retry")
        })?;

    if !response.status().is_success() {
        let status = response.status();
        tracing::error!(%status, "Geocoding provider error");
        return Err(ApiError::unavailable("Geocoding provider unavailable, please retry"));
    }

    let body: serde_json::Value = response.json().await.map_err(|e| {
        tracing::error!("Geocoding response parse failed: {}", e);
        ApiError::internal("Invalid geocoding response")
    })?;

    Ok(Json(ApiResponse::new(body)))
}
