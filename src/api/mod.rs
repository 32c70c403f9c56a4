pub mod auth;
pub mod error;
mod geocoding;
mod invites;
mod notifications;
mod rides;
mod suggestions;
mod users;
pub mod validation;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

/// The `{ data, error }` envelope on the success path
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload, for mutations
    pub fn empty() -> Self {
        Self {
            data: None,
            error: None,
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/send-otp", post(auth::send_otp))
        .route("/verify-otp", post(auth::verify_otp));

    // Protected API routes
    let api_routes = Router::new()
        // Profile
        .route("/users/me", get(users::get_me))
        .route("/users/me", put(users::update_me))
        // Rides
        .route("/rides", get(rides::list_rides))
        .route("/rides", post(rides::create_ride))
        .route("/rides/current", get(rides::current_ride))
        .route("/rides/:id", delete(rides::cancel_ride))
        .route("/rides/:id/complete", post(rides::complete_ride))
        // Invites
        .route("/invites", get(invites::list_invites))
        .route("/invites", post(invites::send_invite))
        .route("/invites/:id/accept", post(invites::accept_invite))
        .route("/invites/:id/decline", post(invites::decline_invite))
        // Discovery
        .route("/suggestions", get(suggestions::list_suggestions))
        .route("/geocoding/autocomplete", get(geocoding::autocomplete))
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
