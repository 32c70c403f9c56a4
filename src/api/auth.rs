//! Phone-number authentication.
//!
//! Sign-up and password resets go through an SMS OTP; after that the
//! client holds a short-lived access token and a long-lived refresh
//! token, both JWTs in http-only cookies. The middleware re-mints the
//! access cookie transparently when only the refresh token is still
//! valid.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::SET_COOKIE, request::Parts, HeaderValue, Request},
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::validation;
use crate::api::ApiResponse;
use crate::db::{Gender, LoginRequest, SendOtpRequest, User, UserResponse, VerifyOtpRequest};
use crate::AppState;

pub const ACCESS_COOKIE: &str = "ridepool_access";
pub const REFRESH_COOKIE: &str = "ridepool_refresh";

const ACCESS_TTL_HOURS: i64 = 2;
const REFRESH_TTL_DAYS: i64 = 28;
const ISSUER: &str = "ridepool";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iss: String,
    iat: i64,
    exp: i64,
}

/// The authenticated caller's user id, inserted by the middleware
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            ApiError::internal("Failed to process password")
        })?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

fn mint_token(user_id: &str, secret: &str, ttl: Duration) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iss: ISSUER.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("Token minting failed: {}", e);
        ApiError::internal("Failed to create session")
    })
}

fn verify_token(token: &str, secret: &str) -> Option<String> {
    let mut validation = Validation::default();
    validation.set_issuer(&[ISSUER]);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .ok()
    .map(|data| data.claims.sub)
}

fn auth_cookie(name: &'static str, token: String) -> Cookie<'static> {
    Cookie::build((name, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn session_cookies(state: &AppState, user_id: &str) -> Result<(Cookie<'static>, Cookie<'static>), ApiError> {
    let access = mint_token(
        user_id,
        &state.config.auth.access_secret,
        Duration::hours(ACCESS_TTL_HOURS),
    )?;
    let refresh = mint_token(
        user_id,
        &state.config.auth.refresh_secret,
        Duration::days(REFRESH_TTL_DAYS),
    )?;
    Ok((
        auth_cookie(ACCESS_COOKIE, access),
        auth_cookie(REFRESH_COOKIE, refresh),
    ))
}

/// Auth middleware. Accepts a valid access cookie, or falls back to the
/// refresh cookie and re-mints the access cookie on the way out.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(user_id) = jar
        .get(ACCESS_COOKIE)
        .and_then(|c| verify_token(c.value(), &state.config.auth.access_secret))
    {
        request.extensions_mut().insert(AuthUser(user_id));
        return Ok(next.run(request).await);
    }

    let user_id = jar
        .get(REFRESH_COOKIE)
        .and_then(|c| verify_token(c.value(), &state.config.auth.refresh_secret))
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    let fresh_access = mint_token(
        &user_id,
        &state.config.auth.access_secret,
        Duration::hours(ACCESS_TTL_HOURS),
    )?;

    request.extensions_mut().insert(AuthUser(user_id));
    let mut response = next.run(request).await;

    let cookie = auth_cookie(ACCESS_COOKIE, fresh_access);
    if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
        response.headers_mut().append(SET_COOKIE, value);
    }

    Ok(response)
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<UserResponse>>), ApiError> {
    validation::validate_phone_number(&request.phone_number).map_err(ApiError::validation)?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE phone_number = ?")
        .bind(&request.phone_number)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;
    if !verify_password(&request.password, hash) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let (access, refresh) = session_cookies(&state, &user.id)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        jar.add(access).add(refresh),
        Json(ApiResponse::new(UserResponse::from(user))),
    ))
}

/// `POST /auth/logout`
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<ApiResponse<()>>) {
    let jar = jar
        .remove(Cookie::build((ACCESS_COOKIE, "")).path("/"))
        .remove(Cookie::build((REFRESH_COOKIE, "")).path("/"));
    (jar, Json(ApiResponse::empty()))
}

/// `POST /auth/otp` - start an SMS verification
pub async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendOtpRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    validation::validate_phone_number(&request.phone_number).map_err(ApiError::validation)?;

    if !state.sms.is_configured() {
        return Err(ApiError::unavailable("OTP delivery is not available"));
    }

    state
        .sms
        .start_verification(&request.phone_number)
        .await
        .map_err(|e| {
            tracing::error!("OTP send failed: {}", e);
            ApiError::unavailable("Could not send the verification code, please retry")
        })?;

    Ok(Json(ApiResponse::empty()))
}

/// `POST /auth/verify` - check the OTP, then create the account or reset
/// the password and open a session
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<(CookieJar, Json<ApiResponse<UserResponse>>), ApiError> {
    validation::validate_phone_number(&request.phone_number).map_err(ApiError::validation)?;
    validation::validate_password(&request.password).map_err(ApiError::validation)?;

    if !state.sms.is_configured() {
        return Err(ApiError::unavailable("OTP delivery is not available"));
    }

    let approved = state
        .sms
        .check_verification(&request.phone_number, &request.otp)
        .await
        .map_err(|e| {
            tracing::error!("OTP check failed: {}", e);
            ApiError::unavailable("Could not verify the code, please retry")
        })?;
    if !approved {
        return Err(ApiError::unauthorized("Invalid or expired verification code"));
    }

    let password_hash = hash_password(&request.password)?;
    let now = Utc::now().to_rfc3339();

    let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE phone_number = ?")
        .bind(&request.phone_number)
        .fetch_optional(&state.db)
        .await?;

    let user = match existing {
        Some(user) => {
            // Known number: the verified OTP authorizes a password reset
            sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
                .bind(&password_hash)
                .bind(&now)
                .bind(&user.id)
                .execute(&state.db)
                .await?;
            User {
                password_hash: Some(password_hash),
                ..user
            }
        }
        None => {
            let name = request
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| ApiError::validation("Name is required for sign-up"))?;
            let gender: Gender = request
                .gender
                .as_deref()
                .ok_or_else(|| ApiError::validation("Gender is required for sign-up"))
                .and_then(|g| validation::validate_gender(g).map_err(ApiError::validation))?;

            let user = User {
                id: uuid::Uuid::new_v4().to_string(),
                name: name.to_string(),
                gender: gender.to_string(),
                phone_number: request.phone_number.clone(),
                address: None,
                password_hash: Some(password_hash),
                created_at: now.clone(),
                updated_at: now,
            };

            sqlx::query(
                "INSERT INTO users (id, name, gender, phone_number, password_hash, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&user.id)
            .bind(&user.name)
            .bind(&user.gender)
            .bind(&user.phone_number)
            .bind(&user.password_hash)
            .bind(&user.created_at)
            .bind(&user.updated_at)
            .execute(&state.db)
            .await?;

            tracing::info!(user_id = %user.id, "User signed up");
            user
        }
    };

    let (access, refresh) = session_cookies(&state, &user.id)?;

    Ok((
        jar.add(access).add(refresh),
        Json(ApiResponse::new(UserResponse::from(user))),
    ))
}
