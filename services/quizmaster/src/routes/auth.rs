//! Registration, login and logout

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{NewUser, User, UserField},
    state::AppState,
    validation::{validate_email, validate_password, validate_username},
};

/// Request for account registration
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Request for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Replace whatever session the client holds with a new one for `user_id`
async fn start_session(state: &AppState, jar: CookieJar, user_id: Uuid) -> AppResult<CookieJar> {
    if let Some(previous) = state.session_id(&jar) {
        state.sessions.destroy(&previous).await?;
    }

    let sid = state.sessions.create(user_id).await?;
    Ok(jar.add(state.session_cookie(sid)))
}

/// Account registration endpoint
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, CookieJar, Json<User>)> {
    let Json(payload) = payload?;
    if payload.password != payload.confirm_password {
        return Err(AppError::validation("Passwords do not match"));
    }

    validate_username(&payload.username).map_err(AppError::Validation)?;
    validate_email(&payload.email).map_err(AppError::Validation)?;
    validate_password(&payload.password).map_err(AppError::Validation)?;

    // Checked up front so a taken name never costs a key derivation
    for (field, value) in [
        (UserField::Username, &payload.username),
        (UserField::Email, &payload.email),
    ] {
        if state.accounts.find_by_field(field, value).await?.is_some() {
            return Err(AppError::DuplicateKey(format!("{} already exists", field)));
        }
    }

    let password_hash = state.hasher.hash_async(payload.password).await?;
    let user = state
        .accounts
        .create(NewUser::new(payload.username, payload.email, password_hash))
        .await?;

    let jar = start_session(&state, jar, user.id).await?;
    info!(user_id = %user.id, "Account registered");

    Ok((StatusCode::CREATED, jar, Json(user)))
}

/// User login endpoint
///
/// Unknown emails and wrong passwords are indistinguishable to the client.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<(CookieJar, Json<User>)> {
    let Json(payload) = payload?;
    let user = state
        .accounts
        .find_by_field(UserField::Email, &payload.email)
        .await?;

    // An empty stored form still runs a full derivation
    let stored = user
        .as_ref()
        .map(|u| u.password_hash.clone())
        .unwrap_or_default();
    let valid = state.hasher.verify_async(payload.password, stored).await;

    let user = match user {
        Some(user) if valid => user,
        _ => {
            warn!("Login rejected");
            return Err(AppError::InvalidCredentials);
        }
    };

    let jar = start_session(&state, jar, user.id).await?;
    info!(user_id = %user.id, "User logged in");

    Ok((jar, Json(user)))
}

/// Logout endpoint; succeeds with or without a session
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, StatusCode)> {
    if let Some(sid) = state.session_id(&jar) {
        state.sessions.destroy(&sid).await?;
        info!("User logged out");
    }

    Ok((jar.add(state.expired_session_cookie()), StatusCode::OK))
}
