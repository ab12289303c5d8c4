//! Account endpoints behind the session gate

use axum::{
    Extension, Json,
    extract::{
        Multipart, State,
        multipart::MultipartError,
        rejection::JsonRejection,
    },
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    middleware::CurrentUser,
    models::{UpdateUser, User},
    state::AppState,
    validation::{validate_email, validate_password, validate_username},
};

/// Largest accepted profile picture (5 MiB)
pub const MAX_PROFILE_PICTURE_BYTES: usize = 5 * 1024 * 1024;

const PROFILE_PICTURE_FIELD: &str = "profilePicture";

/// Request for profile update; absent fields are left alone
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Request for password change
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Current account endpoint
pub async fn current_user(Extension(current): Extension<CurrentUser>) -> Json<User> {
    Json(current.user)
}

/// Profile update endpoint
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> AppResult<Json<User>> {
    let Json(payload) = payload?;
    if let Some(username) = &payload.username {
        validate_username(username).map_err(AppError::Validation)?;
    }
    if let Some(email) = &payload.email {
        validate_email(email).map_err(AppError::Validation)?;
    }

    let changes = UpdateUser {
        username: payload.username,
        email: payload.email,
        ..Default::default()
    };
    if changes.is_empty() {
        return Ok(Json(current.user));
    }

    let user = state.accounts.update(current.user.id, changes).await?;
    info!(user_id = %user.id, "Profile updated");
    Ok(Json(user))
}

/// Password change endpoint
///
/// The stored hash is only replaced once the current password checks out.
pub async fn update_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(payload) = payload?;
    if payload.new_password != payload.confirm_password {
        return Err(AppError::validation("New passwords do not match"));
    }
    validate_password(&payload.new_password).map_err(AppError::Validation)?;

    let valid = state
        .hasher
        .verify_async(payload.current_password, current.user.password_hash.clone())
        .await;
    if !valid {
        return Err(AppError::validation("Current password is incorrect"));
    }

    let password_hash = state.hasher.hash_async(payload.new_password).await?;
    state
        .accounts
        .update(
            current.user.id,
            UpdateUser {
                password_hash: Some(password_hash),
                ..Default::default()
            },
        )
        .await?;

    info!(user_id = %current.user.id, "Password updated");
    Ok(Json(json!({ "message": "Password updated successfully" })))
}

/// Account deletion endpoint
///
/// The session goes first so it can never outlive the account.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Value>)> {
    state.sessions.destroy(&current.session_id).await?;
    state.accounts.delete(current.user.id).await?;

    info!(user_id = %current.user.id, "Account deleted");
    Ok((
        jar.add(state.expired_session_cookie()),
        Json(json!({ "message": "Account deleted successfully" })),
    ))
}

fn upload_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::validation("File too large")
    } else {
        AppError::validation(format!("Invalid upload: {}", err.body_text()))
    }
}

/// Profile picture upload endpoint
///
/// Expects a multipart field named `profilePicture` holding an image of at
/// most [`MAX_PROFILE_PICTURE_BYTES`]. The image is stored inline as a data URI.
pub async fn update_profile_picture(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> AppResult<Json<User>> {
    while let Some(mut field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(PROFILE_PICTURE_FIELD) {
            continue;
        }

        let mime = field.content_type().unwrap_or_default().to_string();
        if !mime.starts_with("image/") {
            return Err(AppError::validation("Only images are allowed"));
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(upload_error)? {
            if data.len() + chunk.len() > MAX_PROFILE_PICTURE_BYTES {
                return Err(AppError::validation("File too large"));
            }
            data.extend_from_slice(&chunk);
        }

        let picture = format!("data:{};base64,{}", mime, STANDARD.encode(&data));
        let user = state
            .accounts
            .update(
                current.user.id,
                UpdateUser {
                    profile_picture: Some(picture),
                    ..Default::default()
                },
            )
            .await?;

        info!(user_id = %user.id, bytes = data.len(), "Profile picture updated");
        return Ok(Json(user));
    }

    Err(AppError::validation("No file uploaded"))
}
