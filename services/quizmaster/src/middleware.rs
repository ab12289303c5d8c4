//! Session gate for routes that need an authenticated account

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use crate::{error::AppError, models::User, state::AppState};

/// The account bound to the request's session
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub session_id: String,
    pub user: User,
}

/// Resolve the session cookie and attach a [`CurrentUser`] to the request
///
/// Missing, unknown or expired sessions are rejected with 401. A session
/// whose account has been removed is destroyed before rejecting.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let sid = state.session_id(&jar).ok_or(AppError::Unauthorized)?;

    let Some(record) = state.sessions.resolve(&sid).await? else {
        debug!("Rejected request with unknown or expired session");
        return Err(AppError::Unauthorized);
    };

    let Some(user) = state.accounts.find_by_id(record.user_id).await? else {
        warn!(user_id = %record.user_id, "Session refers to a missing account");
        state.sessions.destroy(&sid).await?;
        return Err(AppError::Unauthorized);
    };

    req.extensions_mut().insert(CurrentUser {
        session_id: sid,
        user,
    });

    Ok(next.run(req).await)
}
