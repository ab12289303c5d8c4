//! HTTP routes

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::{middleware::require_session, state::AppState};

pub mod account;
pub mod auth;
pub mod catalog;
pub mod quizzes;

/// Request body ceiling for the profile picture upload; the file itself is
/// capped separately at [`account::MAX_PROFILE_PICTURE_BYTES`]
const UPLOAD_BODY_LIMIT: usize = 8 * 1024 * 1024;

/// Create the router for the quizmaster service
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/statuses", get(catalog::list_statuses))
        .route("/languages", get(catalog::list_languages))
        .route("/quizzes", get(quizzes::list_quizzes))
        .route("/quizzes/:id", get(quizzes::get_quiz));

    let protected = Router::new()
        .route(
            "/user",
            get(account::current_user).delete(account::delete_account),
        )
        .route("/user/profile", post(account::update_profile))
        .route("/user/password", post(account::update_password))
        .route(
            "/user/profile-picture",
            post(account::update_profile_picture).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/user/quizzes", get(quizzes::list_user_quizzes))
        .route("/user/results", get(quizzes::list_user_results))
        .route("/quizzes", post(quizzes::create_quiz))
        .route("/quiz-results", post(quizzes::create_result))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", public.merge(protected))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "quizmaster"
    }))
}
