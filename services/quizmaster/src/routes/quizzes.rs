//! Quiz and quiz result endpoints

use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::CurrentUser,
    models::{NewQuiz, NewQuizResult, Quiz, QuizResult},
    state::AppState,
    storage::StoreError,
};

#[derive(Debug, Deserialize)]
pub struct CreateQuizRequest {
    pub name: String,
    pub category: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResultRequest {
    pub quiz_id: Uuid,
    pub score: i32,
}

pub async fn list_quizzes(State(state): State<AppState>) -> AppResult<Json<Vec<Quiz>>> {
    Ok(Json(state.quizzes.list_quizzes().await?))
}

pub async fn get_quiz(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<Quiz>> {
    // An id that cannot be a quiz id names no quiz
    let Ok(Path(id)) = id else {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    };

    state
        .quizzes
        .find_quiz(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))
}

/// Quiz creation endpoint; the quiz is owned by the caller
pub async fn create_quiz(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<CreateQuizRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Quiz>)> {
    let Json(payload) = payload?;
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Quiz name is required"));
    }
    if payload.category.trim().is_empty() {
        return Err(AppError::validation("Quiz category is required"));
    }

    let quiz = state
        .quizzes
        .create_quiz(NewQuiz {
            name: payload.name,
            category: payload.category,
            created_by: current.user.id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(quiz)))
}

pub async fn list_user_quizzes(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<Vec<Quiz>>> {
    Ok(Json(state.quizzes.list_quizzes_by_user(current.user.id).await?))
}

pub async fn list_user_results(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<Vec<QuizResult>>> {
    Ok(Json(state.quizzes.list_results_by_user(current.user.id).await?))
}

/// Record the caller's score on a quiz
pub async fn create_result(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<CreateResultRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<QuizResult>)> {
    let Json(payload) = payload?;
    let result = state
        .quizzes
        .create_result(NewQuizResult {
            quiz_id: payload.quiz_id,
            user_id: current.user.id,
            score: payload.score,
        })
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::NotFound("Quiz not found".to_string()),
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(result)))
}
