//! Read-only catalog endpoints

use axum::{Json, extract::State};

use crate::{
    error::AppResult,
    models::{Language, Status},
    state::AppState,
};

pub async fn list_statuses(State(state): State<AppState>) -> AppResult<Json<Vec<Status>>> {
    Ok(Json(state.catalog.list_statuses().await?))
}

pub async fn list_languages(State(state): State<AppState>) -> AppResult<Json<Vec<Language>>> {
    Ok(Json(state.catalog.list_languages().await?))
}
