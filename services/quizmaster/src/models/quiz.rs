//! Quiz and quiz result models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Quiz entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// New quiz creation payload
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub name: String,
    pub category: String,
    pub created_by: Uuid,
}

/// A user's score on one quiz
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub score: i32,
    pub completed_at: DateTime<Utc>,
}

/// New quiz result payload
#[derive(Debug, Clone)]
pub struct NewQuizResult {
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub score: i32,
}
