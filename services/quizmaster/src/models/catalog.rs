//! Service status and language statistics shown on the dashboard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Status of one backing service
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStatus {
    pub name: String,
    pub description: String,
    pub color: String,
}

/// Share of quizzes per programming language
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub id: Uuid,
    pub name: String,
    pub count: i32,
    pub percentage: i32,
}

#[derive(Debug, Clone)]
pub struct NewLanguage {
    pub name: String,
    pub count: i32,
    pub percentage: i32,
}

/// Statuses a fresh store starts with
pub fn seed_statuses() -> Vec<NewStatus> {
    [
        ("API Service", "Operating normally", "#10B981"),
        ("Database Service", "Degraded performance", "#F59E0B"),
        ("Authentication Service", "Operating normally", "#10B981"),
        ("File Storage", "Service disruption", "#EF4444"),
    ]
    .into_iter()
    .map(|(name, description, color)| NewStatus {
        name: name.to_string(),
        description: description.to_string(),
        color: color.to_string(),
    })
    .collect()
}

/// Languages a fresh store starts with
pub fn seed_languages() -> Vec<NewLanguage> {
    [
        ("JavaScript", 45),
        ("Python", 30),
        ("Java", 20),
        ("C#", 15),
        ("PHP", 10),
        ("Ruby", 5),
    ]
    .into_iter()
    .map(|(name, count)| NewLanguage {
        name: name.to_string(),
        count,
        percentage: count,
    })
    .collect()
}
