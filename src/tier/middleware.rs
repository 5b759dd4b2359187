//! Quota enforcement for handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::limits::{Category, PlanTier};
use super::usage::{LimitChecker, LimitStatus};
use crate::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitReachedResponse {
    pub error: String,
    pub code: TierErrorCode,
    pub limit_reached: bool,
    pub category: Category,
    pub plan: PlanTier,
    pub remaining: u32,
    pub used: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<String>,
    pub upgrade_url: String,
}

#[derive(Debug, Serialize, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TierErrorCode {
    LimitReached,
}

impl LimitReachedResponse {
    const UPGRADE_URL: &'static str = "/pricing";

    pub fn from_status(status: &LimitStatus) -> Self {
        let what = match status.category {
            Category::AiMessages => "Daily AI message",
            Category::WorkoutPlans => "Weekly workout plan",
            Category::MealPlans => "Weekly meal plan",
        };
        let error = match status.limit {
            Some(limit) => format!("{} limit reached ({}/{})", what, status.used, limit),
            None => format!("{} limit reached", what),
        };
        Self {
            error,
            code: TierErrorCode::LimitReached,
            limit_reached: true,
            category: status.category,
            plan: status.plan,
            remaining: 0,
            used: status.used,
            limit: status.limit,
            resets_at: status.resets_at.map(|t| t.to_rfc3339()),
            upgrade_url: Self::UPGRADE_URL.to_string(),
        }
    }
}

impl IntoResponse for LimitReachedResponse {
    fn into_response(self) -> Response {
        (StatusCode::TOO_MANY_REQUESTS, Json(self)).into_response()
    }
}

/// Check the caller's quota. Anonymous callers are not metered.
pub async fn enforce_limit(
    checker: &LimitChecker,
    user_id: Option<&str>,
    category: Category,
) -> Result<Option<LimitStatus>, ApiError> {
    let Some(user_id) = user_id else {
        return Ok(None);
    };

    let status = checker.check(user_id, category).await?;
    if !status.allowed {
        tracing::info!("{} hit the {:?} limit", user_id, category);
        return Err(ApiError::LimitReached(status));
    }
    Ok(Some(status))
}
