use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ai::{
    AiChatRequest, MealNutritionRequest, MealPlanRequest, TranslateRequest, WorkoutPlanRequest,
};
use crate::error::ApiError;
use crate::store::BillingCycle;
use crate::tier::{BonusType, FeatureFlags, LimitStatus, PlanTier};

fn require(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{} is required", field)));
    }
    Ok(())
}

fn day_count(value: u8, field: &str) -> Result<(), ApiError> {
    if !(1..=7).contains(&value) {
        return Err(ApiError::bad_request(format!(
            "{} must be between 1 and 7",
            field
        )));
    }
    Ok(())
}

// AI

/// Request checks run after parsing and before any provider call
pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

impl Validate for AiChatRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require(&self.message, "message")
    }
}

impl Validate for WorkoutPlanRequest {
    fn validate(&self) -> Result<(), ApiError> {
        day_count(self.days_per_week, "daysPerWeek")?;
        if let Some(minutes) = self.session_minutes {
            if !(10..=240).contains(&minutes) {
                return Err(ApiError::bad_request(
                    "sessionMinutes must be between 10 and 240",
                ));
            }
        }
        Ok(())
    }
}

impl Validate for MealPlanRequest {
    fn validate(&self) -> Result<(), ApiError> {
        day_count(self.days, "days")
    }
}

impl Validate for TranslateRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require(&self.text, "text")?;
        require(&self.target_language, "targetLanguage")
    }
}

impl Validate for MealNutritionRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require(&self.description, "description")
    }
}

// Billing

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    pub billing_cycle: BillingCycle,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

// Usage

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusRequest {
    pub bonus_type: BonusType,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub plan: PlanTier,
    pub features: FeatureFlags,
    pub ai_messages: LimitStatus,
    pub workout_plans: LimitStatus,
    pub meal_plans: LimitStatus,
}

// Data sync

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutDataRequest {
    pub value: serde_json::Value,
    /// Client clock at the time of the write. Informational only.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// Exercises

#[derive(Debug, Clone, Deserialize)]
pub struct ExerciseQuery {
    #[serde(default)]
    pub name: String,
}
