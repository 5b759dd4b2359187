use serde::{Deserialize, Serialize};

use super::ChatMessage;
use crate::store::ProfileFields;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlanRequest {
    pub days_per_week: u8,
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub session_minutes: Option<u32>,
    /// Overrides the stored profile, used before onboarding is saved
    #[serde(default)]
    pub profile: Option<ProfileFields>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanRequest {
    pub days: u8,
    #[serde(default)]
    pub calories_target: Option<u32>,
    #[serde(default)]
    pub preferences: Option<String>,
    #[serde(default)]
    pub profile: Option<ProfileFields>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: String,
    pub target_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealNutritionRequest {
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiTextResponse {
    pub text: String,
}
