use axum::{body::Body, extract::State, http::HeaderMap, Json};
use std::sync::Arc;

use super::body::{read_bounded_json, KIB};
use super::server::AppState;
use super::types::Validate;
use crate::ai::{
    self, AiChatRequest, AiTextResponse, MealNutritionRequest, MealPlanRequest, TranslateRequest,
    WorkoutPlanRequest,
};
use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::store::ProfileFields;
use crate::tier::{enforce_limit, Category};

const CHAT_BODY_LIMIT: usize = 16 * KIB;
const PLAN_BODY_LIMIT: usize = 8 * KIB;
const TRANSLATE_BODY_LIMIT: usize = 32 * KIB;
const NUTRITION_BODY_LIMIT: usize = 4 * KIB;

/// Profile fields for prompt assembly. A failed lookup degrades to an
/// empty profile.
async fn profile_fields(
    state: &AppState,
    user: Option<&SessionUser>,
    supplied: Option<&ProfileFields>,
) -> ProfileFields {
    if let Some(fields) = supplied {
        return fields.clone();
    }
    let Some(user) = user else {
        return ProfileFields::default();
    };
    match state.profiles.get_profile(&user.id).await {
        Ok(profile) => profile.map(|p| p.fields).unwrap_or_default(),
        Err(e) => {
            tracing::warn!("Profile lookup failed for {}: {}", user.id, e);
            ProfileFields::default()
        }
    }
}

/// Record the performed action without holding up the response
fn record_in_background(state: &AppState, user: Option<SessionUser>, category: Category) {
    let Some(user) = user else {
        return;
    };
    let limits = state.limits.clone();
    tokio::spawn(async move {
        if let Err(e) = limits.record_usage(&user.id, category).await {
            tracing::error!(
                "Failed to record {} for {}: {}",
                category.base_action(),
                user.id,
                e
            );
        }
    });
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<AiTextResponse>, ApiError> {
    let request: AiChatRequest = read_bounded_json(body, CHAT_BODY_LIMIT).await?;
    request.validate()?;

    let provider = state.completion()?;
    let user = state.caller(&headers);
    enforce_limit(
        &state.limits,
        user.as_ref().map(|u| u.id.as_str()),
        Category::AiMessages,
    )
    .await?;

    let profile = profile_fields(&state, user.as_ref(), None).await;
    let response = ai::chat(provider, &profile, &request).await?;

    record_in_background(&state, user, Category::AiMessages);
    Ok(Json(response))
}

pub async fn workout_plan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<AiTextResponse>, ApiError> {
    let request: WorkoutPlanRequest = read_bounded_json(body, PLAN_BODY_LIMIT).await?;
    request.validate()?;

    let provider = state.completion()?;
    let user = state.caller(&headers);
    enforce_limit(
        &state.limits,
        user.as_ref().map(|u| u.id.as_str()),
        Category::WorkoutPlans,
    )
    .await?;

    let profile = profile_fields(&state, user.as_ref(), request.profile.as_ref()).await;
    let response = ai::workout_plan(provider, &profile, &request).await?;

    record_in_background(&state, user, Category::WorkoutPlans);
    Ok(Json(response))
}

pub async fn meal_plan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<AiTextResponse>, ApiError> {
    let request: MealPlanRequest = read_bounded_json(body, PLAN_BODY_LIMIT).await?;
    request.validate()?;

    let provider = state.completion()?;
    let user = state.caller(&headers);
    enforce_limit(
        &state.limits,
        user.as_ref().map(|u| u.id.as_str()),
        Category::MealPlans,
    )
    .await?;

    let profile = profile_fields(&state, user.as_ref(), request.profile.as_ref()).await;
    let response = ai::meal_plan(provider, &profile, &request).await?;

    record_in_background(&state, user, Category::MealPlans);
    Ok(Json(response))
}

/// Unmetered
pub async fn translate(
    State(state): State<Arc<AppState>>,
    body: Body,
) -> Result<Json<AiTextResponse>, ApiError> {
    let request: TranslateRequest = read_bounded_json(body, TRANSLATE_BODY_LIMIT).await?;
    request.validate()?;

    let provider = state.completion()?;
    Ok(Json(ai::translate(provider, &request).await?))
}

/// Counts against the daily AI message quota
pub async fn meal_nutrition(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<AiTextResponse>, ApiError> {
    let request: MealNutritionRequest = read_bounded_json(body, NUTRITION_BODY_LIMIT).await?;
    request.validate()?;

    let provider = state.completion()?;
    let user = state.caller(&headers);
    enforce_limit(
        &state.limits,
        user.as_ref().map(|u| u.id.as_str()),
        Category::AiMessages,
    )
    .await?;

    let response = ai::meal_nutrition(provider, &request).await?;

    record_in_background(&state, user, Category::AiMessages);
    Ok(Json(response))
}
