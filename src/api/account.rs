//! Usage status, profile, per-user data sync and exercise lookup

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use regex::Regex;
use std::sync::{Arc, OnceLock};

use super::body::{read_bounded_json, KIB};
use super::server::AppState;
use super::types::*;
use crate::error::ApiError;
use crate::exercises::Exercise;
use crate::store::{DataBlob, Profile, ProfileFields};
use crate::tier::{self, Category, LimitStatus};

const BONUS_BODY_LIMIT: usize = KIB;
const PROFILE_BODY_LIMIT: usize = 16 * KIB;
const DATA_BODY_LIMIT: usize = 256 * KIB;

fn data_key_pattern() -> Result<&'static Regex, ApiError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    if let Some(pattern) = PATTERN.get() {
        return Ok(pattern);
    }
    let pattern = Regex::new(r"^[A-Za-z0-9_-]{1,64}$").map_err(anyhow::Error::from)?;
    Ok(PATTERN.get_or_init(|| pattern))
}

fn validate_key(key: &str) -> Result<(), ApiError> {
    if data_key_pattern()?.is_match(key) {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            "Key must be 1-64 characters of letters, digits, '_' or '-'",
        ))
    }
}

pub async fn usage_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UsageResponse>, ApiError> {
    let user = state.require_user(&headers)?;
    let plan = state.limits.plan_for(&user.id).await;

    let limits = &state.limits;

    Ok(Json(UsageResponse {
        plan,
        features: plan.limits().features,
        ai_messages: limits
            .check_with_plan(&user.id, Category::AiMessages, plan)
            .await?,
        workout_plans: limits
            .check_with_plan(&user.id, Category::WorkoutPlans, plan)
            .await?,
        meal_plans: limits
            .check_with_plan(&user.id, Category::MealPlans, plan)
            .await?,
    }))
}

pub async fn grant_bonus(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<LimitStatus>, ApiError> {
    let user = state.require_user(&headers)?;
    let request: BonusRequest = read_bounded_json(body, BONUS_BODY_LIMIT).await?;
    let status = tier::grant_bonus(&state.limits, &user.id, request.bonus_type).await?;
    Ok(Json(status))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Profile>, ApiError> {
    let user = state.require_user(&headers)?;
    let profile = match state.profiles.get_profile(&user.id).await? {
        Some(profile) => profile,
        None => Profile {
            email: user.email,
            ..Profile::new(user.id)
        },
    };
    Ok(Json(profile))
}

fn validate_profile(fields: &ProfileFields) -> Result<(), ApiError> {
    if let Some(age) = fields.age {
        if !(13..=120).contains(&age) {
            return Err(ApiError::bad_request("age must be between 13 and 120"));
        }
    }
    if fields.weight_kg.is_some_and(|w| !(20.0..=500.0).contains(&w)) {
        return Err(ApiError::bad_request("weightKg must be between 20 and 500"));
    }
    if fields.height_cm.is_some_and(|h| !(50.0..=300.0).contains(&h)) {
        return Err(ApiError::bad_request("heightCm must be between 50 and 300"));
    }
    Ok(())
}

/// Replaces the editable fields. The plan tier is kept from the stored row.
pub async fn put_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<Profile>, ApiError> {
    let user = state.require_user(&headers)?;
    let fields: ProfileFields = read_bounded_json(body, PROFILE_BODY_LIMIT).await?;
    validate_profile(&fields)?;

    let mut profile = state
        .profiles
        .get_profile(&user.id)
        .await?
        .unwrap_or_else(|| Profile::new(user.id.clone()));
    profile.fields = fields;
    if user.email.is_some() {
        profile.email = user.email;
    }

    Ok(Json(state.profiles.upsert_profile(profile).await?))
}

pub async fn get_data(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Json<DataBlob>, ApiError> {
    let user = state.require_user(&headers)?;
    validate_key(&key)?;

    state
        .blobs
        .get_blob(&user.id, &key)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No data stored under '{}'", key)))
}

/// Last write wins. The stored timestamp is always server time.
pub async fn put_data(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
    body: Body,
) -> Result<Json<DataBlob>, ApiError> {
    let user = state.require_user(&headers)?;
    validate_key(&key)?;
    let request: PutDataRequest = read_bounded_json(body, DATA_BODY_LIMIT).await?;

    let blob = DataBlob {
        key,
        value: request.value,
        updated_at: state.clock.utc_now(),
    };
    if let Some(client_at) = request.updated_at {
        tracing::debug!(
            "{} wrote '{}' (client time {}, server time {})",
            user.id,
            blob.key,
            client_at,
            blob.updated_at
        );
    }

    state.blobs.put_blob(&user.id, blob.clone()).await?;
    Ok(Json(blob))
}

pub async fn search_exercises(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExerciseQuery>,
) -> Result<Json<Vec<Exercise>>, ApiError> {
    let name = query.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    if name.len() > 100 {
        return Err(ApiError::bad_request("name is too long"));
    }

    let lookup = state
        .exercises
        .as_ref()
        .ok_or(ApiError::NotConfigured("Exercise API key"))?;
    Ok(Json(lookup.search(name).await?))
}
