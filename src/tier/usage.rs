//! Limit checking against the usage ledger
//!
//! Quotas are counted per calendar window: `effective = base + bonus * multiplier`,
//! `remaining = max(0, effective - used)`.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::limits::{Category, PlanTier, Quota};
use crate::clock::Clock;
use crate::store::{ProfileStore, StoreError, UsageEntry, UsageLedger};

/// Result of a limit check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LimitStatus {
    pub allowed: bool,
    /// `None` when the plan is unlimited for this category
    pub remaining: Option<u32>,
    pub plan: PlanTier,
    pub category: Category,
    pub used: u32,
    /// Effective limit including bonus grants, `None` when unlimited
    pub limit: Option<u32>,
    pub resets_at: Option<DateTime<Utc>>,
}

pub struct LimitChecker {
    profiles: Arc<dyn ProfileStore>,
    ledger: Arc<dyn UsageLedger>,
    clock: Arc<dyn Clock>,
}

impl LimitChecker {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        ledger: Arc<dyn UsageLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            profiles,
            ledger,
            clock,
        }
    }

    /// Plan tier for a user. Lookup failures fall back to `free`.
    pub async fn plan_for(&self, user_id: &str) -> PlanTier {
        match self.profiles.get_profile(user_id).await {
            Ok(Some(profile)) => profile.plan,
            Ok(None) => PlanTier::Free,
            Err(e) => {
                tracing::warn!("Plan lookup failed for {}, assuming free: {}", user_id, e);
                PlanTier::Free
            }
        }
    }

    pub async fn check(&self, user_id: &str, category: Category) -> Result<LimitStatus, StoreError> {
        match category {
            Category::AiMessages => self.check_daily_ai_limit(user_id).await,
            Category::WorkoutPlans => self.check_weekly_workout_limit(user_id).await,
            Category::MealPlans => self.check_weekly_meal_limit(user_id).await,
        }
    }

    pub async fn check_with_plan(
        &self,
        user_id: &str,
        category: Category,
        plan: PlanTier,
    ) -> Result<LimitStatus, StoreError> {
        let base = match plan.limits().quota(category) {
            Quota::Unlimited => {
                return Ok(LimitStatus {
                    allowed: true,
                    remaining: None,
                    plan,
                    category,
                    used: 0,
                    limit: None,
                    resets_at: None,
                })
            }
            Quota::Limited(n) => n,
        };

        let now = self.clock.utc_now().with_timezone(&Local);
        let window = category.window();
        let since = window.start(&now).with_timezone(&Utc);

        let used = self
            .ledger
            .count_since(user_id, category.base_action(), since)
            .await?;
        let bonuses = self
            .ledger
            .count_since(user_id, category.bonus_action(), since)
            .await?;

        let effective = base.saturating_add(bonuses.saturating_mul(category.bonus_multiplier()));
        let remaining = effective.saturating_sub(used);

        Ok(LimitStatus {
            allowed: remaining > 0,
            remaining: Some(remaining),
            plan,
            category,
            used,
            limit: Some(effective),
            resets_at: Some(window.next_start(&now).with_timezone(&Utc)),
        })
    }

    pub async fn check_daily_ai_limit(&self, user_id: &str) -> Result<LimitStatus, StoreError> {
        let plan = self.plan_for(user_id).await;
        self.check_with_plan(user_id, Category::AiMessages, plan).await
    }

    pub async fn check_weekly_workout_limit(
        &self,
        user_id: &str,
    ) -> Result<LimitStatus, StoreError> {
        let plan = self.plan_for(user_id).await;
        self.check_with_plan(user_id, Category::WorkoutPlans, plan)
            .await
    }

    pub async fn check_weekly_meal_limit(&self, user_id: &str) -> Result<LimitStatus, StoreError> {
        let plan = self.plan_for(user_id).await;
        self.check_with_plan(user_id, Category::MealPlans, plan).await
    }

    /// Append a ledger row stamped with the current time
    pub async fn record(&self, user_id: &str, action: &str) -> Result<(), StoreError> {
        self.ledger
            .append(UsageEntry {
                user_id: user_id.to_string(),
                action: action.to_string(),
                created_at: self.clock.utc_now(),
            })
            .await
    }

    pub async fn record_usage(&self, user_id: &str, category: Category) -> Result<(), StoreError> {
        self.record(user_id, category.base_action()).await
    }
}

/// Shared limit checker type
pub type SharedLimitChecker = Arc<LimitChecker>;
