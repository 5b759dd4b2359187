//! Plan tiers, quota table and feature flags
//!
//! Defines the per-plan quotas for metered categories and the feature gates.

use serde::{Deserialize, Serialize};

use super::window::Window;

/// User's subscription tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Pro,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
        }
    }

    pub fn limits(&self) -> &'static PlanLimits {
        match self {
            PlanTier::Free => &FREE_LIMITS,
            PlanTier::Pro => &PRO_LIMITS,
        }
    }
}

/// Base quota for one category within its window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Limited(u32),
    Unlimited,
}

impl Quota {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Quota::Unlimited)
    }
}

/// Boolean feature gates attached to a plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    pub advanced_diet: bool,
    pub calendar: bool,
    pub progress_tracking: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PlanLimits {
    /// AI chat messages per calendar day
    pub ai_messages_per_day: Quota,
    /// Workout plan creations per calendar week
    pub workout_plans_per_week: Quota,
    /// Meal plan creations per calendar week
    pub meal_plans_per_week: Quota,
    pub features: FeatureFlags,
}

impl PlanLimits {
    pub fn quota(&self, category: Category) -> Quota {
        match category {
            Category::AiMessages => self.ai_messages_per_day,
            Category::WorkoutPlans => self.workout_plans_per_week,
            Category::MealPlans => self.meal_plans_per_week,
        }
    }
}

pub static FREE_LIMITS: PlanLimits = PlanLimits {
    ai_messages_per_day: Quota::Limited(3),
    workout_plans_per_week: Quota::Limited(1),
    meal_plans_per_week: Quota::Limited(1),
    features: FeatureFlags {
        advanced_diet: false,
        calendar: false,
        progress_tracking: false,
    },
};

pub static PRO_LIMITS: PlanLimits = PlanLimits {
    ai_messages_per_day: Quota::Unlimited,
    workout_plans_per_week: Quota::Unlimited,
    meal_plans_per_week: Quota::Unlimited,
    features: FeatureFlags {
        advanced_diet: true,
        calendar: true,
        progress_tracking: true,
    },
};

/// Metered action category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    AiMessages,
    WorkoutPlans,
    MealPlans,
}

impl Category {
    #[cfg(test)]
    pub const ALL: [Category; 3] = [
        Category::AiMessages,
        Category::WorkoutPlans,
        Category::MealPlans,
    ];

    /// Ledger action recorded for each performed request
    pub fn base_action(&self) -> &'static str {
        match self {
            Category::AiMessages => "ai_chat",
            Category::WorkoutPlans => "workout_plan",
            Category::MealPlans => "meal_plan",
        }
    }

    /// Ledger action recorded for a bonus grant
    pub fn bonus_action(&self) -> &'static str {
        match self {
            Category::AiMessages => "ad_bonus_ai",
            Category::WorkoutPlans => "ad_bonus_workout",
            Category::MealPlans => "ad_bonus_meal",
        }
    }

    pub fn bonus_multiplier(&self) -> u32 {
        match self {
            Category::AiMessages => 3,
            Category::WorkoutPlans | Category::MealPlans => 1,
        }
    }

    /// Bonus rows are counted over this same window.
    pub fn window(&self) -> Window {
        match self {
            Category::AiMessages => Window::Day,
            Category::WorkoutPlans | Category::MealPlans => Window::Week,
        }
    }
}

/// Rewarded bonus kinds accepted from clients
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BonusType {
    Ai,
    Workout,
    Meal,
}

impl BonusType {
    pub fn category(&self) -> Category {
        match self {
            BonusType::Ai => Category::AiMessages,
            BonusType::Workout => Category::WorkoutPlans,
            BonusType::Meal => Category::MealPlans,
        }
    }
}
