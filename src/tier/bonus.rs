//! One-shot bonus grants (rewarded ad views)

use thiserror::Error;

use super::limits::BonusType;
use super::usage::{LimitChecker, LimitStatus};
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum BonusError {
    #[error("Your plan already includes unlimited usage")]
    AlreadyUnlimited,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Record a bonus grant and return the refreshed status.
///
/// No per-window cap is enforced here; callers gate how often this runs.
pub async fn grant_bonus(
    checker: &LimitChecker,
    user_id: &str,
    bonus: BonusType,
) -> Result<LimitStatus, BonusError> {
    let category = bonus.category();
    let plan = checker.plan_for(user_id).await;
    if plan.limits().quota(category).is_unlimited() {
        return Err(BonusError::AlreadyUnlimited);
    }

    checker.record(user_id, category.bonus_action()).await?;
    tracing::info!("Granted {:?} bonus to {}", bonus, user_id);

    Ok(checker.check_with_plan(user_id, category, plan).await?)
}
