pub mod bonus;
pub mod limits;
pub mod middleware;
pub mod usage;
pub mod window;

pub use bonus::{grant_bonus, BonusError};
pub use limits::{BonusType, Category, FeatureFlags, PlanTier};
pub use middleware::{enforce_limit, LimitReachedResponse};
pub use usage::{LimitChecker, LimitStatus, SharedLimitChecker};
