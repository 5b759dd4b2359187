//! Per-user row storage
//!
//! The traits below are the seam for the managed row store. `FileStore` keeps
//! every table in memory and persists them to one JSON file.

mod file;
mod models;

pub use file::FileStore;
pub use models::{
    BillingCycle, DataBlob, Profile, ProfileFields, SubscriptionRecord, SubscriptionStatus,
    UsageEntry,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::tier::PlanTier;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;
    async fn upsert_profile(&self, profile: Profile) -> Result<Profile, StoreError>;
    async fn set_plan(&self, user_id: &str, plan: PlanTier) -> Result<(), StoreError>;
}

/// Append-only action log. Rows are never updated or deleted.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    async fn append(&self, entry: UsageEntry) -> Result<(), StoreError>;
    async fn count_since(
        &self,
        user_id: &str,
        action: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, StoreError>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError>;
    async fn upsert_subscription(&self, record: SubscriptionRecord) -> Result<(), StoreError>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get_blob(&self, user_id: &str, key: &str) -> Result<Option<DataBlob>, StoreError>;
    /// Overwrites unconditionally.
    async fn put_blob(&self, user_id: &str, blob: DataBlob) -> Result<(), StoreError>;
}
