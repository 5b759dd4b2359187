use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{
    BlobStore, DataBlob, Profile, ProfileStore, StoreError, SubscriptionRecord,
    SubscriptionStore, UsageEntry, UsageLedger,
};
use crate::clock::{Clock, SystemClock};
use crate::tier::PlanTier;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StoreData {
    #[serde(default)]
    profiles: HashMap<String, Profile>,
    #[serde(default)]
    subscriptions: HashMap<String, SubscriptionRecord>,
    #[serde(default)]
    usage: Vec<UsageEntry>,
    /// user id -> key -> blob
    #[serde(default)]
    blobs: HashMap<String, HashMap<String, DataBlob>>,
}

/// Row store persisted to a single JSON file
pub struct FileStore {
    path: Option<PathBuf>,
    data: RwLock<StoreData>,
    clock: Arc<dyn Clock>,
}

impl FileStore {
    const STORE_FILE: &'static str = "bodypilot_store.json";

    /// Open (or create) the store under `data_dir`
    pub async fn open(data_dir: PathBuf, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(&data_dir).await?;
        let path = data_dir.join(Self::STORE_FILE);

        let data = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Opened row store at {:?}", path);
        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
            clock,
        })
    }

    /// Non-persistent store
    pub fn in_memory() -> Self {
        Self::in_memory_with_clock(Arc::new(SystemClock))
    }

    pub fn in_memory_with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            path: None,
            data: RwLock::new(StoreData::default()),
            clock,
        }
    }

    /// Apply `change` to a copy of the tables and swap it in only once the
    /// copy is on disk. A failed save leaves memory untouched.
    async fn commit<R>(
        &self,
        change: impl FnOnce(&mut StoreData) -> R,
    ) -> Result<R, StoreError> {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        let out = change(&mut next);
        self.save(&next).await?;
        *data = next;
        Ok(out)
    }

    async fn save(&self, data: &StoreData) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(data)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for FileStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.data.read().await.profiles.get(user_id).cloned())
    }

    async fn upsert_profile(&self, mut profile: Profile) -> Result<Profile, StoreError> {
        profile.updated_at = Some(self.clock.utc_now());
        self.commit(|data| {
            data.profiles
                .insert(profile.user_id.clone(), profile.clone());
        })
        .await?;
        Ok(profile)
    }

    async fn set_plan(&self, user_id: &str, plan: PlanTier) -> Result<(), StoreError> {
        let unchanged = {
            let data = self.data.read().await;
            data.profiles.get(user_id).is_some_and(|p| p.plan == plan)
        };
        if unchanged {
            return Ok(());
        }

        let now = self.clock.utc_now();
        self.commit(|data| {
            let profile = data
                .profiles
                .entry(user_id.to_string())
                .or_insert_with(|| Profile::new(user_id));
            profile.plan = plan;
            profile.updated_at = Some(now);
        })
        .await
    }
}

#[async_trait]
impl UsageLedger for FileStore {
    async fn append(&self, entry: UsageEntry) -> Result<(), StoreError> {
        self.commit(|data| data.usage.push(entry)).await
    }

    async fn count_since(
        &self,
        user_id: &str,
        action: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let data = self.data.read().await;
        let count = data
            .usage
            .iter()
            .filter(|e| e.user_id == user_id && e.action == action && e.created_at >= since)
            .count();
        Ok(count as u32)
    }
}

#[async_trait]
impl SubscriptionStore for FileStore {
    async fn get_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        Ok(self.data.read().await.subscriptions.get(user_id).cloned())
    }

    async fn upsert_subscription(&self, record: SubscriptionRecord) -> Result<(), StoreError> {
        self.commit(|data| {
            data.subscriptions.insert(record.user_id.clone(), record);
        })
        .await
    }
}

#[async_trait]
impl BlobStore for FileStore {
    async fn get_blob(&self, user_id: &str, key: &str) -> Result<Option<DataBlob>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .blobs
            .get(user_id)
            .and_then(|blobs| blobs.get(key))
            .cloned())
    }

    async fn put_blob(&self, user_id: &str, blob: DataBlob) -> Result<(), StoreError> {
        self.commit(|data| {
            data.blobs
                .entry(user_id.to_string())
                .or_default()
                .insert(blob.key.clone(), blob);
        })
        .await
    }
}
