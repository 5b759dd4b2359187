//! Exercise catalog lookup with an in-process cache

mod cache;

use cache::ExpiringCache;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::clock::Clock;

const CACHE_TTL_MINUTES: i64 = 60;
const CACHE_CAPACITY: usize = 256;
const SEARCH_LIMIT: u32 = 10;

#[derive(Error, Debug)]
pub enum ExerciseError {
    #[error("Failed to call exercise API: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Exercise API error: {status} - {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub body_part: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub equipment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gif_url: Option<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
}

#[async_trait]
pub trait ExerciseSource: Send + Sync {
    async fn search(&self, name: &str) -> Result<Vec<Exercise>, ExerciseError>;
}

#[derive(Debug, Clone)]
pub struct ExerciseConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// ExerciseDB-compatible catalog client
pub struct HttpExerciseSource {
    client: Client,
    config: ExerciseConfig,
}

impl HttpExerciseSource {
    pub fn new(config: ExerciseConfig) -> Result<Self, ExerciseError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn host(&self) -> &str {
        let base = self.config.base_url.as_str();
        let without_scheme = base.split_once("://").map(|(_, rest)| rest).unwrap_or(base);
        without_scheme.split('/').next().unwrap_or(without_scheme)
    }
}

#[async_trait]
impl ExerciseSource for HttpExerciseSource {
    async fn search(&self, name: &str) -> Result<Vec<Exercise>, ExerciseError> {
        let url = format!(
            "{}/exercises/name/{}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(name)
        );

        let response = self
            .client
            .get(url)
            .header("X-RapidAPI-Key", &self.config.api_key)
            .header("X-RapidAPI-Host", self.host())
            .query(&[("limit", SEARCH_LIMIT)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ExerciseError::Api { status, body });
        }

        Ok(response.json().await?)
    }
}

/// Cached search in front of an [`ExerciseSource`]
pub struct ExerciseLookup {
    source: Arc<dyn ExerciseSource>,
    cache: Mutex<ExpiringCache<String, Vec<Exercise>>>,
}

impl ExerciseLookup {
    pub fn new(source: Arc<dyn ExerciseSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            cache: Mutex::new(ExpiringCache::new(
                chrono::Duration::minutes(CACHE_TTL_MINUTES),
                CACHE_CAPACITY,
                clock,
            )),
        }
    }

    pub async fn search(&self, name: &str) -> Result<Vec<Exercise>, ExerciseError> {
        let key = name.trim().to_lowercase();

        if let Some(hit) = self.cache.lock().await.get(&key) {
            tracing::debug!("Exercise cache hit for '{}'", key);
            return Ok(hit);
        }

        let results = self.source.search(&key).await?;
        self.cache.lock().await.insert(key, results.clone());
        Ok(results)
    }
}
