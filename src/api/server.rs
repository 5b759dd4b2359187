use anyhow::Result;
use axum::{
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::{account, ai, billing};
use crate::ai::{CompletionProvider, OpenAIProvider};
use crate::auth::{SessionUser, SessionVerifier};
use crate::billing::{BillingProvider, HttpBillingClient};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::ApiError;
use crate::exercises::{ExerciseLookup, HttpExerciseSource};
use crate::store::{BlobStore, FileStore, ProfileStore, SubscriptionStore};
use crate::tier::{LimitChecker, SharedLimitChecker};

pub struct AppState {
    pub sessions: Option<SessionVerifier>,
    pub profiles: Arc<dyn ProfileStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub limits: SharedLimitChecker,
    pub completion: Option<Arc<dyn CompletionProvider>>,
    pub billing: Option<Arc<dyn BillingProvider>>,
    pub webhook_secret: Option<String>,
    pub exercises: Option<Arc<ExerciseLookup>>,
    pub clock: Arc<dyn Clock>,
    pub app_url: String,
}

impl AppState {
    /// State backed by the file store and the HTTP providers in `config`
    pub async fn from_config(config: &Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(FileStore::open(config.data_dir(), clock.clone()).await?);

        let sessions = config.jwt_secret().map(|s| SessionVerifier::new(&s));
        if sessions.is_none() {
            tracing::warn!("No JWT secret configured; every caller is anonymous");
        }

        let completion = match config.completion() {
            Some(c) => Some(Arc::new(OpenAIProvider::new(c)?) as Arc<dyn CompletionProvider>),
            None => {
                tracing::warn!("LLM API key not set; AI routes are disabled");
                None
            }
        };

        let billing = match config.billing() {
            Some(c) => Some(Arc::new(HttpBillingClient::new(c)?) as Arc<dyn BillingProvider>),
            None => {
                tracing::warn!("Billing API key not set; billing routes are disabled");
                None
            }
        };

        let exercises = match config.exercises() {
            Some(c) => {
                let source = Arc::new(HttpExerciseSource::new(c)?);
                Some(Arc::new(ExerciseLookup::new(source, clock.clone())))
            }
            None => None,
        };

        Ok(Self {
            sessions,
            profiles: store.clone(),
            subscriptions: store.clone(),
            blobs: store.clone(),
            limits: Arc::new(LimitChecker::new(store.clone(), store, clock.clone())),
            completion,
            billing,
            webhook_secret: config.webhook_secret(),
            exercises,
            clock,
            app_url: config.app_url.trim_end_matches('/').to_string(),
        })
    }

    /// Session user, or `None` for anonymous callers
    pub fn caller(&self, headers: &HeaderMap) -> Option<SessionUser> {
        self.sessions.as_ref()?.identify(headers)
    }

    pub fn require_user(&self, headers: &HeaderMap) -> Result<SessionUser, ApiError> {
        self.caller(headers).ok_or(ApiError::Unauthorized)
    }

    pub fn completion(&self) -> Result<&dyn CompletionProvider, ApiError> {
        self.completion
            .as_deref()
            .ok_or(ApiError::NotConfigured("LLM API key"))
    }

    pub fn billing(&self) -> Result<&dyn BillingProvider, ApiError> {
        self.billing
            .as_deref()
            .ok_or(ApiError::NotConfigured("Billing API key"))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/ai/chat", post(ai::chat))
        .route("/api/ai/workout-plan", post(ai::workout_plan))
        .route("/api/ai/meal-plan", post(ai::meal_plan))
        .route("/api/ai/translate", post(ai::translate))
        .route("/api/ai/meal-nutrition", post(ai::meal_nutrition))
        .route("/api/billing/checkout", post(billing::checkout))
        .route("/api/billing/cancel", post(billing::cancel))
        .route("/api/billing/sync", post(billing::sync))
        .route("/api/billing/subscription", get(billing::subscription))
        .route("/api/billing/webhook", post(billing::webhook))
        .route("/api/usage", get(account::usage_status))
        .route("/api/usage/bonus", post(account::grant_bonus))
        .route(
            "/api/profile",
            get(account::get_profile).put(account::put_profile),
        )
        .route(
            "/api/data/{key}",
            get(account::get_data).put(account::put_data),
        )
        .route("/api/exercises", get(account::search_exercises))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_http_server(config: Config) -> Result<()> {
    let state = Arc::new(AppState::from_config(&config).await?);
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check() -> &'static str {
    "ok"
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_check() {
        let harness = Harness::new();
        let response = harness
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let harness = Harness::new();
        let response = harness
            .router()
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
