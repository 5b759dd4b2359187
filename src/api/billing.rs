use axum::{body::Body, extract::State, http::HeaderMap, Json};
use serde::Serialize;
use std::sync::Arc;

use super::body::{read_bounded, read_bounded_json, KIB};
use super::server::AppState;
use super::types::CheckoutBody;
use crate::billing::{self, webhook, BillingError, CheckoutRequest, CheckoutSession};
use crate::error::ApiError;
use crate::store::SubscriptionRecord;
use crate::tier::PlanTier;

const CHECKOUT_BODY_LIMIT: usize = 4 * KIB;
const WEBHOOK_BODY_LIMIT: usize = 256 * KIB;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub plan: PlanTier,
    pub subscription: Option<SubscriptionRecord>,
}

/// Redirect target supplied by the client, or the app default
fn redirect_url(supplied: Option<&str>, default: String, field: &str) -> Result<String, ApiError> {
    let Some(raw) = supplied.map(str::trim).filter(|u| !u.is_empty()) else {
        return Ok(default);
    };
    match url::Url::parse(raw) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(parsed.to_string()),
        _ => Err(ApiError::bad_request(format!("{} must be an http(s) URL", field))),
    }
}

pub async fn checkout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<CheckoutSession>, ApiError> {
    let user = state.require_user(&headers)?;
    let request: CheckoutBody = read_bounded_json(body, CHECKOUT_BODY_LIMIT).await?;
    let provider = state.billing()?;

    let success_url = redirect_url(
        request.success_url.as_deref(),
        format!("{}/billing/success", state.app_url),
        "successUrl",
    )?;
    let cancel_url = redirect_url(
        request.cancel_url.as_deref(),
        format!("{}/pricing", state.app_url),
        "cancelUrl",
    )?;

    let session = provider
        .create_checkout(CheckoutRequest {
            user_id: user.id.clone(),
            email: user.email.clone(),
            cycle: request.billing_cycle,
            success_url,
            cancel_url,
        })
        .await?;

    tracing::info!(
        "Created {:?} checkout session {} for {}",
        request.billing_cycle,
        session.session_id,
        user.id
    );
    Ok(Json(session))
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SubscriptionRecord>, ApiError> {
    let user = state.require_user(&headers)?;
    let provider = state.billing()?;

    let subscription_id = match state.subscriptions.get_subscription(&user.id).await? {
        Some(local) => local.provider_subscription_id,
        None => {
            provider
                .find_subscription(&user.id)
                .await?
                .ok_or(BillingError::NoSubscription)?
                .id
        }
    };

    let remote = provider.cancel_subscription(&subscription_id).await?;
    let record = billing::reconcile(
        state.profiles.as_ref(),
        state.subscriptions.as_ref(),
        &user.id,
        &remote,
        state.clock.utc_now(),
    )
    .await?;

    tracing::info!("Canceled subscription {} for {}", subscription_id, user.id);
    Ok(Json(record))
}

pub async fn sync(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SyncResponse>, ApiError> {
    let user = state.require_user(&headers)?;
    let provider = state.billing()?;

    let Some(remote) = provider.find_subscription(&user.id).await? else {
        state.profiles.set_plan(&user.id, PlanTier::Free).await?;
        tracing::info!("No provider subscription for {}, plan set to free", user.id);
        return Ok(Json(SyncResponse {
            plan: PlanTier::Free,
            subscription: None,
        }));
    };

    let now = state.clock.utc_now();
    let record = billing::reconcile(
        state.profiles.as_ref(),
        state.subscriptions.as_ref(),
        &user.id,
        &remote,
        now,
    )
    .await?;

    Ok(Json(SyncResponse {
        plan: record.plan(now),
        subscription: Some(record),
    }))
}

pub async fn subscription(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Option<SubscriptionRecord>>, ApiError> {
    let user = state.require_user(&headers)?;
    Ok(Json(state.subscriptions.get_subscription(&user.id).await?))
}

pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<serde_json::Value>, ApiError> {
    let secret = state
        .webhook_secret
        .as_deref()
        .ok_or(ApiError::NotConfigured("Billing webhook secret"))?;
    let body = read_bounded(body, WEBHOOK_BODY_LIMIT).await?;

    let signature = headers
        .get(webhook::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("Missing signature header"))?;

    let now = state.clock.utc_now();
    webhook::verify_signature(&body, signature, secret, now)?;
    let event = webhook::parse_event(&body)?;

    match event.subscription()? {
        Some(remote) => match remote.client_reference_id.as_deref() {
            Some(user_id) => {
                billing::reconcile(
                    state.profiles.as_ref(),
                    state.subscriptions.as_ref(),
                    user_id,
                    &remote,
                    now,
                )
                .await?;
            }
            None => {
                tracing::warn!(
                    "Ignoring {} for {}: no client reference id",
                    event.event_type,
                    remote.id
                );
            }
        },
        None => tracing::debug!("Ignoring webhook event {}", event.event_type),
    }

    Ok(Json(serde_json::json!({ "received": true })))
}

#[cfg(test)]
mod tests {
    use super::super::server::testing::*;
    use crate::billing::{
        BillingError, BillingProvider, CheckoutRequest, CheckoutSession, ProviderSubscription,
    };
    use crate::clock::Clock;
    use crate::store::{ProfileStore, SubscriptionStore};
    use crate::tier::PlanTier;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::Duration;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    #[derive(Default)]
    struct StubBilling {
        subscription: Mutex<Option<ProviderSubscription>>,
        last_checkout: Mutex<Option<CheckoutRequest>>,
        canceled: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BillingProvider for StubBilling {
        async fn create_checkout(
            &self,
            request: CheckoutRequest,
        ) -> Result<CheckoutSession, BillingError> {
            *self.last_checkout.lock().unwrap() = Some(request);
            Ok(CheckoutSession {
                session_id: "cs_test".to_string(),
                url: "https://pay.test/cs_test".to_string(),
            })
        }

        async fn find_subscription(
            &self,
            _user_id: &str,
        ) -> Result<Option<ProviderSubscription>, BillingError> {
            Ok(self.subscription.lock().unwrap().clone())
        }

        async fn cancel_subscription(
            &self,
            subscription_id: &str,
        ) -> Result<ProviderSubscription, BillingError> {
            self.canceled.lock().unwrap().push(subscription_id.to_string());
            let mut guard = self.subscription.lock().unwrap();
            let sub = guard.as_mut().ok_or(BillingError::NoSubscription)?;
            sub.cancel_at_period_end = true;
            Ok(sub.clone())
        }
    }

    fn remote(status: &str, period_end: chrono::DateTime<chrono::Utc>) -> ProviderSubscription {
        ProviderSubscription {
            id: "sub_42".to_string(),
            status: status.to_string(),
            interval: Some("month".to_string()),
            current_period_start: Some((period_end - Duration::days(30)).timestamp()),
            current_period_end: Some(period_end.timestamp()),
            cancel_at_period_end: false,
            amount: 999,
            currency: "usd".to_string(),
            client_reference_id: Some("u1".to_string()),
        }
    }

    fn harness() -> (Harness, Arc<StubBilling>) {
        let billing = Arc::new(StubBilling::default());
        let harness = Harness::with_billing(Some(billing.clone()));
        (harness, billing)
    }

    fn request(method: &str, uri: &str, user: Option<&str>, body: Body) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, bearer(user));
        }
        builder.body(body).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_checkout_requires_session() {
        let (harness, _) = harness();
        let response = harness
            .router()
            .oneshot(request(
                "POST",
                "/api/billing/checkout",
                None,
                Body::from(json!({"billingCycle": "monthly"}).to_string()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_checkout_uses_default_redirects() {
        let (harness, billing) = harness();
        let response = harness
            .router()
            .oneshot(request(
                "POST",
                "/api/billing/checkout",
                Some("u1"),
                Body::from(json!({"billingCycle": "yearly"}).to_string()),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["sessionId"], "cs_test");
        assert_eq!(body["url"], "https://pay.test/cs_test");

        let sent = billing.last_checkout.lock().unwrap().clone().unwrap();
        assert_eq!(sent.user_id, "u1");
        assert_eq!(sent.success_url, "https://app.bodypilot.test/billing/success");
        assert_eq!(sent.cancel_url, "https://app.bodypilot.test/pricing");
    }

    #[tokio::test]
    async fn test_checkout_rejects_bad_redirect() {
        let (harness, _) = harness();
        let response = harness
            .router()
            .oneshot(request(
                "POST",
                "/api/billing/checkout",
                Some("u1"),
                Body::from(
                    json!({"billingCycle": "monthly", "successUrl": "javascript:alert(1)"})
                        .to_string(),
                ),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_billing_not_configured_is_500() {
        let harness = Harness::new();
        let response = harness
            .router()
            .oneshot(request("POST", "/api/billing/sync", Some("u1"), Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_sync_active_subscription_upgrades() {
        let (harness, billing) = harness();
        let period_end = harness.clock.utc_now() + Duration::days(20);
        *billing.subscription.lock().unwrap() = Some(remote("active", period_end));

        let response = harness
            .router()
            .oneshot(request("POST", "/api/billing/sync", Some("u1"), Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["plan"], "pro");
        assert_eq!(body["subscription"]["status"], "active");

        let profile = harness.store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.plan, PlanTier::Pro);
    }

    #[tokio::test]
    async fn test_sync_without_subscription_downgrades() {
        let (harness, _) = harness();
        harness.store.set_plan("u1", PlanTier::Pro).await.unwrap();

        let response = harness
            .router()
            .oneshot(request("POST", "/api/billing/sync", Some("u1"), Body::empty()))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["plan"], "free");
        assert!(body["subscription"].is_null());
    }

    #[tokio::test]
    async fn test_cancel_keeps_access_until_period_end() {
        let (harness, billing) = harness();
        let period_end = harness.clock.utc_now() + Duration::days(10);
        *billing.subscription.lock().unwrap() = Some(remote("active", period_end));

        let response = harness
            .router()
            .oneshot(request("POST", "/api/billing/cancel", Some("u1"), Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["cancelAtPeriodEnd"], true);
        assert_eq!(*billing.canceled.lock().unwrap(), vec!["sub_42".to_string()]);

        let profile = harness.store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.plan, PlanTier::Pro);
    }

    #[tokio::test]
    async fn test_cancel_without_subscription_is_404() {
        let (harness, _) = harness();
        let response = harness
            .router()
            .oneshot(request("POST", "/api/billing/cancel", Some("u1"), Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_subscription_returns_local_row_or_null() {
        let (harness, _) = harness();
        let response = harness
            .router()
            .oneshot(request(
                "GET",
                "/api/billing/subscription",
                Some("u1"),
                Body::empty(),
            ))
            .await
            .unwrap();
        assert!(json_body(response).await.is_null());

        let now = harness.clock.utc_now();
        let record = remote("active", now + Duration::days(5)).to_record("u1", now);
        harness.store.upsert_subscription(record).await.unwrap();

        let response = harness
            .router()
            .oneshot(request(
                "GET",
                "/api/billing/subscription",
                Some("u1"),
                Body::empty(),
            ))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["providerSubscriptionId"], "sub_42");
    }

    #[tokio::test]
    async fn test_webhook_reconciles_signed_event() {
        let (harness, _) = harness();
        let now = harness.clock.utc_now();
        let payload = json!({
            "type": "customer.subscription.deleted",
            "data": { "object": remote("canceled", now - Duration::days(1)) }
        })
        .to_string();
        harness.store.set_plan("u1", PlanTier::Pro).await.unwrap();

        let signature =
            crate::billing::webhook::signature_header_for(payload.as_bytes(), "whsec_router", now);
        let response = harness
            .router()
            .oneshot(
                Request::post("/api/billing/webhook")
                    .header("billing-signature", signature)
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let profile = harness.store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.plan, PlanTier::Free);
        assert!(harness.store.get_subscription("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_webhook_rejects_bad_signature() {
        let (harness, _) = harness();
        let response = harness
            .router()
            .oneshot(
                Request::post("/api/billing/webhook")
                    .header("billing-signature", "t=1,v1=deadbeef")
                    .body(Body::from(r#"{"type":"invoice.paid","data":{"object":{}}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_rejects_out_of_range_timestamp() {
        let (harness, _) = harness();
        let response = harness
            .router()
            .oneshot(
                Request::post("/api/billing/webhook")
                    .header("billing-signature", "t=-9223372036854775808,v1=00")
                    .body(Body::from(r#"{"type":"invoice.paid","data":{"object":{}}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
