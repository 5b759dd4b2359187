use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::BillingError;
use crate::store::{BillingCycle, SubscriptionRecord, SubscriptionStatus};

/// Subscription object as returned by the provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderSubscription {
    pub id: String,
    pub status: String,
    /// `month` or `year`
    #[serde(default)]
    pub interval: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    /// Our user id, attached when the checkout session was created
    #[serde(default)]
    pub client_reference_id: Option<String>,
}

impl ProviderSubscription {
    pub fn to_record(&self, user_id: &str, now: DateTime<Utc>) -> SubscriptionRecord {
        SubscriptionRecord {
            user_id: user_id.to_string(),
            provider_subscription_id: self.id.clone(),
            status: SubscriptionStatus::parse(&self.status),
            billing_cycle: match self.interval.as_deref() {
                Some("month") | Some("monthly") => Some(BillingCycle::Monthly),
                Some("year") | Some("yearly") => Some(BillingCycle::Yearly),
                _ => None,
            },
            current_period_start: self.current_period_start.and_then(from_unix),
            current_period_end: self.current_period_end.and_then(from_unix),
            cancel_at_period_end: self.cancel_at_period_end,
            amount: self.amount,
            currency: self.currency.to_lowercase(),
            updated_at: now,
        }
    }
}

fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub email: Option<String>,
    pub cycle: BillingCycle,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    #[serde(alias = "id")]
    pub session_id: String,
    pub url: String,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    async fn create_checkout(&self, request: CheckoutRequest)
        -> Result<CheckoutSession, BillingError>;
    /// Newest subscription created for this user, if any
    async fn find_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<ProviderSubscription>, BillingError>;
    /// Cancel at period end
    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, BillingError>;
}

#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub api_key: String,
    pub base_url: String,
    pub price_monthly: Option<String>,
    pub price_yearly: Option<String>,
    pub timeout: Duration,
}

/// REST client for the payment provider
pub struct HttpBillingClient {
    client: Client,
    config: BillingConfig,
}

#[derive(Serialize)]
struct CreateCheckoutBody<'a> {
    mode: &'static str,
    price_id: &'a str,
    client_reference_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_email: Option<&'a str>,
    success_url: &'a str,
    cancel_url: &'a str,
}

#[derive(Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Serialize)]
struct CancelBody {
    at_period_end: bool,
}

impl HttpBillingClient {
    pub fn new(config: BillingConfig) -> Result<Self, BillingError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn price_for(&self, cycle: BillingCycle) -> Result<&str, BillingError> {
        match cycle {
            BillingCycle::Monthly => self
                .config
                .price_monthly
                .as_deref()
                .ok_or(BillingError::NotConfigured("Monthly price id")),
            BillingCycle::Yearly => self
                .config
                .price_yearly
                .as_deref()
                .ok_or(BillingError::NotConfigured("Yearly price id")),
        }
    }

    async fn parse<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, BillingError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BillingError::Provider { status, body });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl BillingProvider for HttpBillingClient {
    async fn create_checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, BillingError> {
        let body = CreateCheckoutBody {
            mode: "subscription",
            price_id: self.price_for(request.cycle)?,
            client_reference_id: &request.user_id,
            customer_email: request.email.as_deref(),
            success_url: &request.success_url,
            cancel_url: &request.cancel_url,
        };

        let response = self
            .client
            .post(self.url("/checkout/sessions"))
            .bearer_auth(&self.config.api_key)
            .header("Idempotency-Key", uuid::Uuid::new_v4().to_string())
            .json(&body)
            .send()
            .await?;

        Self::parse(response).await
    }

    async fn find_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<ProviderSubscription>, BillingError> {
        let response = self
            .client
            .get(self.url("/subscriptions"))
            .bearer_auth(&self.config.api_key)
            .query(&[("client_reference_id", user_id), ("limit", "1")])
            .send()
            .await?;

        let list: ListResponse<ProviderSubscription> = Self::parse(response).await?;
        Ok(list.data.into_iter().next())
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, BillingError> {
        let path = format!(
            "/subscriptions/{}/cancel",
            urlencoding::encode(subscription_id)
        );
        let response = self
            .client
            .post(self.url(&path))
            .bearer_auth(&self.config.api_key)
            .json(&CancelBody {
                at_period_end: true,
            })
            .send()
            .await?;

        Self::parse(response).await
    }
}
