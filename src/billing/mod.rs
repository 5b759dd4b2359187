//! Subscription billing through the payment provider
//!
//! The provider is the source of truth. Local subscription rows are a
//! best-effort mirror refreshed whenever provider state is observed.

pub mod client;
pub mod webhook;

pub use client::{
    BillingConfig, BillingProvider, CheckoutRequest, CheckoutSession, HttpBillingClient,
    ProviderSubscription,
};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::store::{ProfileStore, StoreError, SubscriptionRecord, SubscriptionStore};

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("No subscription found")]
    NoSubscription,
    #[error("Webhook signature verification failed")]
    InvalidSignature,
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Failed to call billing API: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Billing API error: {status} - {body}")]
    Provider { status: u16, body: String },
}

/// Mirror a provider subscription locally and update the user's plan tier
pub async fn reconcile(
    profiles: &dyn ProfileStore,
    subscriptions: &dyn SubscriptionStore,
    user_id: &str,
    remote: &ProviderSubscription,
    now: DateTime<Utc>,
) -> Result<SubscriptionRecord, BillingError> {
    let record = remote.to_record(user_id, now);
    subscriptions.upsert_subscription(record.clone()).await?;

    let plan = record.plan(now);
    profiles.set_plan(user_id, plan).await?;

    tracing::info!(
        "Reconciled subscription {} for {}: status={:?} plan={}",
        record.provider_subscription_id,
        user_id,
        record.status,
        plan.as_str()
    );
    Ok(record)
}
