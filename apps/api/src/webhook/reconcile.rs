//! Applies verified provider events to payment and subscription rows.
//!
//! Every write is an upsert keyed by a provider id, so a redelivered event
//! converges on the same rows. Payments and subscriptions are not linked in
//! a transaction; the "payment succeeded → subscription active" rule is
//! applied here as a second upsert.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::events::{metadata_user_id, Customer, PaymentData, SubscriptionData, WebhookEvent};
use crate::models::billing::{PaymentStatus, SubscriptionStatus};
use crate::store::{BillingStore, PaymentUpsert, StoreError, SubscriptionUpsert};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied,
    /// The stored subscription has already seen a newer event.
    Stale,
    /// Nothing to do: unknown event type or no owning user.
    Ignored(&'static str),
}

pub async fn apply_event(
    store: &dyn BillingStore,
    event: &WebhookEvent,
    occurred_at: DateTime<Utc>,
) -> Result<Outcome, StoreError> {
    match event {
        WebhookEvent::PaymentSucceeded(data) => {
            apply_payment(store, data, PaymentStatus::Success, occurred_at).await
        }
        WebhookEvent::PaymentFailed(data) => {
            apply_payment(store, data, PaymentStatus::Failed, occurred_at).await
        }
        WebhookEvent::SubscriptionActive(data) | WebhookEvent::SubscriptionRenewed(data) => {
            apply_subscription(store, data, SubscriptionStatus::Active, occurred_at).await
        }
        WebhookEvent::SubscriptionCancelled(data) => {
            apply_subscription(store, data, SubscriptionStatus::Cancelled, occurred_at).await
        }
        WebhookEvent::Unknown => Ok(Outcome::Ignored("unknown event type")),
    }
}

/// metadata → known subscription → customer email. A metadata id only
/// counts if that user exists.
async fn resolve_owner(
    store: &dyn BillingStore,
    metadata: &serde_json::Map<String, serde_json::Value>,
    subscription_id: Option<&str>,
    customer: &Customer,
) -> Result<Option<Uuid>, StoreError> {
    if let Some(user_id) = metadata_user_id(metadata) {
        if store.get_user(user_id).await?.is_some() {
            return Ok(Some(user_id));
        }
    }
    if let Some(subscription_id) = subscription_id {
        if let Some(existing) = store.subscription_by_external_id(subscription_id).await? {
            return Ok(Some(existing.user_id));
        }
    }
    match customer.email.as_deref() {
        Some(email) => store.user_id_by_email(email).await,
        None => Ok(None),
    }
}

async fn apply_payment(
    store: &dyn BillingStore,
    data: &PaymentData,
    status: PaymentStatus,
    occurred_at: DateTime<Utc>,
) -> Result<Outcome, StoreError> {
    let owner = resolve_owner(
        store,
        &data.metadata,
        data.subscription_id.as_deref(),
        &data.customer,
    )
    .await?;
    let Some(user_id) = owner else {
        warn!(payment_id = %data.payment_id, "No user for payment event, ignoring");
        return Ok(Outcome::Ignored("owner not found"));
    };

    let row = store
        .upsert_payment(&PaymentUpsert {
            user_id,
            external_payment_id: data.payment_id.clone(),
            external_subscription_id: data.subscription_id.clone(),
            amount: data.total_amount,
            currency: data.currency.clone(),
            status,
        })
        .await?;
    info!(
        payment_id = %row.external_payment_id,
        %user_id,
        status = %row.status,
        "Payment recorded"
    );

    let (PaymentStatus::Success, Some(subscription_id)) = (status, &data.subscription_id) else {
        return Ok(Outcome::Applied);
    };
    let activated = store
        .upsert_subscription(&SubscriptionUpsert {
            user_id,
            external_subscription_id: subscription_id.clone(),
            plan: None,
            status: SubscriptionStatus::Active,
            start_date: None,
            end_date: None,
            last_payment_id: Some(data.payment_id.clone()),
            event_at: occurred_at,
        })
        .await?;
    if activated.is_none() {
        info!(%subscription_id, "Subscription has a newer event, payment linked only");
    }
    Ok(Outcome::Applied)
}

async fn apply_subscription(
    store: &dyn BillingStore,
    data: &SubscriptionData,
    status: SubscriptionStatus,
    occurred_at: DateTime<Utc>,
) -> Result<Outcome, StoreError> {
    let owner = resolve_owner(
        store,
        &data.metadata,
        Some(&data.subscription_id),
        &data.customer,
    )
    .await?;
    let Some(user_id) = owner else {
        warn!(subscription_id = %data.subscription_id, "No user for subscription event, ignoring");
        return Ok(Outcome::Ignored("owner not found"));
    };

    let end_date = match status {
        SubscriptionStatus::Cancelled => data.cancelled_at.or(data.next_billing_date),
        SubscriptionStatus::Active => data.next_billing_date,
    };
    let applied = store
        .upsert_subscription(&SubscriptionUpsert {
            user_id,
            external_subscription_id: data.subscription_id.clone(),
            plan: data.product_id.clone(),
            status,
            start_date: data.created_at,
            end_date,
            last_payment_id: None,
            event_at: occurred_at,
        })
        .await?;

    match applied {
        Some(row) => {
            info!(
                subscription_id = %row.external_subscription_id,
                %user_id,
                status = %row.status,
                "Subscription updated"
            );
            Ok(Outcome::Applied)
        }
        None => {
            info!(subscription_id = %data.subscription_id, "Out-of-order subscription event dropped");
            Ok(Outcome::Stale)
        }
    }
}
