//! Payment-provider webhook payloads.
//!
//! The envelope is `{type, timestamp?, data}`. The `type` string selects a
//! variant from a closed set; anything else becomes `Unknown` and is dropped
//! by the caller after logging.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentData {
    pub payment_id: String,
    #[serde(default)]
    pub subscription_id: Option<String>,
    /// Smallest currency unit.
    pub total_amount: i64,
    pub currency: String,
    #[serde(default)]
    pub customer: Customer,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubscriptionData {
    pub subscription_id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub customer: Customer,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_billing_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    PaymentSucceeded(PaymentData),
    PaymentFailed(PaymentData),
    SubscriptionActive(SubscriptionData),
    SubscriptionRenewed(SubscriptionData),
    SubscriptionCancelled(SubscriptionData),
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEvent {
    pub event_type: String,
    /// When the provider produced the event; used to order subscription
    /// updates.
    pub occurred_at: DateTime<Utc>,
    pub event: WebhookEvent,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    data: Value,
}

/// Parses a verified body. `signed_at` stands in for a missing envelope
/// timestamp.
pub fn parse_event(body: &[u8], signed_at: DateTime<Utc>) -> Result<ParsedEvent, serde_json::Error> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    let data = envelope.data;
    let event = match envelope.event_type.as_str() {
        "payment.succeeded" => WebhookEvent::PaymentSucceeded(serde_json::from_value(data)?),
        "payment.failed" => WebhookEvent::PaymentFailed(serde_json::from_value(data)?),
        "subscription.active" | "subscription.created" => {
            WebhookEvent::SubscriptionActive(serde_json::from_value(data)?)
        }
        "subscription.renewed" => WebhookEvent::SubscriptionRenewed(serde_json::from_value(data)?),
        "subscription.cancelled" | "subscription.deleted" | "subscription.expired" => {
            WebhookEvent::SubscriptionCancelled(serde_json::from_value(data)?)
        }
        _ => WebhookEvent::Unknown,
    };
    Ok(ParsedEvent {
        occurred_at: envelope.timestamp.unwrap_or(signed_at),
        event_type: envelope.event_type,
        event,
    })
}

/// The user id our checkout placed in the provider metadata, if present.
pub fn metadata_user_id(metadata: &Map<String, Value>) -> Option<Uuid> {
    metadata
        .get("user_id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}
