//! Payment provider webhooks: verify, parse, reconcile.

pub mod events;
pub mod handlers;
pub mod reconcile;
pub mod signature;

pub use signature::WebhookVerifier;
