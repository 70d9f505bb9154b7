//! Checkout creation, subscription lookup and upload quotas.

pub mod checkout;
pub mod handlers;
pub mod quota;

pub use checkout::{DodoClient, PaymentError, PaymentProvider};
pub use quota::resume_quota;
