//! Persistence seams.
//!
//! Handlers and workers only see these traits; `PgStore` is the production
//! implementation. Each trait covers one caller: the front door
//! (`SubmissionStore`), the worker (`JobStore`), the webhook receiver
//! (`BillingStore`) and the admin dashboard (`AdminStore`).

pub mod postgres;

#[cfg(test)]
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::activity::{ActivityAction, ActivityRow};
use crate::models::billing::{PaymentRow, PaymentStatus, SubscriptionRow, SubscriptionStatus};
use crate::models::interview::{InterviewRow, TranscriptTurn};
use crate::models::resume::ResumeRow;
use crate::models::user::User;

pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub struct NewResume {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub public_id: String,
}

pub struct NewInterview {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub interview_type: String,
    pub tech_stack: Vec<String>,
    pub transcript: Vec<TranscriptTurn>,
}

pub struct NewActivity {
    pub user_id: Uuid,
    pub action: ActivityAction,
    pub entity_id: Option<Uuid>,
    pub metadata: Value,
}

/// A status column driven by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusField {
    ResumeAnalysis,
    ResumeIndexing,
    InterviewFeedback,
}

impl StatusField {
    pub(crate) fn table(&self) -> &'static str {
        match self {
            StatusField::ResumeAnalysis | StatusField::ResumeIndexing => "resumes",
            StatusField::InterviewFeedback => "interviews",
        }
    }

    pub(crate) fn column(&self) -> &'static str {
        match self {
            StatusField::ResumeAnalysis => "analysis_status",
            StatusField::ResumeIndexing => "indexing_status",
            StatusField::InterviewFeedback => "feedback_status",
        }
    }

    /// Column holding the generated result, if the step produces one.
    pub(crate) fn result_column(&self) -> Option<&'static str> {
        match self {
            StatusField::ResumeAnalysis => Some("analysis"),
            StatusField::ResumeIndexing => None,
            StatusField::InterviewFeedback => Some("feedback"),
        }
    }
}

/// Outcome of moving a record into `processing`.
#[derive(Debug, Clone, PartialEq)]
pub enum BeginOutcome {
    Started,
    /// Already finished by an earlier delivery. Holds the terminal status.
    AlreadyTerminal(String),
    Missing,
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Inserts the resume unless the user already holds `limit` active ones.
    /// The count and the insert are atomic per user; `Ok(None)` means the
    /// quota was reached. `None` for `limit` skips the check.
    async fn create_resume(
        &self,
        new: &NewResume,
        limit: Option<i64>,
    ) -> Result<Option<ResumeRow>, StoreError>;
    async fn get_resume(&self, id: Uuid) -> Result<Option<ResumeRow>, StoreError>;
    async fn count_active_resumes(&self, user_id: Uuid) -> Result<i64, StoreError>;
    /// Returns false when the resume does not exist, is not the user's, or
    /// is already deleted.
    async fn soft_delete_resume(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
    async fn create_interview(&self, new: &NewInterview) -> Result<InterviewRow, StoreError>;
    async fn get_interview(&self, id: Uuid) -> Result<Option<InterviewRow>, StoreError>;
    async fn append_activity(&self, new: &NewActivity) -> Result<(), StoreError>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// `pending|processing → processing`. Terminal records are left alone.
    async fn begin_processing(
        &self,
        field: StatusField,
        id: Uuid,
    ) -> Result<BeginOutcome, StoreError>;

    /// `processing → status`, storing `result` alongside. Returns false when
    /// the record was not in `processing` (another delivery finished first).
    async fn finish(
        &self,
        field: StatusField,
        id: Uuid,
        status: &str,
        result: Option<Value>,
    ) -> Result<bool, StoreError>;

    async fn load_interview(&self, id: Uuid) -> Result<Option<InterviewRow>, StoreError>;
}

pub struct PaymentUpsert {
    pub user_id: Uuid,
    pub external_payment_id: String,
    pub external_subscription_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
}

/// `None` fields keep whatever the stored row already has.
pub struct SubscriptionUpsert {
    pub user_id: Uuid,
    pub external_subscription_id: String,
    pub plan: Option<String>,
    pub status: SubscriptionStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub last_payment_id: Option<String>,
    pub event_at: DateTime<Utc>,
}

#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Insert or update by provider payment id. A successful payment is
    /// never downgraded.
    async fn upsert_payment(&self, upsert: &PaymentUpsert) -> Result<PaymentRow, StoreError>;

    /// Insert or update the user's single subscription. Returns `None` when
    /// the stored row has seen a newer event, in which case nothing changes.
    async fn upsert_subscription(
        &self,
        upsert: &SubscriptionUpsert,
    ) -> Result<Option<SubscriptionRow>, StoreError>;

    async fn subscription_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<SubscriptionRow>, StoreError>;

    async fn subscription_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<SubscriptionRow>, StoreError>;

    async fn user_id_by_email(&self, email: &str) -> Result<Option<Uuid>, StoreError>;

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub users: i64,
    pub resumes: i64,
    pub interviews: i64,
    pub resumes_by_analysis_status: BTreeMap<String, i64>,
    pub active_subscriptions: i64,
    /// Successful payment totals per currency, smallest unit.
    pub revenue: BTreeMap<String, i64>,
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn dashboard_stats(&self) -> Result<DashboardStats, StoreError>;
    async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityRow>, StoreError>;
}
