//! In-memory store for tests, mirroring the guards in the SQL of `PgStore`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::{
    AdminStore, BeginOutcome, BillingStore, DashboardStats, JobStore, NewActivity, NewInterview,
    NewResume, PaymentUpsert, StatusField, StoreError, SubmissionStore, SubscriptionUpsert,
};
use crate::jobs::{IndexingStatus, JobStatus};
use crate::models::activity::ActivityRow;
use crate::models::billing::{PaymentRow, PaymentStatus, SubscriptionRow, SubscriptionStatus};
use crate::models::interview::InterviewRow;
use crate::models::resume::ResumeRow;
use crate::models::user::User;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, String>,
    resumes: HashMap<Uuid, ResumeRow>,
    interviews: HashMap<Uuid, InterviewRow>,
    activities: Vec<ActivityRow>,
    payments: Vec<PaymentRow>,
    subscriptions: Vec<SubscriptionRow>,
    fail_billing: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state
            .lock()
            .unwrap()
            .users
            .insert(id, email.to_string());
        id
    }

    pub fn resumes(&self) -> Vec<ResumeRow> {
        self.state.lock().unwrap().resumes.values().cloned().collect()
    }

    pub fn resume(&self, id: Uuid) -> Option<ResumeRow> {
        self.state.lock().unwrap().resumes.get(&id).cloned()
    }

    pub fn interview(&self, id: Uuid) -> Option<InterviewRow> {
        self.state.lock().unwrap().interviews.get(&id).cloned()
    }

    pub fn activities(&self) -> Vec<ActivityRow> {
        self.state.lock().unwrap().activities.clone()
    }

    pub fn payments(&self) -> Vec<PaymentRow> {
        self.state.lock().unwrap().payments.clone()
    }

    pub fn subscriptions(&self) -> Vec<SubscriptionRow> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    pub fn set_status(&self, field: StatusField, id: Uuid, status: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(slot) = status_slot(&mut state, field, id) {
            *slot = status.to_string();
        }
    }

    pub fn fail_billing_writes(&self) {
        self.state.lock().unwrap().fail_billing = true;
    }

    /// True when nothing billing-related has been written.
    pub fn billing_untouched(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.payments.is_empty() && state.subscriptions.is_empty()
    }
}

fn status_slot<'a>(state: &'a mut State, field: StatusField, id: Uuid) -> Option<&'a mut String> {
    match field {
        StatusField::ResumeAnalysis => state.resumes.get_mut(&id).map(|r| &mut r.analysis_status),
        StatusField::ResumeIndexing => state.resumes.get_mut(&id).map(|r| &mut r.indexing_status),
        StatusField::InterviewFeedback => state
            .interviews
            .get_mut(&id)
            .map(|i| &mut i.feedback_status),
    }
}

fn billing_failure() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn create_resume(
        &self,
        new: &NewResume,
        limit: Option<i64>,
    ) -> Result<Option<ResumeRow>, StoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(limit) = limit {
            let used = state
                .resumes
                .values()
                .filter(|r| r.user_id == new.user_id && !r.deleted)
                .count() as i64;
            if used >= limit {
                return Ok(None);
            }
        }
        let now = Utc::now();
        let row = ResumeRow {
            id: new.id,
            user_id: new.user_id,
            file_name: new.file_name.clone(),
            file_url: new.file_url.clone(),
            public_id: new.public_id.clone(),
            analysis_status: JobStatus::Pending.as_str().to_string(),
            indexing_status: IndexingStatus::Pending.as_str().to_string(),
            analysis: None,
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        state.resumes.insert(row.id, row.clone());
        Ok(Some(row))
    }

    async fn get_resume(&self, id: Uuid) -> Result<Option<ResumeRow>, StoreError> {
        Ok(self.resume(id).filter(|r| !r.deleted))
    }

    async fn count_active_resumes(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .resumes
            .values()
            .filter(|r| r.user_id == user_id && !r.deleted)
            .count() as i64)
    }

    async fn soft_delete_resume(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        match state.resumes.get_mut(&id) {
            Some(r) if r.user_id == user_id && !r.deleted => {
                r.deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_interview(&self, new: &NewInterview) -> Result<InterviewRow, StoreError> {
        let now = Utc::now();
        let row = InterviewRow {
            id: new.id,
            user_id: new.user_id,
            role: new.role.clone(),
            interview_type: new.interview_type.clone(),
            tech_stack: new.tech_stack.clone(),
            transcript: serde_json::to_value(&new.transcript)?,
            feedback_status: JobStatus::Pending.as_str().to_string(),
            feedback: None,
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        self.state
            .lock()
            .unwrap()
            .interviews
            .insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_interview(&self, id: Uuid) -> Result<Option<InterviewRow>, StoreError> {
        Ok(self.interview(id).filter(|i| !i.deleted))
    }

    async fn append_activity(&self, new: &NewActivity) -> Result<(), StoreError> {
        self.state.lock().unwrap().activities.push(ActivityRow {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            action: new.action.as_str().to_string(),
            entity_id: new.entity_id,
            metadata: new.metadata.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn begin_processing(
        &self,
        field: StatusField,
        id: Uuid,
    ) -> Result<BeginOutcome, StoreError> {
        let mut state = self.state.lock().unwrap();
        let Some(slot) = status_slot(&mut state, field, id) else {
            return Ok(BeginOutcome::Missing);
        };
        if slot == "pending" || slot == "processing" {
            *slot = "processing".to_string();
            Ok(BeginOutcome::Started)
        } else {
            Ok(BeginOutcome::AlreadyTerminal(slot.clone()))
        }
    }

    async fn finish(
        &self,
        field: StatusField,
        id: Uuid,
        status: &str,
        result: Option<Value>,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        match status_slot(&mut state, field, id) {
            Some(slot) if slot == "processing" => *slot = status.to_string(),
            _ => return Ok(false),
        }
        if let Some(result) = result {
            match field {
                StatusField::ResumeAnalysis => {
                    if let Some(r) = state.resumes.get_mut(&id) {
                        r.analysis = Some(result);
                    }
                }
                StatusField::InterviewFeedback => {
                    if let Some(i) = state.interviews.get_mut(&id) {
                        i.feedback = Some(result);
                    }
                }
                StatusField::ResumeIndexing => {}
            }
        }
        Ok(true)
    }

    async fn load_interview(&self, id: Uuid) -> Result<Option<InterviewRow>, StoreError> {
        Ok(self.interview(id))
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn upsert_payment(&self, upsert: &PaymentUpsert) -> Result<PaymentRow, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_billing {
            return Err(billing_failure());
        }
        let now = Utc::now();
        if let Some(existing) = state
            .payments
            .iter_mut()
            .find(|p| p.external_payment_id == upsert.external_payment_id)
        {
            existing.amount = upsert.amount;
            existing.currency = upsert.currency.clone();
            if upsert.external_subscription_id.is_some() {
                existing.external_subscription_id = upsert.external_subscription_id.clone();
            }
            if existing.status != PaymentStatus::Success.as_str() {
                existing.status = upsert.status.as_str().to_string();
            }
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let row = PaymentRow {
            id: Uuid::new_v4(),
            user_id: upsert.user_id,
            amount: upsert.amount,
            currency: upsert.currency.clone(),
            external_payment_id: upsert.external_payment_id.clone(),
            external_subscription_id: upsert.external_subscription_id.clone(),
            status: upsert.status.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        state.payments.push(row.clone());
        Ok(row)
    }

    async fn upsert_subscription(
        &self,
        upsert: &SubscriptionUpsert,
    ) -> Result<Option<SubscriptionRow>, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_billing {
            return Err(billing_failure());
        }
        let now = Utc::now();
        if let Some(existing) = state
            .subscriptions
            .iter_mut()
            .find(|s| s.user_id == upsert.user_id)
        {
            if existing.last_event_at > upsert.event_at {
                return Ok(None);
            }
            existing.external_subscription_id = upsert.external_subscription_id.clone();
            existing.plan = upsert.plan.clone().or(existing.plan.take());
            existing.status = upsert.status.as_str().to_string();
            existing.start_date = upsert.start_date.or(existing.start_date);
            existing.end_date = upsert.end_date.or(existing.end_date);
            existing.last_payment_id = upsert
                .last_payment_id
                .clone()
                .or(existing.last_payment_id.take());
            existing.last_event_at = upsert.event_at;
            existing.updated_at = now;
            return Ok(Some(existing.clone()));
        }
        let row = SubscriptionRow {
            id: Uuid::new_v4(),
            user_id: upsert.user_id,
            external_subscription_id: upsert.external_subscription_id.clone(),
            plan: upsert.plan.clone(),
            status: upsert.status.as_str().to_string(),
            start_date: upsert.start_date,
            end_date: upsert.end_date,
            last_payment_id: upsert.last_payment_id.clone(),
            last_event_at: upsert.event_at,
            created_at: now,
            updated_at: now,
        };
        state.subscriptions.push(row.clone());
        Ok(Some(row))
    }

    async fn subscription_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<SubscriptionRow>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .subscriptions
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn subscription_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<SubscriptionRow>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .subscriptions
            .iter()
            .find(|s| s.external_subscription_id == external_subscription_id)
            .cloned())
    }

    async fn user_id_by_email(&self, email: &str) -> Result<Option<Uuid>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .find(|(_, e)| e.eq_ignore_ascii_case(email))
            .map(|(id, _)| *id))
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.get(&user_id).map(|email| User {
            id: user_id,
            email: email.clone(),
            name: None,
            created_at: Utc::now(),
        }))
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn dashboard_stats(&self) -> Result<DashboardStats, StoreError> {
        let state = self.state.lock().unwrap();
        let mut stats = DashboardStats {
            users: state.users.len() as i64,
            ..DashboardStats::default()
        };
        for resume in state.resumes.values().filter(|r| !r.deleted) {
            stats.resumes += 1;
            *stats
                .resumes_by_analysis_status
                .entry(resume.analysis_status.clone())
                .or_default() += 1;
        }
        stats.interviews = state.interviews.values().filter(|i| !i.deleted).count() as i64;
        stats.active_subscriptions = state
            .subscriptions
            .iter()
            .filter(|s| s.status == SubscriptionStatus::Active.as_str())
            .count() as i64;
        for payment in state
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Success.as_str())
        {
            *stats.revenue.entry(payment.currency.clone()).or_default() += payment.amount;
        }
        Ok(stats)
    }

    async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityRow>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .activities
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
