use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;
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

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn create_resume(
        &self,
        new: &NewResume,
        limit: Option<i64>,
    ) -> Result<Option<ResumeRow>, StoreError> {
        let mut tx = self.pool.begin().await?;

        if let Some(limit) = limit {
            // Serialises concurrent uploads by the same user until commit.
            sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
                .bind(new.user_id)
                .execute(&mut *tx)
                .await?;
            let used: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM resumes WHERE user_id = $1 AND NOT deleted",
            )
            .bind(new.user_id)
            .fetch_one(&mut *tx)
            .await?;
            if used >= limit {
                debug!(user_id = %new.user_id, used, limit, "Resume quota reached");
                tx.rollback().await?;
                return Ok(None);
            }
        }

        let row = sqlx::query_as::<_, ResumeRow>(
            r#"
            INSERT INTO resumes
                (id, user_id, file_name, file_url, public_id, analysis_status, indexing_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new.id)
        .bind(new.user_id)
        .bind(&new.file_name)
        .bind(&new.file_url)
        .bind(&new.public_id)
        .bind(JobStatus::Pending.as_str())
        .bind(IndexingStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Some(row))
    }

    async fn get_resume(&self, id: Uuid) -> Result<Option<ResumeRow>, StoreError> {
        Ok(
            sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1 AND NOT deleted")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn count_active_resumes(&self, user_id: Uuid) -> Result<i64, StoreError> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM resumes WHERE user_id = $1 AND NOT deleted")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn soft_delete_resume(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE resumes SET deleted = TRUE, updated_at = now() \
             WHERE id = $1 AND user_id = $2 AND NOT deleted",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn create_interview(&self, new: &NewInterview) -> Result<InterviewRow, StoreError> {
        let transcript = serde_json::to_value(&new.transcript)?;
        Ok(sqlx::query_as::<_, InterviewRow>(
            r#"
            INSERT INTO interviews
                (id, user_id, role, interview_type, tech_stack, transcript, feedback_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new.id)
        .bind(new.user_id)
        .bind(&new.role)
        .bind(&new.interview_type)
        .bind(&new.tech_stack)
        .bind(transcript)
        .bind(JobStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_interview(&self, id: Uuid) -> Result<Option<InterviewRow>, StoreError> {
        Ok(sqlx::query_as::<_, InterviewRow>(
            "SELECT * FROM interviews WHERE id = $1 AND NOT deleted",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn append_activity(&self, new: &NewActivity) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO activities (id, user_id, action, entity_id, metadata) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.action.as_str())
        .bind(new.entity_id)
        .bind(&new.metadata)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn begin_processing(
        &self,
        field: StatusField,
        id: Uuid,
    ) -> Result<BeginOutcome, StoreError> {
        let (table, column) = (field.table(), field.column());
        let started = sqlx::query(&format!(
            "UPDATE {table} SET {column} = 'processing', updated_at = now() \
             WHERE id = $1 AND {column} IN ('pending', 'processing')"
        ))
        .bind(id)
        .execute(&self.pool)
        .await?;
        if started.rows_affected() == 1 {
            return Ok(BeginOutcome::Started);
        }

        let current: Option<String> =
            sqlx::query_scalar(&format!("SELECT {column} FROM {table} WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(match current {
            Some(status) => BeginOutcome::AlreadyTerminal(status),
            None => BeginOutcome::Missing,
        })
    }

    async fn finish(
        &self,
        field: StatusField,
        id: Uuid,
        status: &str,
        result: Option<Value>,
    ) -> Result<bool, StoreError> {
        let (table, column) = (field.table(), field.column());
        let updated = match field.result_column() {
            Some(result_column) => {
                sqlx::query(&format!(
                    "UPDATE {table} SET {column} = $1, \
                     {result_column} = COALESCE($2, {result_column}), updated_at = now() \
                     WHERE id = $3 AND {column} = 'processing'"
                ))
                .bind(status)
                .bind(result)
                .bind(id)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "UPDATE {table} SET {column} = $1, updated_at = now() \
                     WHERE id = $2 AND {column} = 'processing'"
                ))
                .bind(status)
                .bind(id)
                .execute(&self.pool)
                .await?
            }
        };
        debug!(%id, column, status, rows = updated.rows_affected(), "Finished job step");
        Ok(updated.rows_affected() == 1)
    }

    async fn load_interview(&self, id: Uuid) -> Result<Option<InterviewRow>, StoreError> {
        Ok(
            sqlx::query_as::<_, InterviewRow>("SELECT * FROM interviews WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }
}

#[async_trait]
impl BillingStore for PgStore {
    async fn upsert_payment(&self, upsert: &PaymentUpsert) -> Result<PaymentRow, StoreError> {
        Ok(sqlx::query_as::<_, PaymentRow>(
            r#"
            INSERT INTO payments
                (id, user_id, amount, currency, external_payment_id, external_subscription_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (external_payment_id) DO UPDATE SET
                amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                external_subscription_id =
                    COALESCE(EXCLUDED.external_subscription_id, payments.external_subscription_id),
                status = CASE WHEN payments.status = $8 THEN payments.status ELSE EXCLUDED.status END,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(upsert.user_id)
        .bind(upsert.amount)
        .bind(&upsert.currency)
        .bind(&upsert.external_payment_id)
        .bind(&upsert.external_subscription_id)
        .bind(upsert.status.as_str())
        .bind(PaymentStatus::Success.as_str())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn upsert_subscription(
        &self,
        upsert: &SubscriptionUpsert,
    ) -> Result<Option<SubscriptionRow>, StoreError> {
        Ok(sqlx::query_as::<_, SubscriptionRow>(
            r#"
            INSERT INTO subscriptions
                (id, user_id, external_subscription_id, plan, status,
                 start_date, end_date, last_payment_id, last_event_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id) DO UPDATE SET
                external_subscription_id = EXCLUDED.external_subscription_id,
                plan = COALESCE(EXCLUDED.plan, subscriptions.plan),
                status = EXCLUDED.status,
                start_date = COALESCE(EXCLUDED.start_date, subscriptions.start_date),
                end_date = COALESCE(EXCLUDED.end_date, subscriptions.end_date),
                last_payment_id = COALESCE(EXCLUDED.last_payment_id, subscriptions.last_payment_id),
                last_event_at = EXCLUDED.last_event_at,
                updated_at = now()
            WHERE subscriptions.last_event_at <= EXCLUDED.last_event_at
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(upsert.user_id)
        .bind(&upsert.external_subscription_id)
        .bind(&upsert.plan)
        .bind(upsert.status.as_str())
        .bind(upsert.start_date)
        .bind(upsert.end_date)
        .bind(&upsert.last_payment_id)
        .bind(upsert.event_at)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn subscription_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<SubscriptionRow>, StoreError> {
        Ok(
            sqlx::query_as::<_, SubscriptionRow>("SELECT * FROM subscriptions WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn subscription_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<SubscriptionRow>, StoreError> {
        Ok(sqlx::query_as::<_, SubscriptionRow>(
            "SELECT * FROM subscriptions WHERE external_subscription_id = $1",
        )
        .bind(external_subscription_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn user_id_by_email(&self, email: &str) -> Result<Option<Uuid>, StoreError> {
        Ok(
            sqlx::query_scalar("SELECT id FROM users WHERE lower(email) = lower($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }
}

#[async_trait]
impl AdminStore for PgStore {
    async fn dashboard_stats(&self) -> Result<DashboardStats, StoreError> {
        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let resumes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resumes WHERE NOT deleted")
            .fetch_one(&self.pool)
            .await?;
        let interviews: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM interviews WHERE NOT deleted")
                .fetch_one(&self.pool)
                .await?;
        let by_status: Vec<(String, i64)> = sqlx::query_as(
            "SELECT analysis_status, COUNT(*) FROM resumes WHERE NOT deleted GROUP BY analysis_status",
        )
        .fetch_all(&self.pool)
        .await?;
        let active_subscriptions: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE status = $1")
                .bind(SubscriptionStatus::Active.as_str())
                .fetch_one(&self.pool)
                .await?;
        let revenue: Vec<(String, i64)> = sqlx::query_as(
            "SELECT currency, SUM(amount)::BIGINT FROM payments WHERE status = $1 GROUP BY currency",
        )
        .bind(PaymentStatus::Success.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(DashboardStats {
            users,
            resumes,
            interviews,
            resumes_by_analysis_status: by_status.into_iter().collect(),
            active_subscriptions,
            revenue: revenue.into_iter().collect(),
        })
    }

    async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityRow>, StoreError> {
        Ok(sqlx::query_as::<_, ActivityRow>(
            "SELECT * FROM activities ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }
}
