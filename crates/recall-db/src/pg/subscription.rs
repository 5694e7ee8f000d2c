//! PostgreSQL subscription repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::SubscriptionRow;
use crate::repo::SubscriptionRepository;

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, stripe_customer_id, stripe_subscription_id, \
     status, trial_start, trial_end, current_period_start, current_period_end, \
     uploads_this_week, week_reset_at, created_at, updated_at";

/// PostgreSQL subscription repository
#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    /// Create a new subscription repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn find_by_user_id(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        let sub = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sub)
    }

    async fn find_by_stripe_customer_id(
        &self,
        customer_id: &str,
    ) -> DbResult<Option<SubscriptionRow>> {
        let sub = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE stripe_customer_id = $1"
        ))
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sub)
    }

    async fn get_or_create(
        &self,
        user_id: Uuid,
        week_reset_at: DateTime<Utc>,
    ) -> DbResult<SubscriptionRow> {
        // ON CONFLICT DO NOTHING + reselect keeps concurrent first-touch
        // callers idempotent: exactly one row per user survives.
        sqlx::query(
            r#"
            INSERT INTO subscriptions (id, user_id, status, uploads_this_week, week_reset_at)
            VALUES ($1, $2, 'free', 0, $3)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(week_reset_at)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, row: &SubscriptionRow) -> DbResult<SubscriptionRow> {
        let updated = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            UPDATE subscriptions
            SET stripe_customer_id = $1,
                stripe_subscription_id = $2,
                status = $3,
                trial_start = $4,
                trial_end = $5,
                current_period_start = $6,
                current_period_end = $7,
                uploads_this_week = $8,
                week_reset_at = $9,
                updated_at = $10
            WHERE id = $11
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(&row.stripe_customer_id)
        .bind(&row.stripe_subscription_id)
        .bind(&row.status)
        .bind(row.trial_start)
        .bind(row.trial_end)
        .bind(row.current_period_start)
        .bind(row.current_period_end)
        .bind(row.uploads_this_week)
        .bind(row.week_reset_at)
        .bind(row.updated_at)
        .bind(row.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }
}
