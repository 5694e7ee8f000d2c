//! In-memory repositories for testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use recall_db::{
    DbError, DbResult, MaterialUsageRepository, SubscriptionRepository, SubscriptionRow,
};

/// In-memory subscription store
#[derive(Default, Clone)]
pub struct MockSubscriptionStore {
    rows: Arc<DashMap<Uuid, SubscriptionRow>>,
    by_user: Arc<DashMap<Uuid, Uuid>>,
}

impl MockSubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Insert a row directly, bypassing get_or_create defaults
    pub fn insert_row(&self, row: SubscriptionRow) {
        self.by_user.insert(row.user_id, row.id);
        self.rows.insert(row.id, row);
    }

    /// Fetch a row by user for assertions
    pub fn row_for_user(&self, user_id: Uuid) -> Option<SubscriptionRow> {
        self.by_user
            .get(&user_id)
            .and_then(|id| self.rows.get(id.value()).map(|r| r.value().clone()))
    }

    /// Build a row with the lazy-create defaults plus overrides applied
    pub fn seeded_row(user_id: Uuid, now: DateTime<Utc>) -> SubscriptionRow {
        SubscriptionRow {
            id: Uuid::new_v4(),
            user_id,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            status: "free".to_string(),
            trial_start: None,
            trial_end: None,
            current_period_start: None,
            current_period_end: None,
            uploads_this_week: 0,
            week_reset_at: now + chrono::Duration::days(7),
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl SubscriptionRepository for MockSubscriptionStore {
    async fn find_by_user_id(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        Ok(self.row_for_user(user_id))
    }

    async fn find_by_stripe_customer_id(
        &self,
        customer_id: &str,
    ) -> DbResult<Option<SubscriptionRow>> {
        Ok(self
            .rows
            .iter()
            .find(|r| r.stripe_customer_id.as_deref() == Some(customer_id))
            .map(|r| r.value().clone()))
    }

    async fn get_or_create(
        &self,
        user_id: Uuid,
        week_reset_at: DateTime<Utc>,
    ) -> DbResult<SubscriptionRow> {
        if let Some(row) = self.row_for_user(user_id) {
            return Ok(row);
        }

        let now = week_reset_at - chrono::Duration::days(7);
        let row = SubscriptionRow {
            id: Uuid::new_v4(),
            user_id,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            status: "free".to_string(),
            trial_start: None,
            trial_end: None,
            current_period_start: None,
            current_period_end: None,
            uploads_this_week: 0,
            week_reset_at,
            created_at: now,
            updated_at: now,
        };
        self.insert_row(row.clone());
        Ok(row)
    }

    async fn update(&self, row: &SubscriptionRow) -> DbResult<SubscriptionRow> {
        if !self.rows.contains_key(&row.id) {
            return Err(DbError::NotFound);
        }
        self.insert_row(row.clone());
        Ok(row.clone())
    }
}

/// In-memory material usage store
#[derive(Default, Clone)]
pub struct MockMaterialStore {
    quiz_counts: Arc<DashMap<Uuid, i64>>,
}

impl MockMaterialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material with an initial quiz count
    pub fn insert_material(&self, material_id: Uuid, quiz_count: i64) {
        self.quiz_counts.insert(material_id, quiz_count);
    }
}

#[async_trait]
impl MaterialUsageRepository for MockMaterialStore {
    async fn get_quiz_count(&self, material_id: Uuid) -> DbResult<Option<i64>> {
        Ok(self.quiz_counts.get(&material_id).map(|c| *c.value()))
    }

    async fn set_quiz_count(&self, material_id: Uuid, count: i64) -> DbResult<()> {
        // Matches the SQL UPDATE: a missing material row is a no-op
        if self.quiz_counts.contains_key(&material_id) {
            self.quiz_counts.insert(material_id, count);
        }
        Ok(())
    }
}
