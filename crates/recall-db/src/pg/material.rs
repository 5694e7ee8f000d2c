//! PostgreSQL material usage repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::repo::MaterialUsageRepository;

/// PostgreSQL material usage repository
#[derive(Clone)]
pub struct PgMaterialUsageRepository {
    pool: PgPool,
}

impl PgMaterialUsageRepository {
    /// Create a new material usage repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MaterialUsageRepository for PgMaterialUsageRepository {
    async fn get_quiz_count(&self, material_id: Uuid) -> DbResult<Option<i64>> {
        let count: Option<(i64,)> =
            sqlx::query_as("SELECT quiz_count FROM materials WHERE id = $1")
                .bind(material_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(count.map(|(c,)| c))
    }

    async fn set_quiz_count(&self, material_id: Uuid, count: i64) -> DbResult<()> {
        sqlx::query("UPDATE materials SET quiz_count = $1, updated_at = NOW() WHERE id = $2")
            .bind(count)
            .bind(material_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
