//! PostgreSQL repository implementations

mod material;
mod subscription;

pub use material::PgMaterialUsageRepository;
pub use subscription::PgSubscriptionRepository;

use crate::DbPool;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub subscriptions: PgSubscriptionRepository,
    pub materials: PgMaterialUsageRepository,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            subscriptions: PgSubscriptionRepository::new(pool.clone()),
            materials: PgMaterialUsageRepository::new(pool),
        }
    }
}
