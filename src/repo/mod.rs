use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::Arc;

use crate::billing::MonthlyCostAggregator;
use crate::domain::{NewSubscription, Page, Subscription, SubscriptionFilter};
use crate::error::StoreError;

pub mod memory;
#[cfg(feature = "db")]
pub mod pg;
pub mod query;

pub use memory::InMemorySubscriptionRepository;
#[cfg(feature = "db")]
pub use pg::{PgRepo, PgSubscriptionRepository};

/// Persistence seam for subscription records.
///
/// Each call is a single statement against the store; nothing is cached
/// between calls and nothing is retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Insert a record and return the id assigned by the store.
    async fn create(&self, sub: &NewSubscription) -> Result<i64, StoreError>;

    async fn get(&self, id: i64) -> Result<Subscription, StoreError>;

    /// Replace every field of an existing record.
    async fn update(&self, id: i64, sub: &NewSubscription) -> Result<(), StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Matching records ordered by id descending. Never fails on zero rows.
    async fn list(
        &self,
        filter: &SubscriptionFilter,
        page: Page,
    ) -> Result<Vec<Subscription>, StoreError>;

    /// Records starting no later than `until` and not ended before `from`.
    async fn active_between(
        &self,
        filter: &SubscriptionFilter,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Vec<Subscription>, StoreError>;
}

/// Store handles shared by callers.
#[derive(Clone)]
pub struct Repositories {
    pub subscriptions: Arc<dyn SubscriptionRepository>,
}

impl Repositories {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self { subscriptions }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemorySubscriptionRepository::new()))
    }

    /// Connect to PostgreSQL and apply pending migrations.
    #[cfg(feature = "db")]
    pub async fn connect(cfg: &crate::config::Config) -> anyhow::Result<Self> {
        let db = PgRepo::connect(&cfg.db).await?;
        db.migrate().await?;
        Ok(Self::new(Arc::new(db.subscriptions())))
    }

    pub fn cost_aggregator(&self) -> MonthlyCostAggregator<dyn SubscriptionRepository> {
        MonthlyCostAggregator::new(Arc::clone(&self.subscriptions))
    }
}
