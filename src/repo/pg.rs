use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_query::PostgresQueryBuilder;
use sea_query_binder::SqlxBinder;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::{query, SubscriptionRepository};
use crate::config::DbConfig;
use crate::domain::{BillingMonth, NewSubscription, Page, Subscription, SubscriptionFilter};
use crate::error::StoreError;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connection pool for the subscription database.
pub struct PgRepo {
    pub pool: PgPool,
}

impl PgRepo {
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        info!(host = %config.host, database = %config.database, "connecting to database");

        let mut options = match &config.url {
            Some(url) => PgConnectOptions::from_str(url).context("invalid database URL")?,
            None => PgConnectOptions::new()
                .host(&config.host)
                .port(config.port)
                .username(&config.username)
                .password(&config.password)
                .database(&config.database),
        };
        if config.statement_timeout_secs > 0 {
            let millis = config.statement_timeout_secs.saturating_mul(1000);
            options = options.options([("statement_timeout", millis.to_string())]);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect_with(options)
            .await
            .context("Failed to create database pool")?;

        let repo = Self { pool };
        repo.health_check().await?;

        info!("database connection pool ready");
        Ok(repo)
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    /// Apply embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        Ok(())
    }

    pub fn subscriptions(&self) -> PgSubscriptionRepository {
        PgSubscriptionRepository::new(self.pool.clone())
    }

    pub async fn close(self) {
        info!("closing database connection pool");
        self.pool.close().await;
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SubscriptionRow {
    id: i64,
    service_name: String,
    price: i64,
    user_id: Uuid,
    start_date: NaiveDateTime,
    end_date: Option<NaiveDateTime>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            id: row.id,
            service_name: row.service_name,
            price: row.price,
            user_id: row.user_id,
            start: BillingMonth::from_datetime(row.start_date),
            end: row.end_date.map(BillingMonth::from_datetime),
        }
    }
}

/// `subscriptions` table access over a shared pool.
#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_all(
        &self,
        stmt: sea_query::SelectStatement,
    ) -> Result<Vec<Subscription>, StoreError> {
        let (sql, values) = stmt.build_sqlx(PostgresQueryBuilder);
        debug!(%sql, "select subscriptions");
        let rows = sqlx::query_as_with::<_, SubscriptionRow, _>(&sql, values)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Subscription::from).collect())
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn create(&self, sub: &NewSubscription) -> Result<i64, StoreError> {
        let (sql, values) = query::insert(sub)?.build_sqlx(PostgresQueryBuilder);
        debug!(%sql, "insert subscription");
        let id = sqlx::query_scalar_with::<_, i64, _>(&sql, values)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Subscription, StoreError> {
        let (sql, values) = query::select_by_id(id).build_sqlx(PostgresQueryBuilder);
        let row = sqlx::query_as_with::<_, SubscriptionRow, _>(&sql, values)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Subscription::from).ok_or(StoreError::NotFound { id })
    }

    async fn update(&self, id: i64, sub: &NewSubscription) -> Result<(), StoreError> {
        let (sql, values) = query::update(id, sub).build_sqlx(PostgresQueryBuilder);
        debug!(%sql, id, "update subscription");
        let result = sqlx::query_with(&sql, values).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let (sql, values) = query::delete(id).build_sqlx(PostgresQueryBuilder);
        debug!(%sql, id, "delete subscription");
        let result = sqlx::query_with(&sql, values).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    async fn list(
        &self,
        filter: &SubscriptionFilter,
        page: Page,
    ) -> Result<Vec<Subscription>, StoreError> {
        self.fetch_all(query::list(filter, page)).await
    }

    async fn active_between(
        &self,
        filter: &SubscriptionFilter,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Vec<Subscription>, StoreError> {
        self.fetch_all(query::active_between(filter, from, until)).await
    }
}
