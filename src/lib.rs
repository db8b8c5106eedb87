//! Subscription records and month-based billing totals.
//!
//! [`repo::SubscriptionRepository`] is the persistence seam, with an
//! in-memory backend and a PostgreSQL one behind the `db` feature.
//! [`billing::MonthlyCostAggregator`] computes what a user or service was
//! billed over a range of months.

pub mod billing;
pub mod config;
pub mod domain;
pub mod error;
pub mod repo;
pub mod telemetry;

pub use billing::{MonthlyCostAggregator, PeriodCost};
pub use domain::{BillingMonth, NewSubscription, Page, Subscription, SubscriptionFilter};
pub use error::StoreError;
pub use repo::{InMemorySubscriptionRepository, Repositories, SubscriptionRepository};
