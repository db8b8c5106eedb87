//! Period cost aggregation.
//!
//! Subscriptions bill per calendar month, so cost over a period is the sum of
//! `price × overlapping months` for every subscription active in it. The
//! repository narrows candidates with a coarse date-range query; the exact
//! month arithmetic happens here.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{months_overlap, BillingMonth, SubscriptionFilter};
use crate::error::StoreError;
use crate::repo::SubscriptionRepository;

#[async_trait]
pub trait PeriodCost: Send + Sync {
    /// Total billed across `[period_start, period_end]`, both months
    /// inclusive, for subscriptions matching the optional filters.
    ///
    /// A non-blank `user_id` must be a UUID, otherwise the call fails with
    /// [`StoreError::InvalidFilter`] before touching the store.
    async fn total_for_period(
        &self,
        period_start: BillingMonth,
        period_end: BillingMonth,
        user_id: Option<&str>,
        service_name: Option<&str>,
    ) -> Result<i64, StoreError>;
}

pub struct MonthlyCostAggregator<R: SubscriptionRepository + ?Sized> {
    repo: Arc<R>,
}

impl<R: SubscriptionRepository + ?Sized> Clone for MonthlyCostAggregator<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: SubscriptionRepository + ?Sized> MonthlyCostAggregator<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Same as [`PeriodCost::total_for_period`] with an already-typed filter.
    pub async fn total_with_filter(
        &self,
        period_start: BillingMonth,
        period_end: BillingMonth,
        filter: &SubscriptionFilter,
    ) -> Result<i64, StoreError> {
        let candidates = self
            .repo
            .active_between(filter, period_start.first_instant(), period_end.last_instant())
            .await?;

        let total = candidates.iter().try_fold(0i64, |acc, sub| {
            let (start, end) = sub.active_range();
            let months = months_overlap(start, end, period_start, period_end);
            sub.price
                .checked_mul(i64::from(months))
                .and_then(|cost| acc.checked_add(cost))
                .ok_or(StoreError::TotalOverflow)
        })?;

        debug!(
            period_start = %period_start,
            period_end = %period_end,
            candidates = candidates.len(),
            total,
            "computed period cost"
        );
        Ok(total)
    }
}

#[async_trait]
impl<R: SubscriptionRepository + ?Sized> PeriodCost for MonthlyCostAggregator<R> {
    async fn total_for_period(
        &self,
        period_start: BillingMonth,
        period_end: BillingMonth,
        user_id: Option<&str>,
        service_name: Option<&str>,
    ) -> Result<i64, StoreError> {
        let filter = SubscriptionFilter::parse(user_id, service_name)?;
        self.total_with_filter(period_start, period_end, &filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewSubscription;
    use crate::repo::{InMemorySubscriptionRepository, MockSubscriptionRepository};
    use uuid::Uuid;

    fn m(year: i32, month: u32) -> BillingMonth {
        BillingMonth::new(year, month).unwrap()
    }

    fn sub(
        service: &str,
        price: i64,
        user_id: Uuid,
        start: BillingMonth,
        end: Option<BillingMonth>,
    ) -> NewSubscription {
        NewSubscription {
            service_name: service.to_string(),
            price,
            user_id,
            start,
            end,
        }
    }

    async fn seeded(
        subs: &[NewSubscription],
    ) -> MonthlyCostAggregator<InMemorySubscriptionRepository> {
        let repo = InMemorySubscriptionRepository::new();
        for s in subs {
            repo.create(s).await.unwrap();
        }
        MonthlyCostAggregator::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn test_single_month_inside_active_range() {
        let user = Uuid::new_v4();
        let agg = seeded(&[sub("Netflix", 100, user, m(2024, 1), Some(m(2024, 3)))]).await;

        let total = agg
            .total_for_period(m(2024, 2), m(2024, 2), None, None)
            .await
            .unwrap();
        assert_eq!(total, 100);
    }

    #[tokio::test]
    async fn test_sums_price_times_overlap() {
        let user = Uuid::new_v4();
        let agg = seeded(&[
            // Feb, Mar overlap
            sub("Netflix", 100, user, m(2024, 1), Some(m(2024, 3))),
            // Apr..Jun overlap
            sub("Spotify", 50, user, m(2024, 4), None),
            // before the period
            sub("Old", 999, user, m(2023, 1), Some(m(2023, 12))),
        ])
        .await;

        let total = agg
            .total_for_period(m(2024, 2), m(2024, 6), None, None)
            .await
            .unwrap();
        assert_eq!(total, 100 * 2 + 50 * 3);
    }

    #[tokio::test]
    async fn test_open_ended_subscription_counts_far_in_future() {
        let user = Uuid::new_v4();
        let agg = seeded(&[sub("Netflix", 10, user, m(2024, 1), None)]).await;

        let total = agg
            .total_for_period(m(2050, 1), m(2050, 12), None, None)
            .await
            .unwrap();
        assert_eq!(total, 120);
    }

    #[tokio::test]
    async fn test_filters_apply_like_list() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let agg = seeded(&[
            sub("Netflix", 100, alice, m(2024, 1), None),
            sub("Spotify", 30, alice, m(2024, 1), None),
            sub("Netflix", 70, bob, m(2024, 1), None),
        ])
        .await;
        let alice_id = alice.to_string();
        let jan = m(2024, 1);

        let by_user = agg
            .total_for_period(jan, jan, Some(&alice_id), None)
            .await
            .unwrap();
        assert_eq!(by_user, 130);

        let by_service = agg
            .total_for_period(jan, jan, None, Some("Netflix"))
            .await
            .unwrap();
        assert_eq!(by_service, 170);

        let both = agg
            .total_for_period(jan, jan, Some(&alice_id), Some("Netflix"))
            .await
            .unwrap();
        assert_eq!(both, 100);

        let wrong_case = agg
            .total_for_period(jan, jan, None, Some("netflix"))
            .await
            .unwrap();
        assert_eq!(wrong_case, 0);
    }

    #[tokio::test]
    async fn test_unknown_user_totals_zero() {
        let agg = seeded(&[sub("Netflix", 100, Uuid::new_v4(), m(2024, 1), None)]).await;
        let stranger = Uuid::new_v4().to_string();

        let total = agg
            .total_for_period(m(2024, 1), m(2024, 12), Some(&stranger), None)
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_inverted_subscription_contributes_nothing() {
        let broken = sub("Broken", 100, Uuid::new_v4(), m(2024, 6), Some(m(2024, 2)));
        let agg = seeded(&[broken]).await;

        let total = agg
            .total_for_period(m(2024, 1), m(2024, 12), None, None)
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_price_times_months_overflow_is_an_error() {
        let agg = seeded(&[sub("Huge", i64::MAX / 2, Uuid::new_v4(), m(2024, 1), None)]).await;

        let err = agg
            .total_for_period(m(2024, 1), m(2024, 12), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TotalOverflow));
    }

    #[tokio::test]
    async fn test_sum_overflow_across_subscriptions_is_an_error() {
        let user = Uuid::new_v4();
        let agg = seeded(&[
            sub("Half", i64::MAX / 2 + 1, user, m(2024, 1), None),
            sub("Other half", i64::MAX / 2 + 1, user, m(2024, 1), None),
        ])
        .await;

        let err = agg
            .total_for_period(m(2024, 1), m(2024, 1), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TotalOverflow));
    }

    #[tokio::test]
    async fn test_malformed_user_id_fails_before_query() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_active_between().never();
        let agg = MonthlyCostAggregator::new(Arc::new(repo));

        let err = agg
            .total_for_period(m(2024, 1), m(2024, 1), Some("12345"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidFilter(_)));
    }

    #[tokio::test]
    async fn test_store_failure_returns_no_partial_total() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_active_between()
            .times(1)
            .returning(|_, _, _| Err(StoreError::persistence("connection reset")));
        let agg = MonthlyCostAggregator::new(Arc::new(repo));

        let err = agg
            .total_for_period(m(2024, 1), m(2024, 3), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_period_end_covers_its_whole_month() {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_active_between()
            .withf(|filter, from, until| {
                filter == &SubscriptionFilter::default()
                    && *from == m(2024, 2).first_instant()
                    && *until == m(2024, 3).first_instant() - chrono::TimeDelta::microseconds(1)
            })
            .times(1)
            .returning(|_, _, _| Ok(Vec::new()));
        let agg = MonthlyCostAggregator::new(Arc::new(repo));

        let total = agg
            .total_for_period(m(2024, 2), m(2024, 2), Some(""), Some(""))
            .await
            .unwrap();
        assert_eq!(total, 0);
    }
}
