use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::month::BillingMonth;
use crate::error::StoreError;

/// Upper bound on rows returned by a single list call.
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Writable fields of a subscription, as supplied on create and full update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewSubscription {
    #[validate(length(min = 1))]
    pub service_name: String,
    /// Price per active month
    #[validate(range(min = 1))]
    pub price: i64,
    pub user_id: Uuid,
    pub start: BillingMonth,
    /// Inclusive last billed month; `None` while still active
    pub end: Option<BillingMonth>,
}

/// A persisted subscription record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub service_name: String,
    pub price: i64,
    pub user_id: Uuid,
    pub start: BillingMonth,
    pub end: Option<BillingMonth>,
}

impl Subscription {
    pub fn from_new(id: i64, new: NewSubscription) -> Self {
        Self {
            id,
            service_name: new.service_name,
            price: new.price,
            user_id: new.user_id,
            start: new.start,
            end: new.end,
        }
    }

    /// Inclusive billed range, with open-ended subscriptions capped at
    /// [`BillingMonth::FAR_FUTURE`].
    pub fn active_range(&self) -> (BillingMonth, BillingMonth) {
        (self.start, self.end.unwrap_or(BillingMonth::FAR_FUTURE))
    }
}

impl From<Subscription> for NewSubscription {
    fn from(sub: Subscription) -> Self {
        Self {
            service_name: sub.service_name,
            price: sub.price,
            user_id: sub.user_id,
            start: sub.start,
            end: sub.end,
        }
    }
}

/// Optional equality filters shared by listing and cost aggregation.
///
/// Both filters are exact matches; `service_name` is case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub user_id: Option<Uuid>,
    pub service_name: Option<String>,
}

impl SubscriptionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Empty names are treated as "no filter".
    pub fn service(mut self, service_name: impl Into<String>) -> Self {
        let name = service_name.into();
        self.service_name = (!name.is_empty()).then_some(name);
        self
    }

    /// Build a filter from raw caller input.
    ///
    /// Blank values are dropped. A non-blank user id that is not a UUID is
    /// rejected with [`StoreError::InvalidFilter`].
    pub fn parse(user_id: Option<&str>, service_name: Option<&str>) -> Result<Self, StoreError> {
        let user_id = match user_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                Uuid::parse_str(raw)
                    .map_err(|e| StoreError::InvalidFilter(format!("user_id {raw:?}: {e}")))?,
            ),
            None => None,
        };

        let service_name = service_name
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            user_id,
            service_name,
        })
    }

    pub fn matches(&self, sub: &Subscription) -> bool {
        self.user_id.map_or(true, |u| sub.user_id == u)
            && self
                .service_name
                .as_deref()
                .map_or(true, |name| sub.service_name == name)
    }
}

/// Pagination request for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// `None` means no limit; otherwise clamped to [`MAX_PAGE_LIMIT`].
    pub fn effective_limit(&self) -> Option<u64> {
        (self.limit > 0).then(|| self.limit.min(MAX_PAGE_LIMIT) as u64)
    }

    pub fn effective_offset(&self) -> Option<u64> {
        (self.offset > 0).then_some(self.offset as u64)
    }
}
