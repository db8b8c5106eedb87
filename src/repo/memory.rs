use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::SubscriptionRepository;
use crate::domain::{NewSubscription, Page, Subscription, SubscriptionFilter};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    rows: BTreeMap<i64, Subscription>,
}

/// Process-local store with the same observable semantics as the SQL
/// backend. Ids start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionRepository {
    state: RwLock<State>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn create(&self, sub: &NewSubscription) -> Result<i64, StoreError> {
        let mut st = self.state.write().await;
        st.next_id += 1;
        let id = st.next_id;
        st.rows.insert(id, Subscription::from_new(id, sub.clone()));
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Subscription, StoreError> {
        self.state
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { id })
    }

    async fn update(&self, id: i64, sub: &NewSubscription) -> Result<(), StoreError> {
        let mut st = self.state.write().await;
        let row = st.rows.get_mut(&id).ok_or(StoreError::NotFound { id })?;
        *row = Subscription::from_new(id, sub.clone());
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { id })
    }

    async fn list(
        &self,
        filter: &SubscriptionFilter,
        page: Page,
    ) -> Result<Vec<Subscription>, StoreError> {
        let st = self.state.read().await;
        let matching = st.rows.values().rev().filter(|s| filter.matches(s));
        let skipped = matching.skip(page.effective_offset().unwrap_or(0) as usize);
        let out = match page.effective_limit() {
            Some(limit) => skipped.take(limit as usize).cloned().collect(),
            None => skipped.cloned().collect(),
        };
        Ok(out)
    }

    async fn active_between(
        &self,
        filter: &SubscriptionFilter,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Vec<Subscription>, StoreError> {
        let st = self.state.read().await;
        Ok(st
            .rows
            .values()
            .rev()
            .filter(|s| s.start.first_instant() <= until)
            .filter(|s| s.end.map_or(true, |end| end.first_instant() >= from))
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }
}
