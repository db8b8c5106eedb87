//! Statement construction for the `subscriptions` table.
//!
//! Every caller-supplied value ends up in the statement's bound values;
//! the SQL text only ever contains identifiers and placeholders.

use chrono::NaiveDateTime;
use sea_query::{
    Cond, DeleteStatement, Expr, Iden, InsertStatement, Order, Query, SelectStatement,
    UpdateStatement,
};

use crate::domain::{NewSubscription, Page, SubscriptionFilter};
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, Iden)]
pub enum Subscriptions {
    Table,
    Id,
    ServiceName,
    Price,
    UserId,
    StartDate,
    EndDate,
}

const COLUMNS: [Subscriptions; 6] = [
    Subscriptions::Id,
    Subscriptions::ServiceName,
    Subscriptions::Price,
    Subscriptions::UserId,
    Subscriptions::StartDate,
    Subscriptions::EndDate,
];

impl SubscriptionFilter {
    /// Equality predicates for whichever filters are present, AND-ed.
    pub fn condition(&self) -> Cond {
        self.and_into(Cond::all())
    }

    fn and_into(&self, cond: Cond) -> Cond {
        cond.add_option(self.user_id.map(|u| Expr::col(Subscriptions::UserId).eq(u)))
            .add_option(
                self.service_name
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .map(|s| Expr::col(Subscriptions::ServiceName).eq(s)),
            )
    }
}

pub fn insert(sub: &NewSubscription) -> Result<InsertStatement, StoreError> {
    let mut stmt = Query::insert();
    stmt.into_table(Subscriptions::Table)
        .columns([
            Subscriptions::ServiceName,
            Subscriptions::Price,
            Subscriptions::UserId,
            Subscriptions::StartDate,
            Subscriptions::EndDate,
        ])
        .values([
            sub.service_name.clone().into(),
            sub.price.into(),
            sub.user_id.into(),
            sub.start.first_instant().into(),
            sub.end.map(|m| m.first_instant()).into(),
        ])?
        .returning_col(Subscriptions::Id);
    Ok(stmt)
}

pub fn select_by_id(id: i64) -> SelectStatement {
    Query::select()
        .columns(COLUMNS)
        .from(Subscriptions::Table)
        .and_where(Expr::col(Subscriptions::Id).eq(id))
        .to_owned()
}

/// Overwrites every mutable column of the row keyed by `id`.
pub fn update(id: i64, sub: &NewSubscription) -> UpdateStatement {
    Query::update()
        .table(Subscriptions::Table)
        .values([
            (Subscriptions::ServiceName, sub.service_name.clone().into()),
            (Subscriptions::Price, sub.price.into()),
            (Subscriptions::UserId, sub.user_id.into()),
            (Subscriptions::StartDate, sub.start.first_instant().into()),
            (
                Subscriptions::EndDate,
                sub.end.map(|m| m.first_instant()).into(),
            ),
        ])
        .and_where(Expr::col(Subscriptions::Id).eq(id))
        .to_owned()
}

pub fn delete(id: i64) -> DeleteStatement {
    Query::delete()
        .from_table(Subscriptions::Table)
        .and_where(Expr::col(Subscriptions::Id).eq(id))
        .to_owned()
}

/// Filtered listing, newest first.
pub fn list(filter: &SubscriptionFilter, page: Page) -> SelectStatement {
    let mut stmt = Query::select();
    stmt.columns(COLUMNS).from(Subscriptions::Table);
    let cond = filter.condition();
    if !cond.is_empty() {
        stmt.cond_where(cond);
    }
    stmt.order_by(Subscriptions::Id, Order::Desc);
    if let Some(limit) = page.effective_limit() {
        stmt.limit(limit);
    }
    if let Some(offset) = page.effective_offset() {
        stmt.offset(offset);
    }
    stmt
}

/// Subscriptions whose active range can touch `[from, until]`.
///
/// Coarse on purpose: exact month overlap is computed by the caller.
pub fn active_between(
    filter: &SubscriptionFilter,
    from: NaiveDateTime,
    until: NaiveDateTime,
) -> SelectStatement {
    Query::select()
        .columns(COLUMNS)
        .from(Subscriptions::Table)
        .cond_where(
            filter.and_into(
                Cond::all()
                    .add(Expr::col(Subscriptions::StartDate).lte(until))
                    .add(
                        Cond::any()
                            .add(Expr::col(Subscriptions::EndDate).is_null())
                            .add(Expr::col(Subscriptions::EndDate).gte(from)),
                    ),
            ),
        )
        .order_by(Subscriptions::Id, Order::Desc)
        .to_owned()
}
