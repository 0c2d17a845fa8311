use chrono::NaiveDate;
use sea_orm::{PaginatorTrait, QueryFilter, QueryOrder, Select, prelude::*};
use tracing::debug;
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine, Transaction, TransactionKind, transactions,
    util::{contains_pattern, normalize_optional_text},
};

use super::super::{Actor, Engine, Page, Scope, page_bounds};

/// Filters for listing transactions.
///
/// Every filter narrows the actor's scope; none can widen it. Date and
/// amount bounds are inclusive.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub kind: Option<TransactionKind>,
    /// Substring match.
    pub category: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub min_amount: Option<MoneyCents>,
    pub max_amount: Option<MoneyCents>,
    pub user_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    /// Includes soft-deleted rows. Honoured only for AdminMaster.
    pub include_trashed: bool,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date)
        && start > end
    {
        return Err(EngineError::InvalidDate(
            "start_date must not be after end_date".to_string(),
        ));
    }
    if let (Some(min), Some(max)) = (filter.min_amount, filter.max_amount)
        && min > max
    {
        return Err(EngineError::InvalidAmount(
            "min_amount must not exceed max_amount".to_string(),
        ));
    }
    Ok(())
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter, with_trashed: bool) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter, with_trashed: bool) -> Self {
        if !with_trashed {
            self = self.filter(transactions::Column::DeletedAt.is_null());
        }
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(category) = normalize_optional_text(filter.category.as_deref()) {
            self = self.filter(transactions::Column::Category.like(contains_pattern(&category)));
        }
        if let Some(start) = filter.start_date {
            self = self.filter(transactions::Column::Date.gte(start));
        }
        if let Some(end) = filter.end_date {
            self = self.filter(transactions::Column::Date.lte(end));
        }
        if let Some(min) = filter.min_amount {
            self = self.filter(transactions::Column::AmountMinor.gte(min.cents()));
        }
        if let Some(max) = filter.max_amount {
            self = self.filter(transactions::Column::AmountMinor.lte(max.cents()));
        }
        if let Some(user_id) = filter.user_id {
            self = self.filter(transactions::Column::UserId.eq(user_id.to_string()));
        }
        if let Some(company_id) = filter.company_id {
            self = self.filter(transactions::Column::CompanyId.eq(company_id.to_string()));
        }
        self
    }
}

/// Builds the ordered query for `scope` narrowed by `filter`.
///
/// Ordering is `date DESC, created_at DESC, id DESC`, total so pages are
/// stable.
pub(in crate::ops) fn scoped_query(
    scope: &Scope,
    filter: &TransactionListFilter,
    with_trashed: bool,
) -> ResultEngine<Select<transactions::Entity>> {
    validate_list_filter(filter)?;
    let query = transactions::Entity::find()
        .filter(scope.condition()?)
        .apply_tx_filters(filter, with_trashed)
        .order_by_desc(transactions::Column::Date)
        .order_by_desc(transactions::Column::CreatedAt)
        .order_by_desc(transactions::Column::Id);
    Ok(query)
}

impl Engine {
    /// Lists the transactions visible to the actor, newest first.
    pub async fn list_transactions(
        &self,
        actor: &Actor,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Page<Transaction>> {
        let scope = actor.scope();
        let with_trashed =
            filter.include_trashed && actor.role.is_some_and(|r| r.is_master_admin());
        let query = scoped_query(&scope, filter, with_trashed)?;
        let (page, per_page) = page_bounds(filter.page, filter.per_page);

        let paginator = query.paginate(&self.database, per_page);
        let total = paginator.num_items().await?;
        let items = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        debug!(actor = %actor.id, page, per_page, total, "transactions listed");
        Ok(Page::new(items, page, per_page, total))
    }
}
