use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::ResultEngine;

mod access;
mod addresses;
mod companies;
mod memberships;
mod reports;
mod transactions;
mod users;

pub use access::{Actor, Scope};
pub use companies::CompanyListFilter;
pub use reports::{CompanyBreakdown, MonthlyReport, PartyRef, Period, ReportEntry, Totals};
pub use transactions::TransactionListFilter;
pub use users::UserListFilter;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

pub(crate) const DEFAULT_PER_PAGE: u64 = 15;
pub(crate) const MAX_PER_PAGE: u64 = 100;

/// One page of an ordered listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
}

impl<T> Page<T> {
    pub(crate) fn new(items: Vec<T>, page: u64, per_page: u64, total: u64) -> Self {
        Self {
            items,
            page,
            per_page,
            total,
            last_page: last_page(total, per_page),
        }
    }

    pub(crate) fn empty(page: u64, per_page: u64) -> Self {
        Self::new(Vec::new(), page, per_page, 0)
    }
}

/// Normalizes user supplied paging: pages start at 1, size defaults to 15
/// and is clamped to `[1, 100]`.
pub(crate) fn page_bounds(page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

pub(crate) fn last_page(total: u64, per_page: u64) -> u64 {
    total.div_ceil(per_page).max(1)
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
