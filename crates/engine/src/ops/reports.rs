//! Monthly report aggregation.
//!
//! Totals are summed in integer cents over the scoped rows of one calendar
//! month; conversion to decimals is left to the caller.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::{QueryFilter, QuerySelect, prelude::*};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine, Transaction, TransactionKind, companies, users,
    util::parse_uuid,
};

use super::{Actor, Engine, TransactionListFilter, transactions::scoped_query};

pub(crate) const LATEST_LIMIT: u64 = 5;
const MIN_YEAR: i32 = 2000;
const MAX_YEAR: i32 = 2100;

/// A validated calendar month.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub month_name: String,
}

impl Period {
    /// Validates `year` in `[2000, 2100]` and `month` in `[1, 12]`.
    pub fn new(year: i32, month: u32) -> ResultEngine<Period> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(EngineError::InvalidPeriod(format!(
                "year must be between {MIN_YEAR} and {MAX_YEAR}"
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(EngineError::InvalidPeriod(
                "month must be between 1 and 12".to_string(),
            ));
        }
        let invalid = || EngineError::InvalidPeriod(format!("invalid month {year}-{month:02}"));
        let start_date = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;
        let end_date = next.pred_opt().ok_or_else(invalid)?;
        Ok(Period {
            year,
            month,
            start_date,
            end_date,
            month_name: start_date.format("%B").to_string(),
        })
    }

    /// Fills missing parts from `today`, then validates.
    pub fn resolve(year: Option<i32>, month: Option<u32>, today: NaiveDate) -> ResultEngine<Period> {
        Period::new(year.unwrap_or(today.year()), month.unwrap_or(today.month()))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total_income: MoneyCents,
    pub total_expenses: MoneyCents,
    pub balance: MoneyCents,
    pub transaction_count: u64,
}

impl Totals {
    fn push(&mut self, tx: &Transaction) {
        match tx.kind {
            TransactionKind::Income => self.total_income += tx.amount,
            TransactionKind::Expense => self.total_expenses += tx.amount,
        }
        self.balance = self.total_income - self.total_expenses;
        self.transaction_count += 1;
    }

    pub fn from_transactions<'a>(rows: impl IntoIterator<Item = &'a Transaction>) -> Totals {
        let mut totals = Totals::default();
        for tx in rows {
            totals.push(tx);
        }
        totals
    }
}

/// `{id, name}` reference to a user or company.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PartyRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub transaction: Transaction,
    pub user: Option<PartyRef>,
    pub company: Option<PartyRef>,
}

/// Aggregates for one company; `company` is `None` for personal rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompanyBreakdown {
    pub company: Option<PartyRef>,
    pub totals: Totals,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MonthlyReport {
    pub period: Period,
    pub summary: Totals,
    pub latest_transactions: Vec<ReportEntry>,
    /// Only filled for AdminMaster and CompanyAdmin.
    pub company_breakdown: Vec<CompanyBreakdown>,
}

/// Groups rows by company. Personal rows come first, then companies in id
/// order.
fn group_by_company(rows: &[Transaction]) -> BTreeMap<Option<Uuid>, Totals> {
    let mut groups: BTreeMap<Option<Uuid>, Totals> = BTreeMap::new();
    for tx in rows {
        groups.entry(tx.company_id).or_default().push(tx);
    }
    groups
}

impl Engine {
    /// Builds the report for one month, defaulting to the current one.
    pub async fn monthly_report(
        &self,
        actor: &Actor,
        year: Option<i32>,
        month: Option<u32>,
    ) -> ResultEngine<MonthlyReport> {
        let scope = actor.scope();
        scope.ensure_configured()?;
        let period = Period::resolve(year, month, Utc::now().date_naive())?;

        let in_month = TransactionListFilter {
            start_date: Some(period.start_date),
            end_date: Some(period.end_date),
            ..TransactionListFilter::default()
        };
        let rows = scoped_query(&scope, &in_month, false)?
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        let summary = Totals::from_transactions(&rows);

        let latest = scoped_query(&scope, &TransactionListFilter::default(), false)?
            .limit(LATEST_LIMIT)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        let is_admin = actor.role.is_some_and(|r| r.is_admin());
        let groups = if is_admin {
            group_by_company(&rows)
        } else {
            BTreeMap::new()
        };

        let user_ids = latest.iter().map(|tx| tx.user_id);
        let company_ids = latest
            .iter()
            .filter_map(|tx| tx.company_id)
            .chain(groups.keys().flatten().copied());
        let user_names = self.user_names(user_ids).await?;
        let company_names = self.company_names(company_ids).await?;

        let party = |names: &HashMap<Uuid, String>, id: Uuid| {
            names.get(&id).map(|name| PartyRef {
                id,
                name: name.clone(),
            })
        };
        let latest_transactions = latest
            .into_iter()
            .map(|tx| ReportEntry {
                user: party(&user_names, tx.user_id),
                company: tx.company_id.and_then(|id| party(&company_names, id)),
                transaction: tx,
            })
            .collect();
        let company_breakdown = groups
            .into_iter()
            .map(|(company_id, totals)| CompanyBreakdown {
                company: company_id.and_then(|id| party(&company_names, id)),
                totals,
            })
            .collect();

        debug!(
            actor = %actor.id,
            year = period.year,
            month = period.month,
            count = summary.transaction_count,
            "monthly report generated"
        );
        Ok(MonthlyReport {
            period,
            summary,
            latest_transactions,
            company_breakdown,
        })
    }

    /// Names for the given users, soft-deleted ones included.
    async fn user_names(
        &self,
        ids: impl Iterator<Item = Uuid>,
    ) -> ResultEngine<HashMap<Uuid, String>> {
        let ids: Vec<String> = ids.map(|id| id.to_string()).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        users::Entity::find()
            .filter(users::Column::Id.is_in(ids))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|m| parse_uuid(&m.id, "user").map(|id| (id, m.name)))
            .collect()
    }

    async fn company_names(
        &self,
        ids: impl Iterator<Item = Uuid>,
    ) -> ResultEngine<HashMap<Uuid, String>> {
        let ids: Vec<String> = ids.map(|id| id.to_string()).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        companies::Entity::find()
            .filter(companies::Column::Id.is_in(ids))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|m| parse_uuid(&m.id, "company").map(|id| (id, m.name)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_bounds_cover_the_whole_month() {
        let feb = Period::new(2024, 2).unwrap();
        assert_eq!(feb.start_date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(feb.end_date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(feb.month_name, "February");

        let dec = Period::new(2100, 12).unwrap();
        assert_eq!(dec.end_date, NaiveDate::from_ymd_opt(2100, 12, 31).unwrap());
    }

    #[test]
    fn period_rejects_out_of_range_values() {
        assert!(matches!(Period::new(1999, 5), Err(EngineError::InvalidPeriod(_))));
        assert!(matches!(Period::new(2101, 5), Err(EngineError::InvalidPeriod(_))));
        assert!(matches!(Period::new(2024, 0), Err(EngineError::InvalidPeriod(_))));
        assert!(matches!(Period::new(2024, 13), Err(EngineError::InvalidPeriod(_))));
    }

    #[test]
    fn period_defaults_to_today() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();
        let period = Period::resolve(None, None, today).unwrap();
        assert_eq!((period.year, period.month), (2025, 7));
        let period = Period::resolve(Some(2024), None, today).unwrap();
        assert_eq!((period.year, period.month), (2024, 7));
    }
}
