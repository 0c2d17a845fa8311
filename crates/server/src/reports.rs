//! Monthly report endpoint

use api_types::report::{
    CompanyBreakdown, MonthlyReport, PartyRef, Period, ReportEntry, ReportQuery, Summary,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use engine::{Actor, EngineError, Totals};

use crate::{ServerError, server::ServerState, transactions::map_kind};

fn summary(totals: &Totals) -> Summary {
    Summary {
        total_income: totals.total_income.to_major(),
        total_expenses: totals.total_expenses.to_major(),
        balance: totals.balance.to_major(),
        transaction_count: totals.transaction_count,
    }
}

fn party(party: engine::PartyRef) -> PartyRef {
    PartyRef {
        id: party.id,
        name: party.name,
    }
}

fn entry(entry: engine::ReportEntry) -> ReportEntry {
    let tx = entry.transaction;
    ReportEntry {
        id: tx.id,
        kind: map_kind(tx.kind),
        category: tx.category,
        description: tx.description,
        amount: tx.amount.to_string(),
        date: tx.date,
        user: entry.user.map(party),
        company: entry.company.map(party),
    }
}

/// Parses an optional numeric query value; anything unparsable is an
/// invalid period.
fn parse_param<T: std::str::FromStr>(
    value: Option<&str>,
    label: &str,
) -> Result<Option<T>, EngineError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| EngineError::InvalidPeriod(format!("invalid {label}: {raw}"))),
    }
}

pub async fn monthly(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<MonthlyReport>, ServerError> {
    let year = parse_param::<i32>(query.year.as_deref(), "year")?;
    let month = parse_param::<u32>(query.month.as_deref(), "month")?;
    let report = state.engine.monthly_report(&actor, year, month).await?;

    Ok(Json(MonthlyReport {
        period: Period {
            year: report.period.year,
            month: report.period.month,
            start_date: report.period.start_date,
            end_date: report.period.end_date,
            month_name: report.period.month_name,
        },
        summary: summary(&report.summary),
        latest_transactions: report.latest_transactions.into_iter().map(entry).collect(),
        company_breakdown: report
            .company_breakdown
            .into_iter()
            .map(|group| CompanyBreakdown {
                company: group.company.map(party),
                summary: summary(&group.totals),
            })
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use engine::MoneyCents;

    use super::*;

    #[test]
    fn summary_reports_major_units() {
        let totals = Totals {
            total_income: MoneyCents::new(300_000),
            total_expenses: MoneyCents::new(90_050),
            balance: MoneyCents::new(209_950),
            transaction_count: 4,
        };
        let out = summary(&totals);
        assert_eq!(out.total_income, 3000.0);
        assert_eq!(out.total_expenses, 900.5);
        assert_eq!(out.balance, 2099.5);
        assert_eq!(out.transaction_count, 4);
    }

    #[test]
    fn bad_year_or_month_is_an_invalid_period() {
        assert_eq!(parse_param::<i32>(Some("2024"), "year").unwrap(), Some(2024));
        assert_eq!(parse_param::<i32>(None, "year").unwrap(), None);
        for raw in ["abc", "99999999999", "2024.5"] {
            assert!(matches!(
                parse_param::<i32>(Some(raw), "year"),
                Err(EngineError::InvalidPeriod(_))
            ));
        }
        assert!(matches!(
            parse_param::<u32>(Some("-1"), "month"),
            Err(EngineError::InvalidPeriod(_))
        ));
    }
}
