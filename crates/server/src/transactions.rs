//! Transactions API endpoints

use api_types::{
    amount::AmountInput,
    page::Page,
    transaction::{
        TransactionKind as ApiKind, TransactionListQuery, TransactionNew, TransactionUpdate,
        TransactionView,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{Actor, EngineError, MoneyCents, NewTransaction, TransactionListFilter, TransactionPatch};
use uuid::Uuid;

use crate::{ServerError, page_view, server::ServerState};

pub(crate) fn map_kind(kind: engine::TransactionKind) -> ApiKind {
    match kind {
        engine::TransactionKind::Income => ApiKind::Income,
        engine::TransactionKind::Expense => ApiKind::Expense,
    }
}

fn engine_kind(kind: ApiKind) -> engine::TransactionKind {
    match kind {
        ApiKind::Income => engine::TransactionKind::Income,
        ApiKind::Expense => engine::TransactionKind::Expense,
    }
}

fn parse_amount(raw: &str) -> Result<MoneyCents, EngineError> {
    raw.parse::<MoneyCents>()
}

fn amount_input(input: &AmountInput) -> Result<MoneyCents, EngineError> {
    parse_amount(&input.as_decimal())
}

pub(crate) fn view(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        user_id: tx.user_id,
        company_id: tx.company_id,
        kind: map_kind(tx.kind),
        category: tx.category,
        description: tx.description,
        amount: tx.amount.to_string(),
        date: tx.date,
        created_at: tx.created_at,
        updated_at: tx.updated_at,
        deleted_at: tx.deleted_at,
    }
}

fn list_filter(query: TransactionListQuery) -> Result<TransactionListFilter, EngineError> {
    Ok(TransactionListFilter {
        kind: query.kind.map(engine_kind),
        category: query.category,
        start_date: query.start_date,
        end_date: query.end_date,
        min_amount: query.min_amount.as_deref().map(parse_amount).transpose()?,
        max_amount: query.max_amount.as_deref().map(parse_amount).transpose()?,
        user_id: query.user_id,
        company_id: query.company_id,
        include_trashed: query.include_trashed.unwrap_or(false),
        page: query.page,
        per_page: query.per_page,
    })
}

pub async fn list(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<Page<TransactionView>>, ServerError> {
    let filter = list_filter(query)?;
    let page = state.engine.list_transactions(&actor, &filter).await?;
    Ok(Json(page_view(page, view)))
}

pub async fn create(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let cmd = NewTransaction {
        kind: engine_kind(payload.kind),
        amount: amount_input(&payload.amount)?,
        date: payload.date,
        category: payload.category,
        description: payload.description,
        user_id: payload.user_id,
        company_id: payload.company_id,
    };
    let tx = state.engine.create_transaction(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(view(tx))))
}

pub async fn show(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.show_transaction(&actor, id).await?;
    Ok(Json(view(tx)))
}

pub async fn update(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    let patch = TransactionPatch {
        kind: payload.kind.map(engine_kind),
        amount: payload.amount.as_ref().map(amount_input).transpose()?,
        date: payload.date,
        category: payload.category,
        description: payload.description,
        user_id: payload.user_id,
        company_id: payload.company_id,
    };
    let tx = state.engine.update_transaction(&actor, id, patch).await?;
    Ok(Json(view(tx)))
}

pub async fn delete(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_transaction(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_inputs_parse_to_cents() {
        let number: AmountInput = serde_json::from_str("150.5").unwrap();
        assert_eq!(amount_input(&number).unwrap(), MoneyCents::new(15050));
        let text = AmountInput::Text("0.01".to_string());
        assert_eq!(amount_input(&text).unwrap(), MoneyCents::new(1));
        let precise = AmountInput::Text("1.234".to_string());
        assert!(amount_input(&precise).is_err());
    }
}
