use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, TransactionTrait, prelude::*};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    EngineError, NewTransaction, ResultEngine, Transaction, TransactionPatch,
    transactions::{self, ensure_not_future},
    util::{ensure_max_len, normalize_optional_text},
};

use super::{Actor, Engine, with_tx};

mod list;

pub use list::TransactionListFilter;
pub(super) use list::scoped_query;

const CATEGORY_MAX: usize = 255;
const DESCRIPTION_MAX: usize = 1000;

fn validate_text_fields(category: Option<&str>, description: Option<&str>) -> ResultEngine<()> {
    ensure_max_len(category, CATEGORY_MAX, "category")?;
    ensure_max_len(description, DESCRIPTION_MAX, "description")
}

/// Loads a transaction that is not soft-deleted.
async fn find_live<C: ConnectionTrait>(db: &C, id: Uuid) -> ResultEngine<transactions::Model> {
    transactions::Entity::find_by_id(id.to_string())
        .filter(transactions::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))
}

impl Engine {
    /// Records a new transaction.
    ///
    /// The owner defaults to the actor and the company is resolved from the
    /// actor's memberships when not given.
    pub async fn create_transaction(
        &self,
        actor: &Actor,
        cmd: NewTransaction,
    ) -> ResultEngine<Transaction> {
        actor.scope().ensure_configured()?;
        let user_id = actor.resolve_owner_for_create(cmd.user_id)?;
        let company_id = actor.resolve_company_for_create(cmd.company_id)?;

        let category = normalize_optional_text(cmd.category.as_deref());
        let description = normalize_optional_text(cmd.description.as_deref());
        validate_text_fields(category.as_deref(), description.as_deref())?;

        let tx = Transaction::new(
            user_id,
            company_id,
            cmd.kind,
            category,
            description,
            cmd.amount,
            cmd.date,
            Utc::now(),
        )?;

        with_tx!(self, |db_tx| {
            if user_id != actor.id {
                self.require_user(&db_tx, user_id).await?;
            }
            if let Some(company_id) = company_id {
                self.require_company(&db_tx, company_id).await?;
            }
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            info!(
                actor = %actor.id,
                transaction = %tx.id,
                kind = tx.kind.as_str(),
                company = ?tx.company_id,
                "transaction created"
            );
            Ok(tx)
        })
    }

    /// Returns a transaction the actor may see.
    pub async fn show_transaction(&self, actor: &Actor, id: Uuid) -> ResultEngine<Transaction> {
        let scope = actor.scope();
        scope.ensure_configured()?;
        let tx = Transaction::try_from(find_live(&self.database, id).await?)?;
        scope.authorize(&tx)?;
        Ok(tx)
    }

    /// Applies a partial update.
    ///
    /// Ownership fields are silently dropped for anyone but AdminMaster; the
    /// remaining fields still apply.
    pub async fn update_transaction(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: TransactionPatch,
    ) -> ResultEngine<Transaction> {
        let scope = actor.scope();
        scope.ensure_configured()?;
        let patch = actor.gate_patch(patch)?;

        with_tx!(self, |db_tx| {
            let model = find_live(&db_tx, id).await?;
            let current = Transaction::try_from(model.clone())?;
            scope.authorize(&current)?;

            let now = Utc::now();
            let mut active: transactions::ActiveModel = model.into();
            if let Some(kind) = patch.kind {
                active.kind = ActiveValue::Set(kind.as_str().to_string());
            }
            if let Some(amount) = patch.amount {
                let amount = amount.ensure_transaction_range()?;
                active.amount_minor = ActiveValue::Set(amount.cents());
            }
            if let Some(date) = patch.date {
                ensure_not_future(date, now.date_naive())?;
                active.date = ActiveValue::Set(date);
            }
            if let Some(category) = normalize_optional_text(patch.category.as_deref()) {
                validate_text_fields(Some(&category), None)?;
                active.category = ActiveValue::Set(Some(category));
            }
            if let Some(description) = normalize_optional_text(patch.description.as_deref()) {
                validate_text_fields(None, Some(&description))?;
                active.description = ActiveValue::Set(Some(description));
            }
            if let Some(user_id) = patch.user_id {
                self.require_user(&db_tx, user_id).await?;
                active.user_id = ActiveValue::Set(user_id.to_string());
            }
            if let Some(company_id) = patch.company_id {
                self.require_company(&db_tx, company_id).await?;
                active.company_id = ActiveValue::Set(Some(company_id.to_string()));
            }
            active.updated_at = ActiveValue::Set(now);

            let model = active.update(&db_tx).await?;
            debug!(actor = %actor.id, transaction = %id, "transaction updated");
            Transaction::try_from(model)
        })
    }

    /// Soft-deletes a transaction the actor may touch.
    pub async fn delete_transaction(&self, actor: &Actor, id: Uuid) -> ResultEngine<()> {
        let scope = actor.scope();
        scope.ensure_configured()?;

        with_tx!(self, |db_tx| {
            let model = find_live(&db_tx, id).await?;
            scope.authorize(&Transaction::try_from(model.clone())?)?;

            let now = Utc::now();
            let mut active: transactions::ActiveModel = model.into();
            active.deleted_at = ActiveValue::Set(Some(now));
            active.updated_at = ActiveValue::Set(now);
            active.update(&db_tx).await?;
            info!(actor = %actor.id, transaction = %id, "transaction deleted");
            Ok(())
        })
    }
}
