use chrono::Utc;
use sea_orm::{
    ActiveValue, Condition, ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait, prelude::*,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    Company, CompanyPatch, EngineError, NewCompany, ResultEngine, companies,
    util::{contains_pattern, ensure_max_len, normalize_optional_text, normalize_required_text},
};

use super::{Actor, Engine, Page, page_bounds, with_tx};

/// Filters for listing companies.
#[derive(Clone, Debug, Default)]
pub struct CompanyListFilter {
    /// Substring matched against name or CNPJ.
    pub search: Option<String>,
    /// Honoured only for AdminMaster.
    pub include_trashed: bool,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

fn validate_company_fields(name: Option<&str>, cnpj: Option<&str>) -> ResultEngine<()> {
    ensure_max_len(name, 255, "name")?;
    ensure_max_len(cnpj, 18, "cnpj")
}

/// CNPJs are unique across every company, removed ones included.
async fn ensure_cnpj_free<C: ConnectionTrait>(
    db: &C,
    cnpj: &str,
    except: Option<Uuid>,
) -> ResultEngine<()> {
    let mut query = companies::Entity::find().filter(companies::Column::Cnpj.eq(cnpj));
    if let Some(id) = except {
        query = query.filter(companies::Column::Id.ne(id.to_string()));
    }
    if query.one(db).await?.is_some() {
        return Err(EngineError::ExistingKey(format!("cnpj {cnpj}")));
    }
    Ok(())
}

/// Validates and stores a new company on `db`.
pub(super) async fn insert_company<C: ConnectionTrait>(
    db: &C,
    cmd: NewCompany,
) -> ResultEngine<Company> {
    let name = normalize_required_text(&cmd.name, "company name")?;
    let cnpj = normalize_required_text(&cmd.cnpj, "cnpj")?;
    validate_company_fields(Some(&name), Some(&cnpj))?;
    let email = normalize_optional_text(cmd.email.as_deref());
    ensure_max_len(email.as_deref(), 255, "email")?;
    let phone = normalize_optional_text(cmd.phone.as_deref());
    ensure_max_len(phone.as_deref(), 20, "phone")?;
    ensure_cnpj_free(db, &cnpj, None).await?;

    let now = Utc::now();
    let company = Company {
        id: Uuid::new_v4(),
        name,
        cnpj,
        email,
        phone,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    companies::ActiveModel::from(&company).insert(db).await?;
    Ok(company)
}

impl Engine {
    pub(super) async fn require_company<C: ConnectionTrait>(
        &self,
        db: &C,
        company_id: Uuid,
    ) -> ResultEngine<companies::Model> {
        companies::Entity::find_by_id(company_id.to_string())
            .filter(companies::Column::DeletedAt.is_null())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("company not exists".to_string()))
    }

    /// Creates a company (AdminMaster only).
    pub async fn create_company(&self, actor: &Actor, cmd: NewCompany) -> ResultEngine<Company> {
        actor.require_master_admin()?;
        with_tx!(self, |db_tx| {
            let company = insert_company(&db_tx, cmd).await?;
            info!(actor = %actor.id, company = %company.id, "company created");
            Ok(company)
        })
    }

    /// Shows a company to AdminMaster or to one of its members.
    ///
    /// Non-members are refused before the lookup, so they cannot tell
    /// existing ids from missing ones.
    pub async fn show_company(&self, actor: &Actor, company_id: Uuid) -> ResultEngine<Company> {
        self.require_company_reader(actor, company_id)?;
        let model = self.require_company(&self.database, company_id).await?;
        Company::try_from(model)
    }

    pub(super) fn require_company_reader(
        &self,
        actor: &Actor,
        company_id: Uuid,
    ) -> ResultEngine<()> {
        let role = actor.role()?;
        if !role.is_master_admin() && !actor.belongs_to(company_id) {
            warn!(actor = %actor.id, %company_id, "company access denied");
            return Err(EngineError::Forbidden(
                "not a member of this company".to_string(),
            ));
        }
        Ok(())
    }

    /// Lists companies: everything for AdminMaster, own memberships otherwise.
    pub async fn list_companies(
        &self,
        actor: &Actor,
        filter: &CompanyListFilter,
    ) -> ResultEngine<Page<Company>> {
        let role = actor.role()?;
        let (page, per_page) = page_bounds(filter.page, filter.per_page);

        let mut query = companies::Entity::find()
            .order_by_asc(companies::Column::Name)
            .order_by_asc(companies::Column::Id);
        if !(role.is_master_admin() && filter.include_trashed) {
            query = query.filter(companies::Column::DeletedAt.is_null());
        }
        if !role.is_master_admin() {
            if actor.company_ids.is_empty() {
                return Ok(Page::empty(page, per_page));
            }
            query = query.filter(
                companies::Column::Id.is_in(actor.company_ids.iter().map(ToString::to_string)),
            );
        }
        if let Some(search) = normalize_optional_text(filter.search.as_deref()) {
            query = query.filter(
                Condition::any()
                    .add(companies::Column::Name.like(contains_pattern(&search)))
                    .add(companies::Column::Cnpj.like(contains_pattern(&search))),
            );
        }

        let paginator = query.paginate(&self.database, per_page);
        let total = paginator.num_items().await?;
        let items = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(Company::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        Ok(Page::new(items, page, per_page, total))
    }

    /// Updates a company (AdminMaster only). Unset fields stay untouched.
    pub async fn update_company(
        &self,
        actor: &Actor,
        company_id: Uuid,
        patch: CompanyPatch,
    ) -> ResultEngine<Company> {
        actor.require_master_admin()?;
        let name = patch
            .name
            .as_deref()
            .map(|n| normalize_required_text(n, "company name"))
            .transpose()?;
        let cnpj = normalize_optional_text(patch.cnpj.as_deref());
        validate_company_fields(name.as_deref(), cnpj.as_deref())?;

        with_tx!(self, |db_tx| {
            let model = self.require_company(&db_tx, company_id).await?;
            if let Some(cnpj) = cnpj.as_deref() {
                ensure_cnpj_free(&db_tx, cnpj, Some(company_id)).await?;
            }

            let mut active: companies::ActiveModel = model.into();
            if let Some(name) = name {
                active.name = ActiveValue::Set(name);
            }
            if let Some(cnpj) = cnpj {
                active.cnpj = ActiveValue::Set(cnpj);
            }
            if let Some(email) = normalize_optional_text(patch.email.as_deref()) {
                ensure_max_len(Some(&email), 255, "email")?;
                active.email = ActiveValue::Set(Some(email));
            }
            if let Some(phone) = normalize_optional_text(patch.phone.as_deref()) {
                ensure_max_len(Some(&phone), 20, "phone")?;
                active.phone = ActiveValue::Set(Some(phone));
            }
            active.updated_at = ActiveValue::Set(Utc::now());
            let model = active.update(&db_tx).await?;
            info!(actor = %actor.id, company = %company_id, "company updated");
            Company::try_from(model)
        })
    }

    /// Soft-deletes a company (AdminMaster only).
    pub async fn delete_company(&self, actor: &Actor, company_id: Uuid) -> ResultEngine<()> {
        actor.require_master_admin()?;
        let model = self.require_company(&self.database, company_id).await?;
        let now = Utc::now();
        let mut active: companies::ActiveModel = model.into();
        active.deleted_at = ActiveValue::Set(Some(now));
        active.updated_at = ActiveValue::Set(now);
        active.update(&self.database).await?;
        info!(actor = %actor.id, company = %company_id, "company deleted");
        Ok(())
    }
}
