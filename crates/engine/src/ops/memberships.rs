use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    EngineError, MemberRole, Membership, ResultEngine, User, company_members,
    util::{normalize_optional_text, parse_uuid},
};

use super::{Actor, Engine, with_tx};

impl Engine {
    /// Distinct companies the user is linked to, whatever the membership role.
    ///
    /// Removed links are ignored. Never fails on a user without links: the
    /// set is just empty.
    pub async fn companies_of(&self, user_id: Uuid) -> ResultEngine<BTreeSet<Uuid>> {
        companies_of(&self.database, user_id).await
    }

    /// Links a user to a company.
    ///
    /// Allowed for AdminMaster and for CompanyAdmins of that company. A
    /// previously removed link is restored with the new role.
    pub async fn add_member(
        &self,
        actor: &Actor,
        company_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
        position: Option<&str>,
    ) -> ResultEngine<Membership> {
        self.require_company_manager(actor, company_id)?;
        let position = normalize_optional_text(position);
        with_tx!(self, |db_tx| {
            self.require_company(&db_tx, company_id).await?;
            self.require_user(&db_tx, user_id).await?;
            let membership = link_member(&db_tx, company_id, user_id, role, position).await?;
            info!(actor = %actor.id, %company_id, %user_id, role = role.as_str(), "member added");
            Ok(membership)
        })
    }

    /// Soft-removes a user from a company.
    pub async fn remove_member(
        &self,
        actor: &Actor,
        company_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<()> {
        self.require_company_manager(actor, company_id)?;
        with_tx!(self, |db_tx| {
            let model = company_members::Entity::find()
                .filter(company_members::Column::CompanyId.eq(company_id.to_string()))
                .filter(company_members::Column::UserId.eq(user_id.to_string()))
                .filter(company_members::Column::DeletedAt.is_null())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("membership not exists".to_string()))?;

            let now = Utc::now();
            let mut active: company_members::ActiveModel = model.into();
            active.deleted_at = ActiveValue::Set(Some(now));
            active.updated_at = ActiveValue::Set(now);
            active.update(&db_tx).await?;
            info!(actor = %actor.id, %company_id, %user_id, "member removed");
            Ok(())
        })
    }

    /// Lists the active members of a company (AdminMaster or any member).
    pub async fn list_members(
        &self,
        actor: &Actor,
        company_id: Uuid,
    ) -> ResultEngine<Vec<(Membership, User)>> {
        let role = actor.role()?;
        if !role.is_master_admin() && !actor.belongs_to(company_id) {
            warn!(actor = %actor.id, %company_id, "member listing denied");
            return Err(EngineError::Forbidden(
                "not a member of this company".to_string(),
            ));
        }
        self.require_company(&self.database, company_id).await?;

        let rows = company_members::Entity::find()
            .filter(company_members::Column::CompanyId.eq(company_id.to_string()))
            .filter(company_members::Column::DeletedAt.is_null())
            .find_also_related(crate::users::Entity)
            .order_by_asc(crate::users::Column::Name)
            .all(&self.database)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for (member, user) in rows {
            let Some(user) = user else {
                continue;
            };
            out.push((Membership::try_from(member)?, User::try_from(user)?));
        }
        Ok(out)
    }

    pub(super) fn require_company_manager(&self, actor: &Actor, company_id: Uuid) -> ResultEngine<()> {
        let role = actor.require_admin()?;
        if !role.is_master_admin() && !actor.belongs_to(company_id) {
            warn!(actor = %actor.id, %company_id, "membership change outside own companies");
            return Err(EngineError::Forbidden(
                "companyAdmin may only manage its own companies".to_string(),
            ));
        }
        Ok(())
    }
}

pub(super) async fn companies_of<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> ResultEngine<BTreeSet<Uuid>> {
    let rows = company_members::Entity::find()
        .filter(company_members::Column::UserId.eq(user_id.to_string()))
        .filter(company_members::Column::DeletedAt.is_null())
        .all(db)
        .await?;
    rows.iter()
        .map(|m| parse_uuid(&m.company_id, "company"))
        .collect()
}

/// Inserts the link, or revives a removed one. An active duplicate is
/// `ExistingKey`.
pub(super) async fn link_member<C: ConnectionTrait>(
    db: &C,
    company_id: Uuid,
    user_id: Uuid,
    role: MemberRole,
    position: Option<String>,
) -> ResultEngine<Membership> {
    let now = Utc::now();
    let existing = company_members::Entity::find()
        .filter(company_members::Column::CompanyId.eq(company_id.to_string()))
        .filter(company_members::Column::UserId.eq(user_id.to_string()))
        .one(db)
        .await?;

    let model = match existing {
        Some(model) if model.deleted_at.is_none() => {
            return Err(EngineError::ExistingKey(
                "user is already a member of this company".to_string(),
            ));
        }
        Some(model) => {
            debug!(%company_id, %user_id, "reviving removed membership");
            let mut active: company_members::ActiveModel = model.into();
            active.role = ActiveValue::Set(role.as_str().to_string());
            active.position = ActiveValue::Set(position);
            active.deleted_at = ActiveValue::Set(None);
            active.updated_at = ActiveValue::Set(now);
            active.update(db).await?
        }
        None => {
            company_members::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                company_id: ActiveValue::Set(company_id.to_string()),
                user_id: ActiveValue::Set(user_id.to_string()),
                role: ActiveValue::Set(role.as_str().to_string()),
                position: ActiveValue::Set(position),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
                deleted_at: ActiveValue::Set(None),
            }
            .insert(db)
            .await?
        }
    };
    Membership::try_from(model)
}
