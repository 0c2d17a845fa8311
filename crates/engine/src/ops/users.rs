use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::{
    ActiveValue, Condition, ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait, prelude::*,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    EngineError, NewUser, ResultEngine, Role, User, UserPatch, company_members, users,
    util::{
        contains_pattern, ensure_max_len, normalize_email, normalize_optional_text,
        normalize_required_text,
    },
};

use super::{
    Actor, Engine, Page,
    companies::insert_company,
    memberships::{companies_of, link_member},
    page_bounds, with_tx,
};

/// Filters for listing users.
#[derive(Clone, Debug, Default)]
pub struct UserListFilter {
    /// Substring matched against name or email.
    pub search: Option<String>,
    pub role: Option<Role>,
    /// Narrows to members of one company.
    pub company_id: Option<Uuid>,
    /// Honoured only for AdminMaster.
    pub include_trashed: bool,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl Engine {
    pub(super) async fn require_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: Uuid,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .filter(users::Column::DeletedAt.is_null())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    async fn ensure_email_free<C: ConnectionTrait>(
        &self,
        db: &C,
        email: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = users::Entity::find().filter(users::Column::Email.eq(email));
        if let Some(id) = except {
            query = query.filter(users::Column::Id.ne(id.to_string()));
        }
        if query.one(db).await?.is_some() {
            return Err(EngineError::ExistingKey(email.to_string()));
        }
        Ok(())
    }

    /// Checks that an admin actor may manage `target`.
    ///
    /// AdminMaster manages everyone. A CompanyAdmin manages users sharing one
    /// of its companies, and never someone more privileged than itself.
    pub(super) async fn require_manageable<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &Actor,
        target: &User,
    ) -> ResultEngine<()> {
        let role = actor.require_admin()?;
        if role.is_master_admin() {
            return Ok(());
        }
        if target.role.is_some_and(|r| r.rank() < role.rank()) {
            return Err(EngineError::Forbidden(
                "cannot manage a more privileged user".to_string(),
            ));
        }
        let shared = companies_of(db, target.id).await?;
        if shared.is_disjoint(&actor.company_ids) {
            warn!(actor = %actor.id, target = %target.id, "user outside actor companies");
            return Err(EngineError::Forbidden(
                "user does not share a company with you".to_string(),
            ));
        }
        Ok(())
    }

    fn ensure_assignable(&self, actor_role: Role, target: Role) -> ResultEngine<()> {
        if !actor_role.can_assign(target) {
            return Err(EngineError::Forbidden(format!(
                "{actor_role} cannot assign role {target}"
            )));
        }
        Ok(())
    }

    /// Creates a user and, when requested, links it to a company in the same
    /// DB transaction.
    pub async fn create_user(&self, actor: &Actor, cmd: NewUser) -> ResultEngine<User> {
        let role = actor.require_admin()?;
        self.ensure_assignable(role, cmd.role)?;
        if cmd.company_id.is_some() && cmd.new_company.is_some() {
            return Err(EngineError::InvalidInput(
                "give either company_id or company, not both".to_string(),
            ));
        }
        if cmd.new_company.is_some() && !role.is_master_admin() {
            return Err(EngineError::Forbidden(
                "only adminMaster may create companies".to_string(),
            ));
        }
        if let Some(company_id) = cmd.company_id
            && !role.is_master_admin()
            && !actor.belongs_to(company_id)
        {
            return Err(EngineError::Forbidden(
                "companyAdmin may only add users to its own companies".to_string(),
            ));
        }

        let name = normalize_required_text(&cmd.name, "user name")?;
        ensure_max_len(Some(&name), 255, "name")?;
        let email = normalize_email(&cmd.email)?;
        let phone = normalize_optional_text(cmd.phone.as_deref());
        ensure_max_len(phone.as_deref(), 20, "phone")?;
        let position = normalize_optional_text(cmd.position.as_deref());

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name,
            email,
            phone,
            role: Some(cmd.role),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        with_tx!(self, |db_tx| {
            self.ensure_email_free(&db_tx, &user.email, None).await?;
            let company_id = match (cmd.company_id, cmd.new_company) {
                (Some(company_id), _) => {
                    self.require_company(&db_tx, company_id).await?;
                    Some(company_id)
                }
                (None, Some(new_company)) => {
                    let company = insert_company(&db_tx, new_company).await?;
                    info!(actor = %actor.id, company = %company.id, "company created with user");
                    Some(company.id)
                }
                (None, None) => None,
            };
            users::ActiveModel::from(&user).insert(&db_tx).await?;
            if let Some(company_id) = company_id {
                link_member(&db_tx, company_id, user.id, cmd.membership_role, position).await?;
            }
            info!(actor = %actor.id, user = %user.id, role = %cmd.role, "user created");
            Ok(user)
        })
    }

    /// Shows a user: self, AdminMaster, or a CompanyAdmin sharing a company.
    pub async fn show_user(&self, actor: &Actor, user_id: Uuid) -> ResultEngine<User> {
        actor.role()?;
        let user = User::try_from(self.require_user(&self.database, user_id).await?)?;
        if user.id != actor.id {
            self.require_manageable(&self.database, actor, &user).await?;
        }
        Ok(user)
    }

    /// Lists users visible to an admin, ordered by name.
    pub async fn list_users(
        &self,
        actor: &Actor,
        filter: &UserListFilter,
    ) -> ResultEngine<Page<User>> {
        let role = actor.require_admin()?;
        let (page, per_page) = page_bounds(filter.page, filter.per_page);

        // `None` means every company.
        let mut companies: Option<BTreeSet<Uuid>> =
            (!role.is_master_admin()).then(|| actor.company_ids.clone());
        if let Some(company_id) = filter.company_id {
            if companies.as_ref().is_some_and(|ids| !ids.contains(&company_id)) {
                return Ok(Page::empty(page, per_page));
            }
            companies = Some(BTreeSet::from([company_id]));
        }

        let mut query = users::Entity::find()
            .order_by_asc(users::Column::Name)
            .order_by_asc(users::Column::Id);

        if let Some(companies) = companies {
            if companies.is_empty() {
                return Ok(Page::empty(page, per_page));
            }
            let member_ids: BTreeSet<String> = company_members::Entity::find()
                .filter(
                    company_members::Column::CompanyId
                        .is_in(companies.iter().map(ToString::to_string)),
                )
                .filter(company_members::Column::DeletedAt.is_null())
                .all(&self.database)
                .await?
                .into_iter()
                .map(|m| m.user_id)
                .collect();
            if member_ids.is_empty() {
                return Ok(Page::empty(page, per_page));
            }
            query = query.filter(users::Column::Id.is_in(member_ids));
        }

        if !(role.is_master_admin() && filter.include_trashed) {
            query = query.filter(users::Column::DeletedAt.is_null());
        }
        if let Some(target) = filter.role {
            query = query.filter(users::Column::UserLevelId.eq(target.rank()));
        }
        if let Some(search) = normalize_optional_text(filter.search.as_deref()) {
            query = query.filter(
                Condition::any()
                    .add(users::Column::Name.like(contains_pattern(&search)))
                    .add(users::Column::Email.like(contains_pattern(&search))),
            );
        }

        let paginator = query.paginate(&self.database, per_page);
        let total = paginator.num_items().await?;
        let items = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        Ok(Page::new(items, page, per_page, total))
    }

    /// Updates a user profile.
    ///
    /// Anyone may edit their own profile; editing others needs admin rights
    /// over them. Role changes obey the assignment bound and are never open
    /// to non-admins.
    pub async fn update_user(
        &self,
        actor: &Actor,
        user_id: Uuid,
        patch: UserPatch,
    ) -> ResultEngine<User> {
        let actor_role = actor.role()?;
        with_tx!(self, |db_tx| {
            let model = self.require_user(&db_tx, user_id).await?;
            let target = User::try_from(model.clone())?;
            if target.id != actor.id {
                self.require_manageable(&db_tx, actor, &target).await?;
            }
            if let Some(new_role) = patch.role {
                if !actor_role.is_admin() {
                    return Err(EngineError::Forbidden(
                        "only administrators may change roles".to_string(),
                    ));
                }
                self.ensure_assignable(actor_role, new_role)?;
            }

            let mut active: users::ActiveModel = model.into();
            if let Some(name) = patch.name.as_deref() {
                let name = normalize_required_text(name, "user name")?;
                ensure_max_len(Some(&name), 255, "name")?;
                active.name = ActiveValue::Set(name);
            }
            if let Some(email) = patch.email.as_deref() {
                let email = normalize_email(email)?;
                self.ensure_email_free(&db_tx, &email, Some(user_id)).await?;
                active.email = ActiveValue::Set(email);
            }
            if let Some(phone) = normalize_optional_text(patch.phone.as_deref()) {
                ensure_max_len(Some(&phone), 20, "phone")?;
                active.phone = ActiveValue::Set(Some(phone));
            }
            if let Some(new_role) = patch.role {
                active.user_level_id = ActiveValue::Set(Some(new_role.rank()));
            }
            active.updated_at = ActiveValue::Set(Utc::now());
            let model = active.update(&db_tx).await?;
            info!(actor = %actor.id, user = %user_id, "user updated");
            User::try_from(model)
        })
    }

    /// Soft-deletes a user. Nobody can delete themselves.
    pub async fn delete_user(&self, actor: &Actor, user_id: Uuid) -> ResultEngine<()> {
        actor.require_admin()?;
        if user_id == actor.id {
            return Err(EngineError::Forbidden(
                "you cannot delete your own account".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let model = self.require_user(&db_tx, user_id).await?;
            let target = User::try_from(model.clone())?;
            self.require_manageable(&db_tx, actor, &target).await?;

            let now = Utc::now();
            let mut active: users::ActiveModel = model.into();
            active.deleted_at = ActiveValue::Set(Some(now));
            active.updated_at = ActiveValue::Set(now);
            active.update(&db_tx).await?;
            info!(actor = %actor.id, user = %user_id, "user deleted");
            Ok(())
        })
    }

    /// Restores a soft-deleted user.
    pub async fn restore_user(&self, actor: &Actor, user_id: Uuid) -> ResultEngine<User> {
        actor.require_admin()?;
        with_tx!(self, |db_tx| {
            let model = users::Entity::find_by_id(user_id.to_string())
                .filter(users::Column::DeletedAt.is_not_null())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("deleted user not exists".to_string()))?;
            let target = User::try_from(model.clone())?;
            self.require_manageable(&db_tx, actor, &target).await?;

            let mut active: users::ActiveModel = model.into();
            active.deleted_at = ActiveValue::Set(None);
            active.updated_at = ActiveValue::Set(Utc::now());
            let model = active.update(&db_tx).await?;
            info!(actor = %actor.id, user = %user_id, "user restored");
            User::try_from(model)
        })
    }
}
