//! Transaction access policy.
//!
//! Every transaction operation funnels through [`Scope`]: list and report
//! turn it into a query predicate, show/update/delete evaluate it against
//! the loaded row. There is no other place that decides visibility.

use std::collections::BTreeSet;

use sea_orm::{Condition, QueryFilter, prelude::*};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Role, Transaction, TransactionPatch, User, transactions, users,
};

use super::Engine;

/// The authenticated caller of an operation.
///
/// Built once per request by [`Engine::load_actor`] and never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    /// `None` when the user has no usable role level.
    pub role: Option<Role>,
    pub company_ids: BTreeSet<Uuid>,
}

impl Actor {
    #[must_use]
    pub fn new(id: Uuid, role: Option<Role>, company_ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            id,
            role,
            company_ids: company_ids.into_iter().collect(),
        }
    }

    /// Returns the role or fails with [`EngineError::RoleNotConfigured`].
    pub fn role(&self) -> ResultEngine<Role> {
        self.role
            .ok_or_else(|| EngineError::RoleNotConfigured("role not set".to_string()))
    }

    #[must_use]
    pub fn belongs_to(&self, company_id: Uuid) -> bool {
        self.company_ids.contains(&company_id)
    }

    /// Fails with `Forbidden` unless the actor is AdminMaster or CompanyAdmin.
    pub(crate) fn require_admin(&self) -> ResultEngine<Role> {
        let role = self.role()?;
        if !role.is_admin() {
            warn!(actor = %self.id, role = %role, "admin operation denied");
            return Err(EngineError::Forbidden(
                "administrator privileges required".to_string(),
            ));
        }
        Ok(role)
    }

    pub(crate) fn require_master_admin(&self) -> ResultEngine<()> {
        let role = self.role()?;
        if !role.is_master_admin() {
            warn!(actor = %self.id, role = %role, "master admin operation denied");
            return Err(EngineError::Forbidden(
                "only adminMaster may perform this operation".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn scope(&self) -> Scope {
        Scope::for_actor(self)
    }

    /// Picks the owner of a new transaction.
    ///
    /// Defaults to the actor. Only AdminMaster may record a transaction on
    /// behalf of someone else.
    pub fn resolve_owner_for_create(&self, requested: Option<Uuid>) -> ResultEngine<Uuid> {
        let role = self.role()?;
        match requested {
            None => Ok(self.id),
            Some(id) if id == self.id || role.is_master_admin() => Ok(id),
            Some(_) => Err(EngineError::Forbidden(
                "only adminMaster may create transactions for other users".to_string(),
            )),
        }
    }

    /// Picks the company a new transaction is attributed to.
    ///
    /// An explicit company must be one of the actor's memberships unless the
    /// actor is AdminMaster. Without one, company roles with exactly one
    /// membership get it; everybody else records a personal transaction.
    pub fn resolve_company_for_create(&self, requested: Option<Uuid>) -> ResultEngine<Option<Uuid>> {
        let role = self.role()?;
        if let Some(company_id) = requested {
            if !role.is_master_admin() && !self.belongs_to(company_id) {
                warn!(actor = %self.id, %company_id, "company outside actor memberships");
                return Err(EngineError::Forbidden(
                    "actor is not a member of the requested company".to_string(),
                ));
            }
            return Ok(Some(company_id));
        }

        let resolved = match role {
            Role::AdminMaster | Role::User => None,
            Role::CompanyAdmin | Role::CompanyUser => {
                let mut ids = self.company_ids.iter();
                match (ids.next(), ids.next()) {
                    (Some(only), None) => Some(*only),
                    _ => None,
                }
            }
        };
        Ok(resolved)
    }

    /// Drops the ownership fields of a patch unless the actor is AdminMaster.
    pub fn gate_patch(&self, mut patch: TransactionPatch) -> ResultEngine<TransactionPatch> {
        let role = self.role()?;
        if !role.is_master_admin() && patch.touches_ownership() {
            debug!(actor = %self.id, "ignoring ownership fields in transaction patch");
            patch.user_id = None;
            patch.company_id = None;
        }
        Ok(patch)
    }
}

/// The set of transactions an actor may see or touch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    Unrestricted,
    /// Rows of the listed companies, plus the owner's personal rows.
    CompanyOrOwn {
        company_ids: BTreeSet<Uuid>,
        owner_id: Uuid,
    },
    OwnOnly {
        owner_id: Uuid,
    },
    Denied(String),
}

impl Scope {
    #[must_use]
    pub fn for_actor(actor: &Actor) -> Scope {
        match actor.role {
            None => Scope::Denied("role not set".to_string()),
            Some(Role::AdminMaster) => Scope::Unrestricted,
            Some(Role::CompanyAdmin | Role::CompanyUser) => Scope::CompanyOrOwn {
                company_ids: actor.company_ids.clone(),
                owner_id: actor.id,
            },
            Some(Role::User) => Scope::OwnOnly { owner_id: actor.id },
        }
    }

    /// Pure visibility predicate for a single row.
    #[must_use]
    pub fn permits(&self, tx: &Transaction) -> bool {
        match self {
            Scope::Unrestricted => true,
            Scope::OwnOnly { owner_id } => tx.user_id == *owner_id,
            Scope::CompanyOrOwn {
                company_ids,
                owner_id,
            } => match tx.company_id {
                Some(company_id) => company_ids.contains(&company_id),
                None => tx.user_id == *owner_id,
            },
            Scope::Denied(_) => false,
        }
    }

    /// Fails unless the scope is usable at all.
    pub fn ensure_configured(&self) -> ResultEngine<()> {
        match self {
            Scope::Denied(reason) => Err(EngineError::RoleNotConfigured(reason.clone())),
            _ => Ok(()),
        }
    }

    pub fn authorize(&self, tx: &Transaction) -> ResultEngine<()> {
        self.ensure_configured()?;
        if !self.permits(tx) {
            warn!(transaction = %tx.id, "transaction outside actor scope");
            return Err(EngineError::Forbidden(
                "transaction is outside your access scope".to_string(),
            ));
        }
        Ok(())
    }

    /// Query predicate equivalent to [`Scope::permits`].
    pub(crate) fn condition(&self) -> ResultEngine<Condition> {
        let own_personal = |owner_id: &Uuid| {
            Condition::all()
                .add(transactions::Column::CompanyId.is_null())
                .add(transactions::Column::UserId.eq(owner_id.to_string()))
        };
        let condition = match self {
            Scope::Unrestricted => Condition::all(),
            Scope::OwnOnly { owner_id } => {
                Condition::all().add(transactions::Column::UserId.eq(owner_id.to_string()))
            }
            Scope::CompanyOrOwn {
                company_ids,
                owner_id,
            } if company_ids.is_empty() => own_personal(owner_id),
            Scope::CompanyOrOwn {
                company_ids,
                owner_id,
            } => Condition::any()
                .add(
                    transactions::Column::CompanyId
                        .is_in(company_ids.iter().map(ToString::to_string)),
                )
                .add(own_personal(owner_id)),
            Scope::Denied(reason) => return Err(EngineError::RoleNotConfigured(reason.clone())),
        };
        Ok(condition)
    }
}

impl Engine {
    /// Builds the [`Actor`] for an authenticated user id.
    ///
    /// Unknown or soft-deleted users are `KeyNotFound`; a missing or unknown
    /// role level is `RoleNotConfigured`.
    pub async fn load_actor(&self, user_id: Uuid) -> ResultEngine<Actor> {
        let model = users::Entity::find_by_id(user_id.to_string())
            .filter(users::Column::DeletedAt.is_null())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
        let user = User::try_from(model)?;
        let role = user.role.ok_or_else(|| {
            warn!(user = %user_id, "user has no usable role level");
            EngineError::RoleNotConfigured("role not set".to_string())
        })?;
        let company_ids = self.companies_of(user_id).await?;
        debug!(user = %user_id, role = %role, companies = company_ids.len(), "actor loaded");
        Ok(Actor::new(user_id, Some(role), company_ids))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::{MoneyCents, TransactionKind};

    fn tx(user_id: Uuid, company_id: Option<Uuid>) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: Uuid::new_v4(),
            user_id,
            company_id,
            kind: TransactionKind::Expense,
            category: None,
            description: None,
            amount: MoneyCents::new(100),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn admin_master_is_unrestricted() {
        let actor = Actor::new(Uuid::new_v4(), Some(Role::AdminMaster), []);
        let scope = actor.scope();
        assert_eq!(scope, Scope::Unrestricted);
        assert!(scope.permits(&tx(Uuid::new_v4(), Some(Uuid::new_v4()))));
        assert!(scope.permits(&tx(Uuid::new_v4(), None)));
    }

    #[test]
    fn user_sees_only_own_rows_whatever_the_company() {
        let me = Uuid::new_v4();
        let scope = Actor::new(me, Some(Role::User), [Uuid::new_v4()]).scope();
        assert!(scope.permits(&tx(me, None)));
        assert!(scope.permits(&tx(me, Some(Uuid::new_v4()))));
        assert!(!scope.permits(&tx(Uuid::new_v4(), None)));
    }

    #[test]
    fn company_member_sees_company_rows_and_own_personal_rows() {
        let me = Uuid::new_v4();
        let c1 = Uuid::new_v4();
        let c2 = Uuid::new_v4();
        let other = Uuid::new_v4();
        let scope = Actor::new(me, Some(Role::CompanyUser), [c1]).scope();

        assert!(scope.permits(&tx(other, Some(c1))));
        assert!(!scope.permits(&tx(other, Some(c2))));
        assert!(scope.permits(&tx(me, None)));
        assert!(!scope.permits(&tx(other, None)));
        // Own row attributed to a foreign company stays hidden.
        assert!(!scope.permits(&tx(me, Some(c2))));
    }

    #[test]
    fn missing_role_is_a_configuration_fault() {
        let actor = Actor::new(Uuid::new_v4(), None, []);
        let scope = actor.scope();
        assert!(matches!(scope, Scope::Denied(_)));
        assert!(!scope.permits(&tx(actor.id, None)));
        assert!(matches!(
            scope.authorize(&tx(actor.id, None)),
            Err(EngineError::RoleNotConfigured(_))
        ));
        assert!(matches!(scope.condition(), Err(EngineError::RoleNotConfigured(_))));
    }

    #[test]
    fn out_of_scope_row_is_forbidden() {
        let scope = Actor::new(Uuid::new_v4(), Some(Role::User), []).scope();
        assert!(matches!(
            scope.authorize(&tx(Uuid::new_v4(), None)),
            Err(EngineError::Forbidden(_))
        ));
    }

    #[test]
    fn create_company_resolution() {
        let c1 = Uuid::new_v4();
        let c2 = Uuid::new_v4();

        let single = Actor::new(Uuid::new_v4(), Some(Role::CompanyUser), [c1]);
        assert_eq!(single.resolve_company_for_create(None).unwrap(), Some(c1));

        let multi = Actor::new(Uuid::new_v4(), Some(Role::CompanyAdmin), [c1, c2]);
        assert_eq!(multi.resolve_company_for_create(None).unwrap(), None);
        assert_eq!(multi.resolve_company_for_create(Some(c2)).unwrap(), Some(c2));
        assert!(matches!(
            multi.resolve_company_for_create(Some(Uuid::new_v4())),
            Err(EngineError::Forbidden(_))
        ));

        let user = Actor::new(Uuid::new_v4(), Some(Role::User), [c1]);
        assert_eq!(user.resolve_company_for_create(None).unwrap(), None);

        let master = Actor::new(Uuid::new_v4(), Some(Role::AdminMaster), []);
        let any = Uuid::new_v4();
        assert_eq!(master.resolve_company_for_create(None).unwrap(), None);
        assert_eq!(master.resolve_company_for_create(Some(any)).unwrap(), Some(any));
    }

    #[test]
    fn create_owner_defaults_to_actor() {
        let actor = Actor::new(Uuid::new_v4(), Some(Role::CompanyAdmin), []);
        assert_eq!(actor.resolve_owner_for_create(None).unwrap(), actor.id);
        assert_eq!(actor.resolve_owner_for_create(Some(actor.id)).unwrap(), actor.id);
        assert!(actor.resolve_owner_for_create(Some(Uuid::new_v4())).is_err());
    }

    #[test]
    fn patch_ownership_fields_are_master_only() {
        let patch = TransactionPatch::default()
            .user_id(Uuid::new_v4())
            .company_id(Uuid::new_v4())
            .category("rent");

        let admin = Actor::new(Uuid::new_v4(), Some(Role::CompanyAdmin), []);
        let gated = admin.gate_patch(patch.clone()).unwrap();
        assert_eq!(gated.user_id, None);
        assert_eq!(gated.company_id, None);
        assert_eq!(gated.category.as_deref(), Some("rent"));

        let master = Actor::new(Uuid::new_v4(), Some(Role::AdminMaster), []);
        let kept = master.gate_patch(patch.clone()).unwrap();
        assert_eq!(kept.user_id, patch.user_id);
        assert_eq!(kept.company_id, patch.company_id);
    }
}
