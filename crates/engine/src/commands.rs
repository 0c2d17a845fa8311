//! Command structs for engine operations.
//!
//! These types group parameters for write operations (create/update of
//! transactions, users and companies), keeping call sites readable and
//! avoiding long argument lists.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{MemberRole, MoneyCents, Role, TransactionKind};

/// Create a transaction.
///
/// `user_id` defaults to the caller; `company_id` is resolved from the
/// caller's memberships when absent.
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount: MoneyCents,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub description: Option<String>,
    pub user_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
}

impl NewTransaction {
    #[must_use]
    pub fn new(kind: TransactionKind, amount: MoneyCents, date: NaiveDate) -> Self {
        Self {
            kind,
            amount,
            date,
            category: None,
            description: None,
            user_id: None,
            company_id: None,
        }
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn company_id(mut self, company_id: Uuid) -> Self {
        self.company_id = Some(company_id);
        self
    }
}

/// Partial update of a transaction. `None` leaves the field untouched.
///
/// `user_id` and `company_id` are honoured only for AdminMaster callers.
#[derive(Clone, Debug, Default)]
pub struct TransactionPatch {
    pub kind: Option<TransactionKind>,
    pub amount: Option<MoneyCents>,
    pub date: Option<NaiveDate>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub user_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
}

impl TransactionPatch {
    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn company_id(mut self, company_id: Uuid) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub(crate) fn touches_ownership(&self) -> bool {
        self.user_id.is_some() || self.company_id.is_some()
    }
}

/// Create a user, optionally linking it to a company in the same DB
/// transaction.
///
/// The company is either an existing one (`company_id`) or created on the
/// spot from `new_company`; giving both is rejected.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub company_id: Option<Uuid>,
    pub new_company: Option<NewCompany>,
    pub membership_role: MemberRole,
    pub position: Option<String>,
}

impl NewUser {
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: None,
            role,
            company_id: None,
            new_company: None,
            membership_role: MemberRole::default(),
            position: None,
        }
    }

    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn company(mut self, company_id: Uuid, role: MemberRole) -> Self {
        self.company_id = Some(company_id);
        self.membership_role = role;
        self
    }

    /// Creates `company` together with the user and links them.
    #[must_use]
    pub fn new_company(mut self, company: NewCompany, role: MemberRole) -> Self {
        self.new_company = Some(company);
        self.membership_role = role;
        self
    }

    #[must_use]
    pub fn position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

/// Create a company. The CNPJ is mandatory and must be unused.
#[derive(Clone, Debug)]
pub struct NewCompany {
    pub name: String,
    pub cnpj: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl NewCompany {
    #[must_use]
    pub fn new(name: impl Into<String>, cnpj: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cnpj: cnpj.into(),
            email: None,
            phone: None,
        }
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct CompanyPatch {
    pub name: Option<String>,
    pub cnpj: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Full address payload. `country` defaults to Brasil.
#[derive(Clone, Debug)]
pub struct NewAddress {
    pub street: String,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    pub country: Option<String>,
}

impl NewAddress {
    #[must_use]
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        zipcode: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            number: None,
            complement: None,
            neighborhood: None,
            city: city.into(),
            state: state.into(),
            zipcode: zipcode.into(),
            country: None,
        }
    }

    #[must_use]
    pub fn number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    #[must_use]
    pub fn complement(mut self, complement: impl Into<String>) -> Self {
        self.complement = Some(complement.into());
        self
    }

    #[must_use]
    pub fn neighborhood(mut self, neighborhood: impl Into<String>) -> Self {
        self.neighborhood = Some(neighborhood.into());
        self
    }

    #[must_use]
    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}
