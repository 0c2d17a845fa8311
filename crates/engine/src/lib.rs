//! Domain engine for the multi-tenant financial tracker.
//!
//! The [`Engine`] owns the database connection and exposes every operation
//! as an async method taking the calling [`Actor`]. Transaction visibility is
//! decided in one place, [`Scope`], which both filters queries and checks
//! single records.

pub use addresses::{Address, AddressOwner};
pub use commands::{
    CompanyPatch, NewAddress, NewCompany, NewTransaction, NewUser, TransactionPatch, UserPatch,
};
pub use companies::Company;
pub use company_members::{MemberRole, Membership};
pub use error::EngineError;
pub use money::MoneyCents;
pub use ops::{
    Actor, CompanyBreakdown, CompanyListFilter, Engine, EngineBuilder, MonthlyReport, Page,
    PartyRef, Period, ReportEntry, Scope, Totals, TransactionListFilter, UserListFilter,
};
pub use roles::Role;
pub use transactions::{Transaction, TransactionKind};
pub use users::User;

mod addresses;
mod commands;
mod companies;
mod company_members;
mod error;
mod money;
mod ops;
mod roles;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
