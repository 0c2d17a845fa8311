use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role hierarchy slugs, most privileged first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    AdminMaster,
    CompanyAdmin,
    CompanyUser,
    User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub mod page {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PageMeta {
        pub current_page: u64,
        pub per_page: u64,
        pub total: u64,
        pub last_page: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Page<T> {
        pub data: Vec<T>,
        pub meta: PageMeta,
    }
}

pub mod amount {
    use super::*;

    /// Money as sent by clients: either a JSON number (`150.5`) or a decimal
    /// string (`"150.50"`).
    ///
    /// The server parses the decimal form into integer cents; at most two
    /// fractional digits are accepted.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum AmountInput {
        Number(serde_json::Number),
        Text(String),
    }

    impl AmountInput {
        /// Decimal representation to be parsed.
        pub fn as_decimal(&self) -> String {
            match self {
                Self::Number(n) => n.to_string(),
                Self::Text(s) => s.clone(),
            }
        }
    }
}

pub mod transaction {
    use super::{amount::AmountInput, *};

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        #[serde(rename = "type")]
        pub kind: TransactionKind,
        pub category: Option<String>,
        pub description: Option<String>,
        pub amount: AmountInput,
        /// `YYYY-MM-DD`, not in the future.
        pub date: NaiveDate,
        pub user_id: Option<Uuid>,
        pub company_id: Option<Uuid>,
    }

    /// Partial update; absent fields are left untouched.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        #[serde(rename = "type")]
        pub kind: Option<TransactionKind>,
        pub category: Option<String>,
        pub description: Option<String>,
        pub amount: Option<AmountInput>,
        pub date: Option<NaiveDate>,
        /// Honoured only for adminMaster callers.
        pub user_id: Option<Uuid>,
        /// Honoured only for adminMaster callers.
        pub company_id: Option<Uuid>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionListQuery {
        #[serde(rename = "type")]
        pub kind: Option<TransactionKind>,
        pub category: Option<String>,
        pub start_date: Option<NaiveDate>,
        pub end_date: Option<NaiveDate>,
        pub min_amount: Option<String>,
        pub max_amount: Option<String>,
        pub user_id: Option<Uuid>,
        pub company_id: Option<Uuid>,
        pub include_trashed: Option<bool>,
        pub page: Option<u64>,
        pub per_page: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub user_id: Uuid,
        pub company_id: Option<Uuid>,
        #[serde(rename = "type")]
        pub kind: TransactionKind,
        pub category: Option<String>,
        pub description: Option<String>,
        /// Two-decimal string, e.g. `"150.50"`.
        pub amount: String,
        pub date: NaiveDate,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

pub mod report {
    use super::{transaction::TransactionKind, *};

    /// Raw query values; the server parses them so that bad numbers are
    /// reported as an invalid period.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ReportQuery {
        pub year: Option<String>,
        pub month: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Period {
        pub year: i32,
        pub month: u32,
        pub start_date: NaiveDate,
        pub end_date: NaiveDate,
        pub month_name: String,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    pub struct Summary {
        pub total_income: f64,
        pub total_expenses: f64,
        pub balance: f64,
        pub transaction_count: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PartyRef {
        pub id: Uuid,
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReportEntry {
        pub id: Uuid,
        #[serde(rename = "type")]
        pub kind: TransactionKind,
        pub category: Option<String>,
        pub description: Option<String>,
        pub amount: String,
        pub date: NaiveDate,
        pub user: Option<PartyRef>,
        pub company: Option<PartyRef>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CompanyBreakdown {
        /// `null` groups personal transactions.
        pub company: Option<PartyRef>,
        #[serde(flatten)]
        pub summary: Summary,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthlyReport {
        pub period: Period,
        pub summary: Summary,
        pub latest_transactions: Vec<ReportEntry>,
        pub company_breakdown: Vec<CompanyBreakdown>,
    }
}

pub mod company {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CompanyNew {
        pub name: String,
        /// Unique across companies.
        pub cnpj: String,
        pub email: Option<String>,
        pub phone: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CompanyUpdate {
        pub name: Option<String>,
        pub cnpj: Option<String>,
        pub email: Option<String>,
        pub phone: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CompanyListQuery {
        pub search: Option<String>,
        pub include_trashed: Option<bool>,
        pub page: Option<u64>,
        pub per_page: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CompanyView {
        pub id: Uuid,
        pub name: String,
        pub cnpj: String,
        pub email: Option<String>,
        pub phone: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

pub mod address {
    use super::*;

    /// Body of `PUT .../address`; replaces the whole address.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AddressInput {
        pub street: String,
        pub number: Option<String>,
        pub complement: Option<String>,
        pub neighborhood: Option<String>,
        pub city: String,
        /// Two-letter code, e.g. `SP`.
        pub state: String,
        pub zipcode: String,
        /// Defaults to `Brasil`.
        pub country: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AddressView {
        pub id: Uuid,
        /// `company` or `user`.
        pub addressable_type: String,
        pub addressable_id: Uuid,
        pub street: String,
        pub number: Option<String>,
        pub complement: Option<String>,
        pub neighborhood: Option<String>,
        pub city: String,
        pub state: String,
        pub zipcode: String,
        pub country: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }
}

pub mod membership {
    use super::*;

    /// Role of a user inside a company. Informational only: transaction
    /// access does not depend on it.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MemberRole {
        Owner,
        Manager,
        #[default]
        Employee,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberNew {
        pub user_id: Uuid,
        #[serde(default)]
        pub role: MemberRole,
        pub position: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub user_id: Uuid,
        pub name: String,
        pub email: String,
        pub role: MemberRole,
        pub position: Option<String>,
        pub joined_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MembersResponse {
        pub company_id: Uuid,
        pub members: Vec<MemberView>,
    }
}

pub mod user {
    use super::{company::CompanyNew, membership::MemberRole, *};

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserNew {
        pub name: String,
        pub email: String,
        pub phone: Option<String>,
        pub role: Role,
        /// Links the new user to this company in the same operation.
        pub company_id: Option<Uuid>,
        /// Creates a company and links the new user to it; adminMaster only,
        /// exclusive with `company_id`.
        pub company: Option<CompanyNew>,
        #[serde(default)]
        pub membership_role: MemberRole,
        pub position: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct UserUpdate {
        pub name: Option<String>,
        pub email: Option<String>,
        pub phone: Option<String>,
        pub role: Option<Role>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct UserListQuery {
        pub search: Option<String>,
        pub role: Option<Role>,
        pub company_id: Option<Uuid>,
        pub include_trashed: Option<bool>,
        pub page: Option<u64>,
        pub per_page: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub id: Uuid,
        pub name: String,
        pub email: String,
        pub phone: Option<String>,
        /// `null` when the stored level is missing or unknown.
        pub role: Option<Role>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

#[cfg(test)]
mod tests {
    use super::{amount::AmountInput, transaction::TransactionNew, user::UserNew};

    #[test]
    fn amount_accepts_number_or_string() {
        let body = r#"{"type":"expense","amount":150.5,"date":"2024-02-01"}"#;
        let tx: TransactionNew = serde_json::from_str(body).unwrap();
        assert_eq!(tx.amount.as_decimal(), "150.5");
        assert!(tx.category.is_none());

        let body = r#"{"type":"income","amount":"150.50","date":"2024-02-01"}"#;
        let tx: TransactionNew = serde_json::from_str(body).unwrap();
        assert_eq!(tx.amount, AmountInput::Text("150.50".to_string()));
    }

    #[test]
    fn user_new_may_carry_a_company() {
        let body = r#"{"name":"Ana","email":"ana@x.io","role":"companyAdmin",
            "company":{"name":"Acme","cnpj":"12.345.678/0001-90"}}"#;
        let user: UserNew = serde_json::from_str(body).unwrap();
        let company = user.company.unwrap();
        assert_eq!(company.cnpj, "12.345.678/0001-90");
        assert!(user.company_id.is_none());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let body = r#"{"type":"transfer","amount":1,"date":"2024-02-01"}"#;
        assert!(serde_json::from_str::<TransactionNew>(body).is_err());
    }
}
