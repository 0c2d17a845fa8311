//! Transaction primitives.
//!
//! A `Transaction` is a flat income or expense record owned by one user and,
//! optionally, attributed to one company. Rows without a company are
//! personal.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::InvalidInput(format!(
                "invalid transaction type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub category: Option<String>,
    pub description: Option<String>,
    pub amount: MoneyCents,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Builds a new, not yet persisted, transaction.
    ///
    /// Enforces the record invariants: amount in `[0.01, 999999.99]` and a
    /// date that is not after `today`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: Uuid,
        company_id: Option<Uuid>,
        kind: TransactionKind,
        category: Option<String>,
        description: Option<String>,
        amount: MoneyCents,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        let amount = amount.ensure_transaction_range()?;
        ensure_not_future(date, now.date_naive())?;
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            company_id,
            kind,
            category,
            description,
            amount,
            date,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Personal transactions carry no company.
    #[must_use]
    pub fn is_personal(&self) -> bool {
        self.company_id.is_none()
    }
}

pub(crate) fn ensure_not_future(date: NaiveDate, today: NaiveDate) -> Result<(), EngineError> {
    if date > today {
        return Err(EngineError::InvalidDate(
            "date must not be in the future".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub company_id: Option<String>,
    #[sea_orm(column_name = "type")]
    pub kind: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub amount_minor: i64,
    pub date: Date,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::companies::Entity",
        from = "Column::CompanyId",
        to = "super::companies::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Companies,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            user_id: ActiveValue::Set(tx.user_id.to_string()),
            company_id: ActiveValue::Set(tx.company_id.map(|id| id.to_string())),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            category: ActiveValue::Set(tx.category.clone()),
            description: ActiveValue::Set(tx.description.clone()),
            amount_minor: ActiveValue::Set(tx.amount.cents()),
            date: ActiveValue::Set(tx.date),
            created_at: ActiveValue::Set(tx.created_at),
            updated_at: ActiveValue::Set(tx.updated_at),
            deleted_at: ActiveValue::Set(tx.deleted_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            user_id: parse_uuid(&model.user_id, "user")?,
            company_id: parse_optional_uuid(model.company_id.as_deref(), "company")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            category: model.category,
            description: model.description,
            amount: MoneyCents::new(model.amount_minor),
            date: model.date,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn new_rejects_zero_amount() {
        let err = Transaction::new(
            Uuid::new_v4(),
            None,
            TransactionKind::Expense,
            None,
            None,
            MoneyCents::new(0),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            noon(2024, 2, 10),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    #[test]
    fn new_rejects_future_date_but_accepts_today() {
        let now = noon(2024, 2, 10);
        let tomorrow = NaiveDate::from_ymd_opt(2024, 2, 11).unwrap();
        let err = Transaction::new(
            Uuid::new_v4(),
            None,
            TransactionKind::Income,
            None,
            None,
            MoneyCents::new(100),
            tomorrow,
            now,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidDate(_)));

        let tx = Transaction::new(
            Uuid::new_v4(),
            None,
            TransactionKind::Income,
            None,
            None,
            MoneyCents::new(100),
            now.date_naive(),
            now,
        )
        .unwrap();
        assert!(tx.is_personal());
        assert_eq!(tx.created_at, now);
    }
}
