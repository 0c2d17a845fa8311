//! Postal addresses (`addresses` table).
//!
//! One live address per owner. The owner is either a company or a user,
//! stored as an `(addressable_type, addressable_id)` pair.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

/// Country stored when the caller does not give one.
pub const DEFAULT_COUNTRY: &str = "Brasil";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum AddressOwner {
    Company(Uuid),
    User(Uuid),
}

impl AddressOwner {
    pub fn kind(self) -> &'static str {
        match self {
            Self::Company(_) => "company",
            Self::User(_) => "user",
        }
    }

    pub fn id(self) -> Uuid {
        match self {
            Self::Company(id) | Self::User(id) => id,
        }
    }

    fn from_parts(kind: &str, id: &str) -> Result<Self, EngineError> {
        match kind {
            "company" => Ok(Self::Company(parse_uuid(id, "company")?)),
            "user" => Ok(Self::User(parse_uuid(id, "user")?)),
            other => Err(EngineError::InvalidInput(format!(
                "unknown address owner: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub owner: AddressOwner,
    pub street: String,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: String,
    /// Two-letter state code, upper case.
    pub state: String,
    pub zipcode: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "addresses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub addressable_id: String,
    pub addressable_type: String,
    pub street: String,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    pub country: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Address> for ActiveModel {
    fn from(address: &Address) -> Self {
        Self {
            id: ActiveValue::Set(address.id.to_string()),
            addressable_id: ActiveValue::Set(address.owner.id().to_string()),
            addressable_type: ActiveValue::Set(address.owner.kind().to_string()),
            street: ActiveValue::Set(address.street.clone()),
            number: ActiveValue::Set(address.number.clone()),
            complement: ActiveValue::Set(address.complement.clone()),
            neighborhood: ActiveValue::Set(address.neighborhood.clone()),
            city: ActiveValue::Set(address.city.clone()),
            state: ActiveValue::Set(address.state.clone()),
            zipcode: ActiveValue::Set(address.zipcode.clone()),
            country: ActiveValue::Set(address.country.clone()),
            created_at: ActiveValue::Set(address.created_at),
            updated_at: ActiveValue::Set(address.updated_at),
            deleted_at: ActiveValue::Set(address.deleted_at),
        }
    }
}

impl TryFrom<Model> for Address {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "address")?,
            owner: AddressOwner::from_parts(&model.addressable_type, &model.addressable_id)?,
            street: model.street,
            number: model.number,
            complement: model.complement,
            neighborhood: model.neighborhood,
            city: model.city,
            state: model.state,
            zipcode: model.zipcode,
            country: model.country,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_round_trips_through_columns() {
        let id = Uuid::new_v4();
        for owner in [AddressOwner::Company(id), AddressOwner::User(id)] {
            let parsed = AddressOwner::from_parts(owner.kind(), &id.to_string()).unwrap();
            assert_eq!(parsed, owner);
        }
        assert!(AddressOwner::from_parts("vault", &id.to_string()).is_err());
    }
}
