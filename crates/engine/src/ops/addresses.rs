use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{
    Address, AddressOwner, EngineError, NewAddress, ResultEngine, User, addresses,
    addresses::DEFAULT_COUNTRY,
    util::{ensure_max_len, normalize_optional_text, normalize_required_text},
};

use super::{Actor, Engine, with_tx};

/// Address fields after trimming and validation.
struct AddressFields {
    street: String,
    number: Option<String>,
    complement: Option<String>,
    neighborhood: Option<String>,
    city: String,
    state: String,
    zipcode: String,
    country: String,
}

fn validate_address(cmd: NewAddress) -> ResultEngine<AddressFields> {
    let street = normalize_required_text(&cmd.street, "street")?;
    let city = normalize_required_text(&cmd.city, "city")?;
    let zipcode = normalize_required_text(&cmd.zipcode, "zipcode")?;
    let state = normalize_required_text(&cmd.state, "state")?.to_uppercase();
    if state.chars().count() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(EngineError::InvalidInput(
            "state must be a two-letter code".to_string(),
        ));
    }
    let number = normalize_optional_text(cmd.number.as_deref());
    let complement = normalize_optional_text(cmd.complement.as_deref());
    let neighborhood = normalize_optional_text(cmd.neighborhood.as_deref());
    let country = normalize_optional_text(cmd.country.as_deref())
        .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());

    ensure_max_len(Some(&street), 255, "street")?;
    ensure_max_len(Some(&city), 255, "city")?;
    ensure_max_len(Some(&zipcode), 20, "zipcode")?;
    ensure_max_len(number.as_deref(), 20, "number")?;
    ensure_max_len(complement.as_deref(), 255, "complement")?;
    ensure_max_len(neighborhood.as_deref(), 255, "neighborhood")?;
    ensure_max_len(Some(&country), 100, "country")?;

    Ok(AddressFields {
        street,
        number,
        complement,
        neighborhood,
        city,
        state,
        zipcode,
        country,
    })
}

async fn find_live<C: ConnectionTrait>(
    db: &C,
    owner: AddressOwner,
) -> ResultEngine<Option<addresses::Model>> {
    Ok(addresses::Entity::find()
        .filter(addresses::Column::AddressableType.eq(owner.kind()))
        .filter(addresses::Column::AddressableId.eq(owner.id().to_string()))
        .filter(addresses::Column::DeletedAt.is_null())
        .one(db)
        .await?)
}

impl Engine {
    /// Who may read an owner's address: company members and AdminMaster for
    /// companies, the same people as `show_user` for users.
    async fn authorize_address_read<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &Actor,
        owner: AddressOwner,
    ) -> ResultEngine<()> {
        match owner {
            AddressOwner::Company(company_id) => {
                self.require_company_reader(actor, company_id)?;
                self.require_company(db, company_id).await?;
            }
            AddressOwner::User(user_id) => {
                actor.role()?;
                let user = User::try_from(self.require_user(db, user_id).await?)?;
                if user.id != actor.id {
                    self.require_manageable(db, actor, &user).await?;
                }
            }
        }
        Ok(())
    }

    /// Who may change an owner's address: company managers for companies,
    /// the user itself or an admin over it for users.
    async fn authorize_address_write<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &Actor,
        owner: AddressOwner,
    ) -> ResultEngine<()> {
        match owner {
            AddressOwner::Company(company_id) => {
                self.require_company_manager(actor, company_id)?;
                self.require_company(db, company_id).await?;
                Ok(())
            }
            AddressOwner::User(_) => self.authorize_address_read(db, actor, owner).await,
        }
    }

    /// The live address of `owner`.
    pub async fn show_address(&self, actor: &Actor, owner: AddressOwner) -> ResultEngine<Address> {
        self.authorize_address_read(&self.database, actor, owner)
            .await?;
        let model = find_live(&self.database, owner)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("address not exists".to_string()))?;
        Address::try_from(model)
    }

    /// Sets the address of `owner`, updating the live one in place or
    /// creating it when there is none.
    pub async fn put_address(
        &self,
        actor: &Actor,
        owner: AddressOwner,
        cmd: NewAddress,
    ) -> ResultEngine<Address> {
        let fields = validate_address(cmd)?;
        with_tx!(self, |db_tx| {
            self.authorize_address_write(&db_tx, actor, owner).await?;
            let now = Utc::now();
            let model = match find_live(&db_tx, owner).await? {
                Some(model) => {
                    let mut active: addresses::ActiveModel = model.into();
                    active.street = ActiveValue::Set(fields.street);
                    active.number = ActiveValue::Set(fields.number);
                    active.complement = ActiveValue::Set(fields.complement);
                    active.neighborhood = ActiveValue::Set(fields.neighborhood);
                    active.city = ActiveValue::Set(fields.city);
                    active.state = ActiveValue::Set(fields.state);
                    active.zipcode = ActiveValue::Set(fields.zipcode);
                    active.country = ActiveValue::Set(fields.country);
                    active.updated_at = ActiveValue::Set(now);
                    active.update(&db_tx).await?
                }
                None => {
                    let address = Address {
                        id: Uuid::new_v4(),
                        owner,
                        street: fields.street,
                        number: fields.number,
                        complement: fields.complement,
                        neighborhood: fields.neighborhood,
                        city: fields.city,
                        state: fields.state,
                        zipcode: fields.zipcode,
                        country: fields.country,
                        created_at: now,
                        updated_at: now,
                        deleted_at: None,
                    };
                    addresses::ActiveModel::from(&address)
                        .insert(&db_tx)
                        .await?
                }
            };
            info!(actor = %actor.id, owner = owner.kind(), owner_id = %owner.id(), "address saved");
            Address::try_from(model)
        })
    }

    /// Soft-deletes the live address of `owner`.
    pub async fn delete_address(&self, actor: &Actor, owner: AddressOwner) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.authorize_address_write(&db_tx, actor, owner).await?;
            let model = find_live(&db_tx, owner)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("address not exists".to_string()))?;
            let now = Utc::now();
            let mut active: addresses::ActiveModel = model.into();
            active.deleted_at = ActiveValue::Set(Some(now));
            active.updated_at = ActiveValue::Set(now);
            active.update(&db_tx).await?;
            info!(actor = %actor.id, owner = owner.kind(), owner_id = %owner.id(), "address deleted");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_is_upper_cased_and_country_defaults() {
        let fields = validate_address(NewAddress::new(" Rua A ", "São Paulo", "sp", "01234-567"))
            .unwrap();
        assert_eq!(fields.street, "Rua A");
        assert_eq!(fields.state, "SP");
        assert_eq!(fields.country, DEFAULT_COUNTRY);
    }

    #[test]
    fn bad_state_and_blank_street_are_rejected() {
        for state in ["S", "SPX", "1A"] {
            assert!(validate_address(NewAddress::new("Rua A", "X", state, "1")).is_err());
        }
        assert!(validate_address(NewAddress::new("  ", "X", "SP", "1")).is_err());
    }
}
