//! Address endpoints for companies and users

use api_types::address::{AddressInput, AddressView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Actor, Address, AddressOwner, NewAddress};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn view(address: Address) -> AddressView {
    AddressView {
        id: address.id,
        addressable_type: address.owner.kind().to_string(),
        addressable_id: address.owner.id(),
        street: address.street,
        number: address.number,
        complement: address.complement,
        neighborhood: address.neighborhood,
        city: address.city,
        state: address.state,
        zipcode: address.zipcode,
        country: address.country,
        created_at: address.created_at,
        updated_at: address.updated_at,
    }
}

fn new_address(payload: AddressInput) -> NewAddress {
    NewAddress {
        street: payload.street,
        number: payload.number,
        complement: payload.complement,
        neighborhood: payload.neighborhood,
        city: payload.city,
        state: payload.state,
        zipcode: payload.zipcode,
        country: payload.country,
    }
}

async fn show(
    state: ServerState,
    actor: Actor,
    owner: AddressOwner,
) -> Result<Json<AddressView>, ServerError> {
    let address = state.engine.show_address(&actor, owner).await?;
    Ok(Json(view(address)))
}

async fn put(
    state: ServerState,
    actor: Actor,
    owner: AddressOwner,
    payload: AddressInput,
) -> Result<Json<AddressView>, ServerError> {
    let address = state
        .engine
        .put_address(&actor, owner, new_address(payload))
        .await?;
    Ok(Json(view(address)))
}

async fn delete(
    state: ServerState,
    actor: Actor,
    owner: AddressOwner,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_address(&actor, owner).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn show_company(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AddressView>, ServerError> {
    show(state, actor, AddressOwner::Company(id)).await
}

pub async fn put_company(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddressInput>,
) -> Result<Json<AddressView>, ServerError> {
    put(state, actor, AddressOwner::Company(id), payload).await
}

pub async fn delete_company(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    delete(state, actor, AddressOwner::Company(id)).await
}

pub async fn show_user(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AddressView>, ServerError> {
    show(state, actor, AddressOwner::User(id)).await
}

pub async fn put_user(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddressInput>,
) -> Result<Json<AddressView>, ServerError> {
    put(state, actor, AddressOwner::User(id), payload).await
}

pub async fn delete_user(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    delete(state, actor, AddressOwner::User(id)).await
}
