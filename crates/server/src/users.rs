//! User administration endpoints

use api_types::{
    Role as ApiRole,
    page::Page,
    user::{UserListQuery, UserNew, UserUpdate, UserView},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{Actor, NewUser, Role, UserListFilter, UserPatch};
use uuid::Uuid;

use crate::{
    ServerError,
    companies::{engine_member_role, new_company},
    page_view,
    server::ServerState,
};

fn engine_role(role: ApiRole) -> Role {
    match role {
        ApiRole::AdminMaster => Role::AdminMaster,
        ApiRole::CompanyAdmin => Role::CompanyAdmin,
        ApiRole::CompanyUser => Role::CompanyUser,
        ApiRole::User => Role::User,
    }
}

fn map_role(role: Role) -> ApiRole {
    match role {
        Role::AdminMaster => ApiRole::AdminMaster,
        Role::CompanyAdmin => ApiRole::CompanyAdmin,
        Role::CompanyUser => ApiRole::CompanyUser,
        Role::User => ApiRole::User,
    }
}

fn view(user: engine::User) -> UserView {
    UserView {
        id: user.id,
        name: user.name,
        email: user.email,
        phone: user.phone,
        role: user.role.map(map_role),
        created_at: user.created_at,
        updated_at: user.updated_at,
        deleted_at: user.deleted_at,
    }
}

pub async fn list(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Page<UserView>>, ServerError> {
    let filter = UserListFilter {
        search: query.search,
        role: query.role.map(engine_role),
        company_id: query.company_id,
        include_trashed: query.include_trashed.unwrap_or(false),
        page: query.page,
        per_page: query.per_page,
    };
    let page = state.engine.list_users(&actor, &filter).await?;
    Ok(Json(page_view(page, view)))
}

pub async fn create(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<UserNew>,
) -> Result<(StatusCode, Json<UserView>), ServerError> {
    let cmd = NewUser {
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        role: engine_role(payload.role),
        company_id: payload.company_id,
        new_company: payload.company.map(new_company),
        membership_role: engine_member_role(payload.membership_role),
        position: payload.position,
    };
    let user = state.engine.create_user(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(view(user))))
}

pub async fn show(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.show_user(&actor, id).await?;
    Ok(Json(view(user)))
}

pub async fn update(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<UserView>, ServerError> {
    let patch = UserPatch {
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        role: payload.role.map(engine_role),
    };
    let user = state.engine.update_user(&actor, id, patch).await?;
    Ok(Json(view(user)))
}

pub async fn delete(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_user(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.restore_user(&actor, id).await?;
    Ok(Json(view(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_map_both_ways() {
        for role in Role::ALL {
            assert_eq!(engine_role(map_role(role)), role);
        }
    }
}
