//! Companies and company membership endpoints

use api_types::{
    company::{CompanyListQuery, CompanyNew, CompanyUpdate, CompanyView},
    membership::{MemberNew, MemberRole as ApiMemberRole, MemberView, MembersResponse},
    page::Page,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{Actor, CompanyListFilter, CompanyPatch, MemberRole, NewCompany};
use uuid::Uuid;

use crate::{ServerError, page_view, server::ServerState};

fn view(company: engine::Company) -> CompanyView {
    CompanyView {
        id: company.id,
        name: company.name,
        cnpj: company.cnpj,
        email: company.email,
        phone: company.phone,
        created_at: company.created_at,
        updated_at: company.updated_at,
        deleted_at: company.deleted_at,
    }
}

pub(crate) fn engine_member_role(role: ApiMemberRole) -> MemberRole {
    match role {
        ApiMemberRole::Owner => MemberRole::Owner,
        ApiMemberRole::Manager => MemberRole::Manager,
        ApiMemberRole::Employee => MemberRole::Employee,
    }
}

fn map_member_role(role: MemberRole) -> ApiMemberRole {
    match role {
        MemberRole::Owner => ApiMemberRole::Owner,
        MemberRole::Manager => ApiMemberRole::Manager,
        MemberRole::Employee => ApiMemberRole::Employee,
    }
}

pub async fn list(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Query(query): Query<CompanyListQuery>,
) -> Result<Json<Page<CompanyView>>, ServerError> {
    let filter = CompanyListFilter {
        search: query.search,
        include_trashed: query.include_trashed.unwrap_or(false),
        page: query.page,
        per_page: query.per_page,
    };
    let page = state.engine.list_companies(&actor, &filter).await?;
    Ok(Json(page_view(page, view)))
}

pub async fn create(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<CompanyNew>,
) -> Result<(StatusCode, Json<CompanyView>), ServerError> {
    let company = state
        .engine
        .create_company(&actor, new_company(payload))
        .await?;
    Ok((StatusCode::CREATED, Json(view(company))))
}

pub(crate) fn new_company(payload: CompanyNew) -> NewCompany {
    NewCompany {
        name: payload.name,
        cnpj: payload.cnpj,
        email: payload.email,
        phone: payload.phone,
    }
}

pub async fn show(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompanyView>, ServerError> {
    let company = state.engine.show_company(&actor, id).await?;
    Ok(Json(view(company)))
}

pub async fn update(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompanyUpdate>,
) -> Result<Json<CompanyView>, ServerError> {
    let patch = CompanyPatch {
        name: payload.name,
        cnpj: payload.cnpj,
        email: payload.email,
        phone: payload.phone,
    };
    let company = state.engine.update_company(&actor, id, patch).await?;
    Ok(Json(view(company)))
}

pub async fn delete(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_company(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MembersResponse>, ServerError> {
    let rows = state.engine.list_members(&actor, id).await?;
    let members = rows
        .into_iter()
        .map(|(membership, user)| MemberView {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role: map_member_role(membership.role),
            position: membership.position,
            joined_at: membership.created_at,
        })
        .collect();
    Ok(Json(MembersResponse {
        company_id: id,
        members,
    }))
}

pub async fn add_member(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MemberNew>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .add_member(
            &actor,
            id,
            payload.user_id,
            engine_member_role(payload.role),
            payload.position.as_deref(),
        )
        .await?;
    Ok(StatusCode::CREATED)
}

pub async fn remove_member(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state.engine.remove_member(&actor, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
