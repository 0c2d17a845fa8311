use axum::{
    Json, Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};
use serde::Serialize;
use uuid::Uuid;

use std::sync::Arc;

use crate::{ServerError, addresses, companies, reports, transactions, users};
use engine::{Engine, EngineError};

static USER_ID_HEADER: axum::http::HeaderName = axum::http::HeaderName::from_static("x-user-id");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// `TypedHeader` for the caller identity.
///
/// The upstream identity provider authenticates the caller and forwards its
/// user id in the "x-user-id" entry of the header.
#[derive(Debug)]
struct UserIdHeader(Uuid);

impl Header for UserIdHeader {
    fn name() -> &'static axum::http::HeaderName {
        &USER_ID_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        let Ok(value) = Uuid::parse_str(value.trim()) else {
            return Err(AxumError::invalid());
        };

        Ok(UserIdHeader(value))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        let as_string = self.0.to_string();
        match axum::http::HeaderValue::from_str(&as_string) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-user-id header"),
        }
    }
}

/// Resolves the caller into an [`engine::Actor`] stored in the request
/// extensions.
async fn auth(
    user_header: Option<TypedHeader<UserIdHeader>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(UserIdHeader(user_id))) = user_header else {
        return Err(ServerError::Unauthorized(
            "missing x-user-id header".to_string(),
        ));
    };

    let actor = match state.engine.load_actor(user_id).await {
        Ok(actor) => actor,
        Err(EngineError::KeyNotFound(_)) => {
            tracing::warn!(user = %user_id, "request from unknown user");
            return Err(ServerError::Unauthorized("unknown user".to_string()));
        }
        Err(err) => return Err(err.into()),
    };

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/transactions/{id}",
            get(transactions::show)
                .put(transactions::update)
                .delete(transactions::delete),
        )
        .route("/reports/monthly", get(reports::monthly))
        .route("/companies", get(companies::list).post(companies::create))
        .route(
            "/companies/{id}",
            get(companies::show)
                .put(companies::update)
                .delete(companies::delete),
        )
        .route(
            "/companies/{id}/address",
            get(addresses::show_company)
                .put(addresses::put_company)
                .delete(addresses::delete_company),
        )
        .route(
            "/companies/{id}/members",
            get(companies::list_members).post(companies::add_member),
        )
        .route(
            "/companies/{id}/members/{user_id}",
            axum::routing::delete(companies::remove_member),
        )
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/{id}",
            get(users::show).put(users::update).delete(users::delete),
        )
        .route("/users/{id}/restore", post(users::restore))
        .route(
            "/users/{id}/address",
            get(addresses::show_user)
                .put(addresses::put_user)
                .delete(addresses::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}
