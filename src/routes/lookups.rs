use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::catalog::{LookupList, LookupRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::LookupItem,
    response::ApiResponse,
    routes::params::Pagination,
    services::lookup_service::{self, LookupKind},
    state::AppState,
};

/// Every lookup collection is mounted with the same handlers; the
/// `LookupKind` extension selects the table.
pub fn router(kind: LookupKind) -> Router<AppState> {
    Router::new()
        .route("/", get(list_lookups).post(create_lookup))
        .route(
            "/{id}",
            get(get_lookup).put(update_lookup).delete(delete_lookup),
        )
        .layer(Extension(kind))
}

#[utoipa::path(
    get,
    path = "/api/{lookup}",
    params(
        ("lookup" = String, Path, description = "roles, brands, product-categories, product-colors, product-sizes or product-weights"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "List lookup values", body = ApiResponse<LookupList>)
    ),
    tag = "Lookups"
)]
pub async fn list_lookups(
    State(state): State<AppState>,
    Extension(kind): Extension<LookupKind>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<LookupList>>> {
    let resp = lookup_service::list(&state.pool, kind, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/{lookup}/{id}",
    params(
        ("lookup" = String, Path, description = "Lookup collection"),
        ("id" = Uuid, Path, description = "Lookup ID")
    ),
    responses(
        (status = 200, description = "Lookup value", body = ApiResponse<LookupItem>),
        (status = 404, description = "Not found")
    ),
    tag = "Lookups"
)]
pub async fn get_lookup(
    State(state): State<AppState>,
    Extension(kind): Extension<LookupKind>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<LookupItem>>> {
    let resp = lookup_service::get(&state.pool, kind, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/{lookup}",
    params(("lookup" = String, Path, description = "Lookup collection")),
    request_body = LookupRequest,
    responses(
        (status = 200, description = "Lookup value created", body = ApiResponse<LookupItem>),
        (status = 409, description = "Name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Lookups"
)]
pub async fn create_lookup(
    State(state): State<AppState>,
    Extension(kind): Extension<LookupKind>,
    user: AuthUser,
    Json(payload): Json<LookupRequest>,
) -> AppResult<Json<ApiResponse<LookupItem>>> {
    let resp = lookup_service::create(&state.pool, &user, kind, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/{lookup}/{id}",
    params(
        ("lookup" = String, Path, description = "Lookup collection"),
        ("id" = Uuid, Path, description = "Lookup ID")
    ),
    request_body = LookupRequest,
    responses(
        (status = 200, description = "Lookup value updated", body = ApiResponse<LookupItem>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Lookups"
)]
pub async fn update_lookup(
    State(state): State<AppState>,
    Extension(kind): Extension<LookupKind>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<LookupRequest>,
) -> AppResult<Json<ApiResponse<LookupItem>>> {
    let resp = lookup_service::update(&state.pool, &user, kind, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/{lookup}/{id}",
    params(
        ("lookup" = String, Path, description = "Lookup collection"),
        ("id" = Uuid, Path, description = "Lookup ID")
    ),
    responses(
        (status = 200, description = "Lookup value deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Still referenced")
    ),
    security(("bearer_auth" = [])),
    tag = "Lookups"
)]
pub async fn delete_lookup(
    State(state): State<AppState>,
    Extension(kind): Extension<LookupKind>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = lookup_service::delete(&state.pool, &user, kind, id).await?;
    Ok(Json(resp))
}
