use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::vouchers::{CreateVoucherRequest, UpdateVoucherRequest, VoucherList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Voucher,
    response::ApiResponse,
    routes::params::Pagination,
    services::voucher_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vouchers).post(create_voucher))
        .route("/{id}", put(update_voucher).delete(delete_voucher))
        .route("/{id}/decrement", put(decrement_voucher))
}

#[utoipa::path(
    get,
    path = "/api/vouchers",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "List vouchers", body = ApiResponse<VoucherList>)
    ),
    tag = "Vouchers"
)]
pub async fn list_vouchers(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<VoucherList>>> {
    let resp = voucher_service::list_vouchers(&state, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vouchers",
    request_body = CreateVoucherRequest,
    responses(
        (status = 200, description = "Voucher created", body = ApiResponse<Voucher>),
        (status = 400, description = "Invalid terms"),
        (status = 409, description = "Name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Vouchers"
)]
pub async fn create_voucher(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateVoucherRequest>,
) -> AppResult<Json<ApiResponse<Voucher>>> {
    let resp = voucher_service::create_voucher(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/vouchers/{id}",
    params(("id" = Uuid, Path, description = "Voucher ID")),
    request_body = UpdateVoucherRequest,
    responses(
        (status = 200, description = "Voucher updated", body = ApiResponse<Voucher>),
        (status = 404, description = "Voucher not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Vouchers"
)]
pub async fn update_voucher(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVoucherRequest>,
) -> AppResult<Json<ApiResponse<Voucher>>> {
    let resp = voucher_service::update_voucher(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/vouchers/{id}",
    params(("id" = Uuid, Path, description = "Voucher ID")),
    responses(
        (status = 200, description = "Voucher deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Voucher not found"),
        (status = 409, description = "Voucher used by orders")
    ),
    security(("bearer_auth" = [])),
    tag = "Vouchers"
)]
pub async fn delete_voucher(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = voucher_service::delete_voucher(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/vouchers/{id}/decrement",
    params(("id" = Uuid, Path, description = "Voucher ID")),
    responses(
        (status = 200, description = "Voucher quantity decremented", body = ApiResponse<Voucher>),
        (status = 400, description = "Voucher is out of stock"),
        (status = 404, description = "Voucher not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Vouchers"
)]
pub async fn decrement_voucher(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Voucher>>> {
    let resp = voucher_service::decrement(&state, &user, id).await?;
    Ok(Json(resp))
}
