use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::catalog::{
        CreateProductDetailRequest, ProductDetailList, SetStatusRequest,
        UpdateProductDetailRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::ProductDetail,
    response::ApiResponse,
    routes::params::Pagination,
    services::product_detail_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_details).post(create_detail))
        .route("/by-product/{product_id}", get(list_by_product))
        .route(
            "/{id}",
            get(get_detail).put(update_detail).delete(delete_detail),
        )
        .route("/{id}/status", put(set_status))
}

#[utoipa::path(
    get,
    path = "/api/product-details",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "List product details", body = ApiResponse<ProductDetailList>)
    ),
    tag = "Product Details"
)]
pub async fn list_details(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ProductDetailList>>> {
    let resp = product_detail_service::list_details(&state.pool, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/product-details/by-product/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Variants of a product", body = ApiResponse<ProductDetailList>)
    ),
    tag = "Product Details"
)]
pub async fn list_by_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProductDetailList>>> {
    let resp = product_detail_service::list_by_product(&state.pool, product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/product-details/{id}",
    params(("id" = Uuid, Path, description = "Product detail ID")),
    responses(
        (status = 200, description = "Product detail", body = ApiResponse<ProductDetail>),
        (status = 404, description = "Not found")
    ),
    tag = "Product Details"
)]
pub async fn get_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    let resp = product_detail_service::get_detail(&state.pool, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/product-details",
    request_body = CreateProductDetailRequest,
    responses(
        (status = 200, description = "Product detail created", body = ApiResponse<ProductDetail>),
        (status = 400, description = "Negative price or quantity"),
        (status = 409, description = "Variant already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Product Details"
)]
pub async fn create_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductDetailRequest>,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    let resp = product_detail_service::create_detail(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/product-details/{id}",
    params(("id" = Uuid, Path, description = "Product detail ID")),
    request_body = UpdateProductDetailRequest,
    responses(
        (status = 200, description = "Product detail updated", body = ApiResponse<ProductDetail>),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Product Details"
)]
pub async fn update_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductDetailRequest>,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    let resp = product_detail_service::update_detail(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/product-details/{id}/status",
    params(("id" = Uuid, Path, description = "Product detail ID")),
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<ProductDetail>),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Product Details"
)]
pub async fn set_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStatusRequest>,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    let resp = product_detail_service::set_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/product-details/{id}",
    params(("id" = Uuid, Path, description = "Product detail ID")),
    responses(
        (status = 200, description = "Product detail deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Referenced by orders")
    ),
    security(("bearer_auth" = [])),
    tag = "Product Details"
)]
pub async fn delete_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_detail_service::delete_detail(&state, &user, id).await?;
    Ok(Json(resp))
}
