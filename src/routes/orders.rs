use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        CheckoutRequest, MonthlyRevenueList, OrderDto, OrderList, OrderWithDetails, RevenueTotal,
        StatusOrderList,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::{CancelQuery, OrderListQuery, RevenueQuery},
    services::order_service,
    state::AppState,
};

pub fn checkout_router() -> Router<AppState> {
    Router::new().route("/", post(checkout))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_my_orders))
        .route("/all", get(list_all_orders))
        .route("/statuses", get(list_statuses))
        .route("/revenue", get(revenue_between))
        .route("/revenue/last-12-months", get(revenue_last_12_months))
        .route("/user/{user_id}", get(list_user_orders))
        .route("/cancel/{order_id}", put(cancel_order))
        .route("/{order_id}", get(get_order))
        .route("/{order_id}/status/{status_id}", put(update_order_status))
}

#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order placed", body = ApiResponse<OrderWithDetails>),
        (status = 400, description = "Cart mismatch, stock or voucher problem"),
        (status = 404, description = "Address or voucher not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<OrderWithDetails>>> {
    let resp = order_service::checkout(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status_id" = Option<i32>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Orders of the current user", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_my_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/all",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status_id" = Option<i32>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "All orders", body = ApiResponse<OrderList>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::get_all_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/statuses",
    responses(
        (status = 200, description = "Order statuses", body = ApiResponse<StatusOrderList>)
    ),
    tag = "Orders"
)]
pub async fn list_statuses(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<StatusOrderList>>> {
    let resp = order_service::list_status_orders(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/user/{user_id}",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Orders of a user, contact masked unless owner", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_user_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::get_user_orders(&state, &user, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with its lines", body = ApiResponse<OrderWithDetails>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithDetails>>> {
    let resp = order_service::get_order_details(&state, &user, order_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/{order_id}/status/{status_id}",
    params(
        ("order_id" = Uuid, Path, description = "Order ID"),
        ("status_id" = i32, Path, description = "New status ID")
    ),
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<OrderDto>),
        (status = 404, description = "Order or status not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path((order_id, status_id)): Path<(Uuid, i32)>,
) -> AppResult<Json<ApiResponse<OrderDto>>> {
    let resp = order_service::update_order_status(&state, &user, order_id, status_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/cancel/{order_id}",
    params(
        ("order_id" = Uuid, Path, description = "Order ID"),
        ("reason" = Option<String>, Query, description = "Cancellation reason for the email")
    ),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<OrderDto>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Query(query): Query<CancelQuery>,
) -> AppResult<Json<ApiResponse<OrderDto>>> {
    let resp =
        order_service::process_order_cancellation(&state, &user, order_id, query.reason).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/revenue",
    params(
        ("start_date" = String, Query, description = "First day, YYYY-MM-DD"),
        ("end_date" = String, Query, description = "Last day inclusive, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Revenue in the window", body = ApiResponse<RevenueTotal>),
        (status = 400, description = "Invalid window")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn revenue_between(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<RevenueQuery>,
) -> AppResult<Json<ApiResponse<RevenueTotal>>> {
    let resp = order_service::get_revenue_between_dates(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/revenue/last-12-months",
    responses(
        (status = 200, description = "Revenue per month", body = ApiResponse<MonthlyRevenueList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn revenue_last_12_months(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<MonthlyRevenueList>>> {
    let resp = order_service::get_last_12_months_revenue(&state, &user).await?;
    Ok(Json(resp))
}
