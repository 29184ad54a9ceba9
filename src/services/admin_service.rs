use sea_orm::{
    ActiveModelTrait, EntityTrait, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::catalog::{InventoryAdjustRequest, ProductDetailList},
    entity::product_details::{ActiveModel as DetailActive, Entity as ProductDetails},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::ProductDetail,
    response::{ApiResponse, Meta},
    routes::params::LowStockQuery,
    services::product_detail_service::fetch_detail,
    state::AppState,
};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductDetailList>> {
    ensure_admin(user)?;
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    let (page, limit, offset) = query.pagination().normalize();

    let items = sqlx::query_as::<_, ProductDetail>(
        r#"
        SELECT pd.id, pd.product_id, p.name AS product_name,
               pd.color_id, c.name AS color_name,
               pd.size_id, s.name AS size_name,
               pd.weight_id, w.name AS weight_name,
               pd.price, pd.quantity, pd.status, pd.created_at
        FROM product_details pd
        JOIN products p ON p.id = pd.product_id
        LEFT JOIN product_colors c ON c.id = pd.color_id
        LEFT JOIN product_sizes s ON s.id = pd.size_id
        LEFT JOIN product_weights w ON w.id = pd.weight_id
        WHERE pd.quantity <= $1
        ORDER BY pd.quantity ASC, pd.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(threshold)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM product_details WHERE quantity <= $1")
        .bind(threshold)
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Low stock",
        ProductDetailList { items },
        Some(meta),
    ))
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<ProductDetail>> {
    ensure_admin(user)?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }

    let txn = state.orm.begin().await?;
    let detail = ProductDetails::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFoundResource("Product detail"))?;

    let new_quantity = adjusted_quantity(detail.quantity, payload.delta)?;

    let mut active: DetailActive = detail.into();
    active.quantity = Set(new_quantity);
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "inventory_adjust",
        "product_details",
        serde_json::json!({ "product_detail_id": updated.id, "delta": payload.delta }),
    )
    .await;

    let detail = fetch_detail(&state.pool, updated.id).await?;
    Ok(ApiResponse::success(
        "Inventory updated",
        detail,
        Some(Meta::empty()),
    ))
}

fn adjusted_quantity(current: i32, delta: i32) -> AppResult<i32> {
    match current.checked_add(delta) {
        Some(quantity) if quantity >= 0 => Ok(quantity),
        Some(_) => Err(AppError::BadRequest("stock cannot be negative".into())),
        None => Err(AppError::BadRequest("stock adjustment out of range".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjustment_never_goes_below_zero() {
        assert_eq!(adjusted_quantity(5, -5).unwrap(), 0);
        assert_eq!(adjusted_quantity(5, 10).unwrap(), 15);
        assert!(adjusted_quantity(5, -6).is_err());
        assert!(adjusted_quantity(i32::MAX, 1).is_err());
    }
}
