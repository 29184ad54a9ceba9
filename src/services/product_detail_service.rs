use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::catalog::{
        CreateProductDetailRequest, ProductDetailList, SetStatusRequest, UpdateProductDetailRequest,
    },
    entity::{
        product_details::{ActiveModel, Entity as ProductDetails},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::ProductDetail,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

const DETAIL_SELECT: &str = r#"
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
"#;

pub(crate) async fn fetch_detail(pool: &DbPool, id: Uuid) -> AppResult<ProductDetail> {
    sqlx::query_as::<_, ProductDetail>(&format!("{DETAIL_SELECT} WHERE pd.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFoundResource("Product detail"))
}

fn validate_amounts(price: i64, quantity: i32) -> AppResult<()> {
    if price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if quantity < 0 {
        return Err(AppError::BadRequest("quantity must not be negative".into()));
    }
    Ok(())
}

pub async fn list_details(
    pool: &DbPool,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductDetailList>> {
    let (page, limit, offset) = pagination.normalize();
    let items = sqlx::query_as::<_, ProductDetail>(&format!(
        "{DETAIL_SELECT} ORDER BY pd.created_at DESC LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM product_details")
        .fetch_one(pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("OK", ProductDetailList { items }, Some(meta)))
}

pub async fn list_by_product(
    pool: &DbPool,
    product_id: Uuid,
) -> AppResult<ApiResponse<ProductDetailList>> {
    let items = sqlx::query_as::<_, ProductDetail>(&format!(
        "{DETAIL_SELECT} WHERE pd.product_id = $1 ORDER BY pd.price ASC"
    ))
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success(
        "OK",
        ProductDetailList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_detail(pool: &DbPool, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let detail = fetch_detail(pool, id).await?;
    Ok(ApiResponse::success("OK", detail, Some(Meta::empty())))
}

pub async fn create_detail(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductDetailRequest,
) -> AppResult<ApiResponse<ProductDetail>> {
    ensure_admin(user)?;
    validate_amounts(payload.price, payload.quantity)?;

    if Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::NotFoundResource("Product"));
    }

    let created = ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(payload.product_id),
        color_id: Set(payload.color_id),
        size_id: Set(payload.size_id),
        weight_id: Set(payload.weight_id),
        price: Set(payload.price),
        quantity: Set(payload.quantity),
        status: Set(payload.status.unwrap_or(true)),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_detail_create",
        "product_details",
        serde_json::json!({ "product_detail_id": created.id, "product_id": created.product_id }),
    )
    .await;

    let detail = fetch_detail(&state.pool, created.id).await?;
    Ok(ApiResponse::success(
        "Product detail created",
        detail,
        Some(Meta::empty()),
    ))
}

pub async fn update_detail(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductDetailRequest,
) -> AppResult<ApiResponse<ProductDetail>> {
    ensure_admin(user)?;
    let existing = ProductDetails::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFoundResource("Product detail"))?;

    validate_amounts(
        payload.price.unwrap_or(existing.price),
        payload.quantity.unwrap_or(existing.quantity),
    )?;

    let mut active: ActiveModel = existing.into();
    if let Some(color_id) = payload.color_id {
        active.color_id = Set(Some(color_id));
    }
    if let Some(size_id) = payload.size_id {
        active.size_id = Set(Some(size_id));
    }
    if let Some(weight_id) = payload.weight_id {
        active.weight_id = Set(Some(weight_id));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(quantity) = payload.quantity {
        active.quantity = Set(quantity);
    }
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_detail_update",
        "product_details",
        serde_json::json!({ "product_detail_id": updated.id }),
    )
    .await;

    let detail = fetch_detail(&state.pool, updated.id).await?;
    Ok(ApiResponse::success(
        "Product detail updated",
        detail,
        Some(Meta::empty()),
    ))
}

pub async fn set_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: SetStatusRequest,
) -> AppResult<ApiResponse<ProductDetail>> {
    ensure_admin(user)?;
    let existing = ProductDetails::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFoundResource("Product detail"))?;

    let mut active: ActiveModel = existing.into();
    active.status = Set(payload.status);
    active.update(&state.orm).await?;

    let detail = fetch_detail(&state.pool, id).await?;
    Ok(ApiResponse::success(
        "Product detail status updated",
        detail,
        Some(Meta::empty()),
    ))
}

pub async fn delete_detail(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = ProductDetails::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFoundResource("Product detail"));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_detail_delete",
        "product_details",
        serde_json::json!({ "product_detail_id": id }),
    )
    .await;

    Ok(ApiResponse::done("Product detail deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_price_or_quantity_is_rejected() {
        assert!(validate_amounts(0, 0).is_ok());
        assert!(validate_amounts(-1, 3).is_err());
        assert!(validate_amounts(10, -3).is_err());
    }
}
