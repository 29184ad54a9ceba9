use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::cart::{AddToCartRequest, CartList, StockUpdate, StockUpdateList, UpdateCartRequest},
    entity::{
        cart_items::{
            ActiveModel as CartActive, Column as CartCol, Entity as CartItems, Model as CartModel,
        },
        product_details::{Column as DetailCol, Entity as ProductDetails},
        products::{Column as ProdCol, Entity as Products},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, CartLine},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_cart(
    pool: &DbPool,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CartList>> {
    let (page, limit, offset) = pagination.normalize();
    let items = sqlx::query_as::<_, CartLine>(
        r#"
        SELECT ci.id, ci.product_detail_id, p.id AS product_id, p.name AS product_name,
               pd.price, ci.quantity, pd.quantity AS available, ci.created_at
        FROM cart_items ci
        JOIN product_details pd ON pd.id = ci.product_detail_id
        JOIN products p ON p.id = pd.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("OK", CartList { items }, Some(meta)))
}

/// Adds to an existing line or creates one. Quantities beyond the available
/// stock are truncated, not rejected.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    if Users::find_by_id(user.user_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFoundResource("User"));
    }

    let txn = state.orm.begin().await?;
    let detail = ProductDetails::find_by_id(payload.product_detail_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFoundResource("Product detail"))?;

    if !detail.status || detail.quantity <= 0 {
        return Err(AppError::BadRequest("Product is out of stock".into()));
    }

    let existing = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::ProductDetailId.eq(detail.id))
        .one(&txn)
        .await?;

    let cart_item = match existing {
        Some(line) => {
            let quantity = capped_quantity(line.quantity, payload.quantity, detail.quantity);
            let mut active: CartActive = line.into();
            active.quantity = Set(quantity);
            active.update(&txn).await?
        }
        None => {
            let quantity = capped_quantity(0, payload.quantity, detail.quantity);
            CartActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                product_detail_id: Set(detail.id),
                quantity: Set(quantity),
                created_at: Set(Utc::now().into()),
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_add",
        "cart_items",
        serde_json::json!({
            "product_detail_id": payload.product_detail_id,
            "requested": payload.quantity,
            "quantity": cart_item.quantity,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Added to cart",
        cart_item_from_entity(cart_item),
        Some(Meta::empty()),
    ))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;
    let line = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::ProductDetailId.eq(payload.product_detail_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::BadRequest("Item not in cart".into()))?;

    let detail = ProductDetails::find_by_id(payload.product_detail_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFoundResource("Product detail"))?;

    if payload.quantity > detail.quantity {
        return Err(AppError::BadRequest(format!(
            "Only {} items left in stock",
            detail.quantity
        )));
    }

    let mut active: CartActive = line.into();
    active.quantity = Set(payload.quantity);
    let cart_item = active.update(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Cart updated",
        cart_item_from_entity(cart_item),
        Some(Meta::empty()),
    ))
}

pub async fn remove_cart_item(
    state: &AppState,
    user: &AuthUser,
    cart_item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let line = CartItems::find_by_id(cart_item_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFoundResource("Cart item"))?;

    if line.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    CartItems::delete_by_id(line.id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "cart_item_id": cart_item_id }),
    )
    .await;

    Ok(ApiResponse::done("Removed from cart"))
}

/// Decrements stock for every line of the user's cart on `conn`.
///
/// All lines are validated before anything is written; the first line that
/// would go negative fails the whole call and names the product.
pub async fn update_quantity_checkout<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<Vec<StockUpdate>> {
    let lines = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .lock(LockType::Update)
        .all(conn)
        .await?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let detail_ids: Vec<Uuid> = lines.iter().map(|line| line.product_detail_id).collect();
    // Fixed lock order keeps concurrent checkouts from deadlocking.
    let details = ProductDetails::find()
        .filter(DetailCol::Id.is_in(detail_ids))
        .order_by_asc(DetailCol::Id)
        .lock(LockType::Update)
        .all(conn)
        .await?;

    let product_ids: Vec<Uuid> = details.iter().map(|detail| detail.product_id).collect();
    let names: HashMap<Uuid, String> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|product| (product.id, product.name))
        .collect();

    let details: HashMap<Uuid, _> = details.into_iter().map(|d| (d.id, d)).collect();
    let mut stock_lines = Vec::with_capacity(lines.len());
    for line in &lines {
        let detail = details
            .get(&line.product_detail_id)
            .ok_or(AppError::NotFoundResource("Product detail"))?;
        stock_lines.push(StockLine {
            product_detail_id: detail.id,
            product_name: names.get(&detail.product_id).map(String::as_str).unwrap_or(""),
            available: detail.quantity,
            requested: line.quantity,
        });
    }

    let updates = plan_decrements(&stock_lines)?;

    for line in &lines {
        ProductDetails::update_many()
            .col_expr(
                DetailCol::Quantity,
                Expr::col(DetailCol::Quantity).sub(line.quantity),
            )
            .filter(DetailCol::Id.eq(line.product_detail_id))
            .exec(conn)
            .await?;
    }

    Ok(updates)
}

pub async fn clear_cart_after_checkout<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<u64> {
    let result = CartItems::delete_many()
        .filter(CartCol::UserId.eq(user_id))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }
    Ok(result.rows_affected)
}

pub async fn update_quantity(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<StockUpdateList>> {
    let txn = state.orm.begin().await?;
    let items = update_quantity_checkout(&txn, user.user_id).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Stock updated",
        StockUpdateList { items },
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let removed = clear_cart_after_checkout(&state.orm, user.user_id).await?;
    tracing::debug!(user_id = %user.user_id, removed, "cart cleared");
    Ok(ApiResponse::done("Cart cleared"))
}

pub(crate) fn capped_quantity(existing: i32, requested: i32, available: i32) -> i32 {
    existing.saturating_add(requested).min(available)
}

pub(crate) struct StockLine<'a> {
    pub product_detail_id: Uuid,
    pub product_name: &'a str,
    pub available: i32,
    pub requested: i32,
}

pub(crate) fn plan_decrements(lines: &[StockLine<'_>]) -> AppResult<Vec<StockUpdate>> {
    lines
        .iter()
        .map(|line| {
            let remaining = line.available - line.requested;
            if remaining < 0 {
                return Err(AppError::BadRequest(format!(
                    "Not enough stock for product: {}",
                    line.product_name
                )));
            }
            Ok(StockUpdate {
                product_detail_id: line.product_detail_id,
                remaining,
            })
        })
        .collect()
}

pub(crate) fn cart_item_from_entity(model: CartModel) -> CartItem {
    CartItem {
        id: model.id,
        user_id: model.user_id,
        product_detail_id: model.product_detail_id,
        quantity: model.quantity,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn added_quantity_is_capped_by_stock() {
        assert_eq!(capped_quantity(0, 3, 5), 3);
        assert_eq!(capped_quantity(3, 4, 5), 5);
        assert_eq!(capped_quantity(0, 9, 5), 5);
        assert_eq!(capped_quantity(i32::MAX, 1, 5), 5);
    }

    #[test]
    fn decrement_plan_fails_on_first_short_line() {
        let ok = Uuid::new_v4();
        let short = Uuid::new_v4();
        let lines = [
            StockLine {
                product_detail_id: ok,
                product_name: "Cat litter",
                available: 10,
                requested: 4,
            },
            StockLine {
                product_detail_id: short,
                product_name: "Dog leash",
                available: 1,
                requested: 2,
            },
        ];

        match plan_decrements(&lines) {
            Err(AppError::BadRequest(msg)) => {
                assert_eq!(msg, "Not enough stock for product: Dog leash")
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let plan = plan_decrements(&lines[..1]).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].product_detail_id, ok);
        assert_eq!(plan[0].remaining, 6);
    }

    #[test]
    fn exact_stock_drains_to_zero() {
        let line = StockLine {
            product_detail_id: Uuid::new_v4(),
            product_name: "Bird seed",
            available: 2,
            requested: 2,
        };
        assert_eq!(plan_decrements(&[line]).unwrap()[0].remaining, 0);
    }
}
