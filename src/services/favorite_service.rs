use chrono::Utc;
use sea_orm::{
    ColumnTrait, EntityTrait, QueryFilter, Set, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::favorites::{AddFavoriteRequest, FavoriteProductList},
    entity::{
        favorites::{ActiveModel as FavoriteActive, Column as FavoriteCol, Entity as Favorites},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Favorite, Product},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_favorites(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<FavoriteProductList>> {
    let (page, limit, offset) = pagination.normalize();
    let items = sqlx::query_as::<_, Product>(
        r#"
        SELECT p.id, p.name, p.description, p.image_url, p.brand_id, p.category_id, p.created_at
        FROM favorites f
        JOIN products p ON p.id = f.product_id
        WHERE f.user_id = $1
        ORDER BY f.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM favorites WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Favorites",
        FavoriteProductList { items },
        Some(meta),
    ))
}

/// Adding a product twice returns the existing favorite.
pub async fn add_favorite(
    state: &AppState,
    user: &AuthUser,
    payload: AddFavoriteRequest,
) -> AppResult<ApiResponse<Favorite>> {
    Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFoundResource("Product"))?;

    Favorites::insert(FavoriteActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        product_id: Set(payload.product_id),
        created_at: Set(Utc::now().into()),
    })
    .on_conflict(
        OnConflict::columns([FavoriteCol::UserId, FavoriteCol::ProductId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(&state.orm)
    .await?;

    let favorite = Favorites::find()
        .filter(FavoriteCol::UserId.eq(user.user_id))
        .filter(FavoriteCol::ProductId.eq(payload.product_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFoundResource("Favorite"))?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "favorite_add",
        "favorites",
        serde_json::json!({ "product_id": payload.product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Added to favorites",
        Favorite {
            id: favorite.id,
            product_id: favorite.product_id,
            user_id: favorite.user_id,
            created_at: favorite.created_at.with_timezone(&Utc),
        },
        Some(Meta::empty()),
    ))
}

pub async fn remove_favorite(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Favorites::delete_many()
        .filter(FavoriteCol::UserId.eq(user.user_id))
        .filter(FavoriteCol::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFoundResource("Favorite"));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "favorite_remove",
        "favorites",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::done("Removed from favorites"))
}
