mod common;

use petcare_api::{
    dto::cart::{AddToCartRequest, UpdateCartRequest},
    error::AppError,
    routes::params::Pagination,
    services::cart_service,
};

#[tokio::test]
async fn add_to_cart_caps_quantity_at_stock() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (user, _) = common::create_user(&state, "user").await?;
    let detail_id = common::create_variant(&state, 50_000, 5).await?;

    let first = cart_service::add_to_cart(
        &state,
        &user,
        AddToCartRequest {
            product_detail_id: detail_id,
            quantity: 3,
        },
    )
    .await?;
    assert_eq!(first.data.map(|line| line.quantity), Some(3));

    let second = cart_service::add_to_cart(
        &state,
        &user,
        AddToCartRequest {
            product_detail_id: detail_id,
            quantity: 4,
        },
    )
    .await?;
    assert_eq!(second.data.map(|line| line.quantity), Some(5));

    let listed = cart_service::list_cart(&state.pool, &user, Pagination::default()).await?;
    let items = listed.data.map(|cart| cart.items).unwrap_or_default();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 5);
    Ok(())
}

#[tokio::test]
async fn update_above_stock_is_rejected() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (user, _) = common::create_user(&state, "user").await?;
    let detail_id = common::create_variant(&state, 20_000, 2).await?;

    let missing = cart_service::update_cart_item(
        &state,
        &user,
        UpdateCartRequest {
            product_detail_id: detail_id,
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(missing, Err(AppError::BadRequest(_))));

    cart_service::add_to_cart(
        &state,
        &user,
        AddToCartRequest {
            product_detail_id: detail_id,
            quantity: 1,
        },
    )
    .await?;

    let too_many = cart_service::update_cart_item(
        &state,
        &user,
        UpdateCartRequest {
            product_detail_id: detail_id,
            quantity: 3,
        },
    )
    .await;
    match too_many {
        Err(AppError::BadRequest(message)) => assert!(message.contains("2")),
        other => panic!("expected BadRequest, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn removing_someone_elses_line_is_forbidden() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (owner, _) = common::create_user(&state, "user").await?;
    let (intruder, _) = common::create_user(&state, "user").await?;
    let detail_id = common::create_variant(&state, 10_000, 10).await?;

    let line = cart_service::add_to_cart(
        &state,
        &owner,
        AddToCartRequest {
            product_detail_id: detail_id,
            quantity: 1,
        },
    )
    .await?
    .data
    .expect("cart line");

    let result = cart_service::remove_cart_item(&state, &intruder, line.id).await;
    assert!(matches!(result, Err(AppError::Forbidden)));

    cart_service::remove_cart_item(&state, &owner, line.id).await?;
    Ok(())
}
