mod common;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use petcare_api::{
    dto::{
        cart::AddToCartRequest,
        orders::{CheckoutLine, CheckoutRequest},
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::RevenueQuery,
    services::{cart_service, order_service, voucher_service},
    state::AppState,
};
use uuid::Uuid;

async fn fill_cart(state: &AppState, user: &AuthUser, lines: &[(Uuid, i32)]) -> anyhow::Result<()> {
    for (product_detail_id, quantity) in lines {
        cart_service::add_to_cart(
            state,
            user,
            AddToCartRequest {
                product_detail_id: *product_detail_id,
                quantity: *quantity,
            },
        )
        .await?;
    }
    Ok(())
}

fn request(lines: &[(Uuid, i32)], shipping_cost: i64) -> CheckoutRequest {
    CheckoutRequest {
        items: lines
            .iter()
            .map(|(product_detail_id, quantity)| CheckoutLine {
                product_detail_id: *product_detail_id,
                quantity: *quantity,
                price: None,
            })
            .collect(),
        total: None,
        shipping_cost,
        address: Some("12 Lê Lợi, Bến Nghé, Quận 1, TP. Hồ Chí Minh".into()),
        address_id: None,
        payment_method: "COD".into(),
        voucher_id: None,
    }
}

async fn order_count(state: &AppState, user_id: Uuid) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(count)
}

async fn insert_voucher(
    state: &AppState,
    start_date: NaiveDate,
    end_date: NaiveDate,
    quantity: i32,
    condition: i64,
) -> anyhow::Result<Uuid> {
    let (voucher_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO vouchers (name, start_date, end_date, quantity, percents, condition)
        VALUES ($1, $2, $3, $4, 10, $5)
        RETURNING id
        "#,
    )
    .bind(common::unique("GIAMGIA"))
    .bind(start_date)
    .bind(end_date)
    .bind(quantity)
    .bind(condition)
    .fetch_one(&state.pool)
    .await?;
    Ok(voucher_id)
}

async fn voucher_quantity(state: &AppState, voucher_id: Uuid) -> anyhow::Result<i32> {
    let (quantity,): (i32,) = sqlx::query_as("SELECT quantity FROM vouchers WHERE id = $1")
        .bind(voucher_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(quantity)
}

#[tokio::test]
async fn checkout_totals_decrements_stock_and_clears_cart() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (user, _) = common::create_user(&state, "user").await?;
    let food = common::create_variant(&state, 30, 10).await?;
    let litter = common::create_variant(&state, 15, 4).await?;
    let lines = [(food, 2), (litter, 2)];
    fill_cart(&state, &user, &lines).await?;

    let placed = order_service::checkout(&state, &user, request(&lines, 10))
        .await?
        .data
        .expect("order");

    assert_eq!(placed.order.total_amount, 100);
    assert_eq!(placed.order.shipping_cost, 10);
    assert_eq!(placed.order.status_id, order_service::PENDING_STATUS_ID);
    assert_eq!(placed.details.len(), 2);
    assert_eq!(common::stock_of(&state, food).await?, 8);
    assert_eq!(common::stock_of(&state, litter).await?, 2);

    let (remaining,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(remaining, 0);
    Ok(())
}

#[tokio::test]
async fn insufficient_stock_leaves_nothing_behind() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (user, _) = common::create_user(&state, "user").await?;
    let plenty = common::create_variant(&state, 40, 10).await?;
    let scarce = common::create_variant(&state, 25, 5).await?;
    let lines = [(plenty, 1), (scarce, 3)];
    fill_cart(&state, &user, &lines).await?;

    // Someone else bought most of it after it went into the cart.
    sqlx::query("UPDATE product_details SET quantity = 1 WHERE id = $1")
        .bind(scarce)
        .execute(&state.pool)
        .await?;

    let result = order_service::checkout(&state, &user, request(&lines, 10)).await;
    match result {
        Err(AppError::BadRequest(message)) => assert!(message.contains("Not enough stock")),
        other => panic!("expected BadRequest, got {:?}", other.map(|r| r.message)),
    }

    assert_eq!(order_count(&state, user.user_id).await?, 0);
    assert_eq!(common::stock_of(&state, plenty).await?, 10);
    assert_eq!(common::stock_of(&state, scarce).await?, 1);
    Ok(())
}

#[tokio::test]
async fn voucher_with_one_use_decrements_once() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (admin, _) = common::create_user(&state, "admin").await?;
    let today = Utc::now().date_naive();

    let (voucher_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO vouchers (name, start_date, end_date, quantity, percents)
        VALUES ($1, $2, $3, 1, 10)
        RETURNING id
        "#,
    )
    .bind(common::unique("MEOMEO"))
    .bind(today - Duration::days(1))
    .bind(today + Duration::days(30))
    .fetch_one(&state.pool)
    .await?;

    let first = voucher_service::decrement(&state, &admin, voucher_id).await?;
    assert_eq!(first.data.map(|v| v.quantity), Some(0));

    let second = voucher_service::decrement(&state, &admin, voucher_id).await;
    assert!(matches!(second, Err(AppError::BadRequest(_))));

    let missing = voucher_service::decrement(&state, &admin, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::NotFoundResource(_))));
    Ok(())
}

#[tokio::test]
async fn cancelling_twice_succeeds_and_mails_once() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (user, email) = common::create_user(&state, "user").await?;
    let detail = common::create_variant(&state, 90, 3).await?;
    let lines = [(detail, 1)];
    fill_cart(&state, &user, &lines).await?;

    let placed = order_service::checkout(&state, &user, request(&lines, 10))
        .await?
        .data
        .expect("order");
    let order_id = placed.order.id;

    for _ in 0..2 {
        let cancelled = order_service::process_order_cancellation(
            &state,
            &user,
            order_id,
            Some("Đặt nhầm sản phẩm".into()),
        )
        .await?
        .data
        .expect("order");
        assert_eq!(cancelled.status_id, order_service::CANCELLED_STATUS_ID);
    }

    let (mails,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM email_outbox WHERE recipient = $1 AND subject LIKE '%' || $2 || '%'",
    )
    .bind(&email)
    .bind(&placed.order.invoice_number)
    .fetch_one(&state.pool)
    .await?;
    assert_eq!(mails, 1);
    Ok(())
}

#[tokio::test]
async fn other_users_cannot_see_an_order() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (owner, _) = common::create_user(&state, "user").await?;
    let (stranger, _) = common::create_user(&state, "user").await?;
    let detail = common::create_variant(&state, 55, 2).await?;
    let lines = [(detail, 1)];
    fill_cart(&state, &owner, &lines).await?;

    let placed = order_service::checkout(&state, &owner, request(&lines, 0))
        .await?
        .data
        .expect("order");

    let hidden = order_service::get_order_details(&state, &stranger, placed.order.id).await;
    assert!(matches!(hidden, Err(AppError::NotFoundResource(_))));

    let seen = order_service::get_order_details(&state, &owner, placed.order.id).await?;
    assert_eq!(seen.data.map(|o| o.details.len()), Some(1));
    Ok(())
}

#[tokio::test]
async fn checkout_with_voucher_uses_one_redemption() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (user, _) = common::create_user(&state, "user").await?;
    let today = Utc::now().date_naive();
    let voucher_id =
        insert_voucher(&state, today - Duration::days(1), today + Duration::days(7), 2, 50).await?;
    let detail = common::create_variant(&state, 40, 5).await?;
    let lines = [(detail, 2)];
    fill_cart(&state, &user, &lines).await?;

    let mut payload = request(&lines, 10);
    payload.voucher_id = Some(voucher_id);
    let placed = order_service::checkout(&state, &user, payload)
        .await?
        .data
        .expect("order");

    assert_eq!(placed.order.voucher_id, Some(voucher_id));
    assert_eq!(placed.order.total_amount, 90);
    assert_eq!(voucher_quantity(&state, voucher_id).await?, 1);
    assert_eq!(common::stock_of(&state, detail).await?, 3);
    Ok(())
}

#[tokio::test]
async fn unusable_voucher_rolls_back_the_whole_checkout() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (user, _) = common::create_user(&state, "user").await?;
    let today = Utc::now().date_naive();
    let detail = common::create_variant(&state, 40, 5).await?;
    let lines = [(detail, 2)];
    fill_cart(&state, &user, &lines).await?;

    let expired =
        insert_voucher(&state, today - Duration::days(10), today - Duration::days(5), 3, 0).await?;
    let above_subtotal =
        insert_voucher(&state, today - Duration::days(1), today + Duration::days(7), 3, 81).await?;
    let exhausted =
        insert_voucher(&state, today - Duration::days(1), today + Duration::days(7), 0, 0).await?;

    for (voucher_id, quantity_before) in [(expired, 3), (above_subtotal, 3), (exhausted, 0)] {
        let mut payload = request(&lines, 10);
        payload.voucher_id = Some(voucher_id);
        let result = order_service::checkout(&state, &user, payload).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        assert_eq!(order_count(&state, user.user_id).await?, 0);
        assert_eq!(common::stock_of(&state, detail).await?, 5);
        assert_eq!(voucher_quantity(&state, voucher_id).await?, quantity_before);
    }

    let (in_cart,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(in_cart, 1);
    Ok(())
}

#[tokio::test]
async fn user_orders_hide_contact_details_from_admins() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (owner, email) = common::create_user(&state, "user").await?;
    let (admin, _) = common::create_user(&state, "admin").await?;
    let detail = common::create_variant(&state, 20, 3).await?;
    let lines = [(detail, 1)];
    fill_cart(&state, &owner, &lines).await?;
    order_service::checkout(&state, &owner, request(&lines, 0)).await?;

    let own = order_service::get_user_orders(&state, &owner, owner.user_id)
        .await?
        .data
        .expect("orders");
    assert_eq!(own.items.len(), 1);
    assert_eq!(own.items[0].phone.as_deref(), Some("0901234567"));
    assert_eq!(own.items[0].email, email);

    let seen_by_admin = order_service::get_user_orders(&state, &admin, owner.user_id)
        .await?
        .data
        .expect("orders");
    assert_eq!(seen_by_admin.items.len(), 1);
    assert_eq!(seen_by_admin.items[0].phone.as_deref(), Some("090****567"));
    assert_eq!(
        seen_by_admin.items[0].email,
        order_service::mask_email(&email)
    );
    assert_ne!(seen_by_admin.items[0].email, email);
    Ok(())
}

#[tokio::test]
async fn unknown_status_id_is_not_found() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (owner, _) = common::create_user(&state, "user").await?;
    let (admin, _) = common::create_user(&state, "admin").await?;
    let detail = common::create_variant(&state, 20, 3).await?;
    let lines = [(detail, 1)];
    fill_cart(&state, &owner, &lines).await?;
    let placed = order_service::checkout(&state, &owner, request(&lines, 0))
        .await?
        .data
        .expect("order");

    let result = order_service::update_order_status(&state, &admin, placed.order.id, 9_999).await;
    assert!(matches!(result, Err(AppError::NotFoundResource(_))));

    let (status_id,): (i32,) = sqlx::query_as("SELECT status_id FROM orders WHERE id = $1")
        .bind(placed.order.id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(status_id, order_service::PENDING_STATUS_ID);
    Ok(())
}

#[tokio::test]
async fn revenue_includes_the_whole_end_day() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (user, _) = common::create_user(&state, "user").await?;
    let (admin, _) = common::create_user(&state, "admin").await?;
    let start = NaiveDate::from_ymd_opt(2001, 3, 10).expect("date");
    let end = NaiveDate::from_ymd_opt(2001, 3, 12).expect("date");
    let query = || RevenueQuery {
        start_date: start,
        end_date: end,
    };

    let before = order_service::get_revenue_between_dates(&state, &admin, query())
        .await?
        .data
        .expect("revenue")
        .total_revenue;

    let placed_at = [
        (Utc.with_ymd_and_hms(2001, 3, 9, 23, 59, 59).unwrap(), 1_000_i64),
        (Utc.with_ymd_and_hms(2001, 3, 10, 0, 0, 0).unwrap(), 200),
        (Utc.with_ymd_and_hms(2001, 3, 12, 23, 59, 59).unwrap(), 30),
        (Utc.with_ymd_and_hms(2001, 3, 13, 0, 0, 0).unwrap(), 4_000),
    ];
    for (order_date, total_amount) in placed_at {
        sqlx::query(
            r#"
            INSERT INTO orders (user_id, invoice_number, order_date, payment_method,
                                payment_status, shipping_address, shipping_cost,
                                total_amount, status_id)
            VALUES ($1, $2, $3, 'COD', 'Chưa thanh toán', 'Hà Nội', 0, $4, $5)
            "#,
        )
        .bind(user.user_id)
        .bind(common::unique("INV"))
        .bind(order_date)
        .bind(total_amount)
        .bind(order_service::PENDING_STATUS_ID)
        .execute(&state.pool)
        .await?;
    }

    let after = order_service::get_revenue_between_dates(&state, &admin, query())
        .await?
        .data
        .expect("revenue")
        .total_revenue;
    assert_eq!(after - before, 230);
    Ok(())
}
