use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::orders::{
        CheckoutLine, CheckoutRequest, MonthlyRevenueList, OrderDto, OrderList, OrderWithDetails,
        RevenueTotal, StatusOrderList,
    },
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        order_details::ActiveModel as OrderDetailActive,
        orders::{ActiveModel as OrderActive, Entity as Orders, Model as OrderModel},
        product_details::{Column as DetailCol, Entity as ProductDetails},
        products::{Column as ProdCol, Entity as Products},
        status_orders::{Column as StatusCol, Entity as StatusOrders},
        users::Entity as Users,
        vouchers::Entity as Vouchers,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_self_or_admin},
    models::{MonthlyRevenue, OrderDetail, StatusOrder},
    notifications::{self, templates},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, RevenueQuery, SortOrder},
    services::{address_service, cart_service, voucher_service},
    state::AppState,
};

pub const PENDING_STATUS_ID: i32 = 1;
pub const CANCELLED_STATUS_ID: i32 = 5;

const ORDER_SELECT: &str = r#"
    SELECT o.id, o.user_id, o.invoice_number, o.order_date, o.payment_method,
           o.payment_status, o.shipping_address, o.shipping_cost, o.total_amount,
           o.point_earned, o.point_used, o.status_id, so.status_name, o.voucher_id,
           u.full_name, u.phone, u.email
    FROM orders o
    JOIN status_orders so ON so.id = o.status_id
    JOIN users u ON u.id = o.user_id
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Cod,
    VnPay,
    Unknown,
}

impl PaymentMethod {
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "COD" => PaymentMethod::Cod,
            "VNPAY" => PaymentMethod::VnPay,
            _ => PaymentMethod::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::Cod => "Thanh toán khi nhận hàng",
            PaymentMethod::VnPay => "Thanh toán bằng VNPay",
            PaymentMethod::Unknown => "Không xác định",
        }
    }

    /// VNPay orders arrive already paid; everything else is collected later.
    pub fn payment_status(self) -> &'static str {
        match self {
            PaymentMethod::VnPay => "Đã thanh toán",
            PaymentMethod::Cod | PaymentMethod::Unknown => "Chưa thanh toán",
        }
    }
}

/// Places an order from the caller's cart.
///
/// Everything runs in one transaction: order and detail rows, the voucher
/// redemption, the stock decrement and clearing the cart either all commit
/// or none do.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithDetails>> {
    validate_checkout(&payload)?;

    let txn = state.orm.begin().await?;

    Users::find_by_id(user.user_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFoundResource("User"))?;

    let shipping_address = match (payload.address_id, payload.address.as_deref()) {
        (Some(address_id), _) => {
            address_service::find_owned(&txn, user.user_id, address_id)
                .await?
                .full_address
        }
        (None, Some(address)) if !address.trim().is_empty() => address.trim().to_string(),
        _ => {
            return Err(AppError::BadRequest(
                "shipping address is required".into(),
            ));
        }
    };

    let cart: HashMap<Uuid, i32> = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|line| (line.product_detail_id, line.quantity))
        .collect();
    ensure_matches_cart(&payload.items, &cart)?;

    let detail_ids: Vec<Uuid> = payload.items.iter().map(|l| l.product_detail_id).collect();
    let details: HashMap<Uuid, _> = ProductDetails::find()
        .filter(DetailCol::Id.is_in(detail_ids))
        .order_by_asc(DetailCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|detail| (detail.id, detail))
        .collect();

    let product_ids: Vec<Uuid> = details.values().map(|d| d.product_id).collect();
    let product_names: HashMap<Uuid, String> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    let mut priced = Vec::with_capacity(payload.items.len());
    for line in &payload.items {
        let detail = details
            .get(&line.product_detail_id)
            .ok_or(AppError::NotFoundResource("Product detail"))?;
        let name = product_names
            .get(&detail.product_id)
            .map(String::as_str)
            .unwrap_or("");
        if !detail.status {
            return Err(AppError::BadRequest(format!("{name} is no longer available")));
        }
        if line.price.is_some_and(|price| price != detail.price) {
            return Err(AppError::BadRequest(format!("Price of {name} has changed")));
        }
        priced.push((line.product_detail_id, detail.price, line.quantity));
    }

    let subtotal = compute_subtotal(priced.iter().map(|(_, price, qty)| (*price, *qty)))?;
    if payload.total.is_some_and(|total| total != subtotal) {
        return Err(AppError::BadRequest(
            "Order total does not match the cart".into(),
        ));
    }

    if let Some(voucher_id) = payload.voucher_id {
        let voucher = Vouchers::find_by_id(voucher_id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFoundResource("Voucher"))?;
        voucher_service::ensure_redeemable(&voucher, Utc::now().date_naive(), subtotal)?;
        voucher_service::decrement_voucher_quantity(&txn, voucher_id).await?;
    }

    let method = PaymentMethod::classify(&payload.payment_method);
    let now = Utc::now();
    let order_id = Uuid::new_v4();
    let total_amount = subtotal
        .checked_add(payload.shipping_cost)
        .ok_or_else(|| AppError::BadRequest("Order total is out of range".into()))?;

    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.user_id),
        invoice_number: Set(build_invoice_number(order_id, now)),
        order_date: Set(now.into()),
        payment_method: Set(method.label().to_string()),
        payment_status: Set(method.payment_status().to_string()),
        shipping_address: Set(shipping_address),
        shipping_cost: Set(payload.shipping_cost),
        total_amount: Set(total_amount),
        point_earned: Set(0),
        point_used: Set(0),
        status_id: Set(PENDING_STATUS_ID),
        voucher_id: Set(payload.voucher_id),
        address_id: Set(payload.address_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    for (product_detail_id, price, quantity) in &priced {
        OrderDetailActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_detail_id: Set(*product_detail_id),
            quantity: Set(*quantity),
            price: Set(*price),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;
    }

    cart_service::update_quantity_checkout(&txn, user.user_id).await?;
    cart_service::clear_cart_after_checkout(&txn, user.user_id).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        invoice = %order.invoice_number,
        total_amount = order.total_amount,
        "order placed"
    );
    audit::record(
        &state.pool,
        Some(user.user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_id": order.id, "voucher_id": payload.voucher_id }),
    )
    .await;

    let data = load_order_with_details(&state.pool, order.id).await?;
    Ok(ApiResponse::success("Checkout success", data, Some(Meta::empty())))
}

pub async fn get_order_details(
    state: &AppState,
    caller: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<OrderWithDetails>> {
    let data = load_order_with_details(&state.pool, order_id).await?;
    // Foreign orders look exactly like missing ones.
    if data.order.user_id != caller.user_id && !caller.is_admin() {
        return Err(AppError::NotFoundResource("Order"));
    }
    Ok(ApiResponse::success("Order found", data, Some(Meta::empty())))
}

/// Orders of `user_id`; contact data is masked unless the caller owns them.
pub async fn get_user_orders(
    state: &AppState,
    caller: &AuthUser,
    user_id: Uuid,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_self_or_admin(caller, user_id)?;

    let orders = sqlx::query_as::<_, OrderDto>(&format!(
        "{ORDER_SELECT} WHERE o.user_id = $1 ORDER BY o.order_date DESC"
    ))
    .bind(user_id)
    .fetch_all(&state.pool)
    .await?;

    let is_owner = caller.user_id == user_id;
    let items = orders
        .into_iter()
        .map(|order| if is_owner { order } else { masked(order) })
        .collect();

    Ok(ApiResponse::success("Orders", OrderList { items }, Some(Meta::empty())))
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    list_orders_page(&state.pool, Some(user.user_id), query).await
}

pub async fn get_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    list_orders_page(&state.pool, None, query).await
}

async fn list_orders_page(
    pool: &DbPool,
    user_id: Option<Uuid>,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let direction = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };

    let items = sqlx::query_as::<_, OrderDto>(&format!(
        "{ORDER_SELECT}
         WHERE ($1::uuid IS NULL OR o.user_id = $1)
           AND ($2::int IS NULL OR o.status_id = $2)
         ORDER BY o.order_date {direction}
         LIMIT $3 OFFSET $4"
    ))
    .bind(user_id)
    .bind(query.status_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM orders o
        WHERE ($1::uuid IS NULL OR o.user_id = $1)
          AND ($2::int IS NULL OR o.status_id = $2)
        "#,
    )
    .bind(user_id)
    .bind(query.status_id)
    .fetch_one(pool)
    .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

/// Any existing status id is accepted; there is no transition graph.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    status_id: i32,
) -> AppResult<ApiResponse<OrderDto>> {
    ensure_admin(user)?;

    StatusOrders::find_by_id(status_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFoundResource("Order status"))?;

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFoundResource("Order"))?;

    let mut active: OrderActive = order.into();
    active.status_id = Set(status_id);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "status_id": status_id }),
    )
    .await;

    let dto = fetch_order_dto(&state.pool, order.id).await?;
    Ok(ApiResponse::success("Order updated", dto, Some(Meta::empty())))
}

/// Forces the cancelled status. Returns whether this call moved the order
/// into it; cancelling a cancelled order is a no-op.
pub async fn cancel_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<(OrderModel, bool)> {
    let order = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFoundResource("Order"))?;

    StatusOrders::find_by_id(CANCELLED_STATUS_ID)
        .one(conn)
        .await?
        .ok_or(AppError::NotFoundResource("Order status"))?;

    if order.status_id == CANCELLED_STATUS_ID {
        return Ok((order, false));
    }

    let mut active: OrderActive = order.into();
    active.status_id = Set(CANCELLED_STATUS_ID);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(conn).await?;
    Ok((order, true))
}

pub async fn process_order_cancellation(
    state: &AppState,
    caller: &AuthUser,
    order_id: Uuid,
    reason: Option<String>,
) -> AppResult<ApiResponse<OrderDto>> {
    let owner = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFoundResource("Order"))?
        .user_id;
    ensure_self_or_admin(caller, owner)?;

    let txn = state.orm.begin().await?;
    let (order, transitioned) = cancel_order(&txn, order_id).await?;
    txn.commit().await?;

    if transitioned {
        audit::record(
            &state.pool,
            Some(caller.user_id),
            "order_cancel",
            "orders",
            serde_json::json!({ "order_id": order.id, "reason": reason }),
        )
        .await;

        if let Err(err) = notify_cancellation(state, order.id, reason.as_deref()).await {
            tracing::warn!(order_id = %order.id, error = %err, "cancellation email not queued");
        }
    }

    let dto = fetch_order_dto(&state.pool, order.id).await?;
    Ok(ApiResponse::success("Order cancelled", dto, Some(Meta::empty())))
}

async fn notify_cancellation(
    state: &AppState,
    order_id: Uuid,
    reason: Option<&str>,
) -> AppResult<()> {
    let data = load_order_with_details(&state.pool, order_id).await?;
    let email = templates::order_cancelled(&data.order, &data.details, reason)
        .map_err(AppError::internal)?;
    notifications::enqueue(&state.orm, email).await?;
    state.outbox_signal.notify_one();
    Ok(())
}

pub async fn get_revenue_between_dates(
    state: &AppState,
    user: &AuthUser,
    query: RevenueQuery,
) -> AppResult<ApiResponse<RevenueTotal>> {
    ensure_admin(user)?;
    let (from, until) = revenue_window(query.start_date, query.end_date)?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(total_amount), 0)::bigint
        FROM orders
        WHERE order_date >= $1 AND order_date < $2
        "#,
    )
    .bind(from)
    .bind(until)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Revenue",
        RevenueTotal {
            start_date: query.start_date,
            end_date: query.end_date,
            total_revenue: total.0,
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_last_12_months_revenue(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<MonthlyRevenueList>> {
    ensure_admin(user)?;
    let items = sqlx::query_as::<_, MonthlyRevenue>(
        r#"
        SELECT EXTRACT(YEAR FROM order_date)::int AS year,
               EXTRACT(MONTH FROM order_date)::int AS month,
               COALESCE(SUM(total_amount), 0)::bigint AS total_revenue
        FROM orders
        WHERE order_date >= date_trunc('month', now()) - INTERVAL '11 months'
        GROUP BY 1, 2
        ORDER BY 1 DESC, 2 DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Revenue by month",
        MonthlyRevenueList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_status_orders(state: &AppState) -> AppResult<ApiResponse<StatusOrderList>> {
    let items = StatusOrders::find()
        .order_by_asc(StatusCol::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|status| StatusOrder {
            id: status.id,
            status_name: status.status_name,
        })
        .collect();

    Ok(ApiResponse::success(
        "Order statuses",
        StatusOrderList { items },
        Some(Meta::empty()),
    ))
}

pub(crate) async fn fetch_order_dto(pool: &DbPool, order_id: Uuid) -> AppResult<OrderDto> {
    sqlx::query_as::<_, OrderDto>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
        .bind(order_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFoundResource("Order"))
}

async fn load_order_with_details(pool: &DbPool, order_id: Uuid) -> AppResult<OrderWithDetails> {
    let order = fetch_order_dto(pool, order_id).await?;
    let details = sqlx::query_as::<_, OrderDetail>(
        r#"
        SELECT od.id, od.order_id, od.product_detail_id,
               p.name AS product_name, b.name AS brand_name, pc.name AS category_name,
               c.name AS color_name, s.name AS size_name, w.name AS weight_name,
               od.quantity, od.price
        FROM order_details od
        JOIN product_details pd ON pd.id = od.product_detail_id
        JOIN products p ON p.id = pd.product_id
        LEFT JOIN brands b ON b.id = p.brand_id
        LEFT JOIN product_categories pc ON pc.id = p.category_id
        LEFT JOIN product_colors c ON c.id = pd.color_id
        LEFT JOIN product_sizes s ON s.id = pd.size_id
        LEFT JOIN product_weights w ON w.id = pd.weight_id
        WHERE od.order_id = $1
        ORDER BY od.created_at, od.id
        "#,
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    Ok(OrderWithDetails { order, details })
}

fn validate_checkout(payload: &CheckoutRequest) -> AppResult<()> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Order has no items".into()));
    }
    if payload.items.iter().any(|line| line.quantity <= 0) {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".into(),
        ));
    }
    if payload.shipping_cost < 0 {
        return Err(AppError::BadRequest(
            "shipping cost must not be negative".into(),
        ));
    }
    Ok(())
}

/// The checkout must be a snapshot of the cart: same lines, same quantities.
fn ensure_matches_cart(items: &[CheckoutLine], cart: &HashMap<Uuid, i32>) -> AppResult<()> {
    let mismatch = || AppError::BadRequest("Checkout items do not match the cart".into());

    let mut seen = HashSet::with_capacity(items.len());
    if items.len() != cart.len() {
        return Err(mismatch());
    }
    for line in items {
        if !seen.insert(line.product_detail_id) {
            return Err(mismatch());
        }
        if cart.get(&line.product_detail_id) != Some(&line.quantity) {
            return Err(mismatch());
        }
    }
    Ok(())
}

fn compute_subtotal(lines: impl IntoIterator<Item = (i64, i32)>) -> AppResult<i64> {
    lines.into_iter().try_fold(0_i64, |acc, (price, quantity)| {
        price
            .checked_mul(i64::from(quantity))
            .and_then(|line_total| acc.checked_add(line_total))
            .ok_or_else(|| AppError::BadRequest("Order total is out of range".into()))
    })
}

/// `[start 00:00, end + 1 day 00:00)` in UTC.
fn revenue_window(
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    if end < start {
        return Err(AppError::BadRequest(
            "end_date must not be before start_date".into(),
        ));
    }
    let from = start.and_time(NaiveTime::MIN).and_utc();
    let until = end
        .checked_add_days(Days::new(1))
        .ok_or_else(|| AppError::BadRequest("end_date is out of range".into()))?
        .and_time(NaiveTime::MIN)
        .and_utc();
    Ok((from, until))
}

fn masked(mut order: OrderDto) -> OrderDto {
    order.phone = order.phone.map(|phone| mask_phone(&phone));
    order.email = mask_email(&order.email);
    order
}

/// `0901234567` -> `090****567`; shorter values are returned unchanged.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() < 10 {
        return phone.to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    format!("{head}****{tail}")
}

/// `nguyen@example.com` -> `n****@example.com`; a local part of one
/// character (or no `@`) is returned unchanged.
pub fn mask_email(email: &str) -> String {
    match email.find('@') {
        Some(at) if email[..at].chars().count() > 1 => {
            let first = email.chars().next().unwrap_or_default();
            format!("{first}****{}", &email[at..])
        }
        _ => email.to_string(),
    }
}

pub fn build_invoice_number(order_id: Uuid, now: DateTime<Utc>) -> String {
    let suffix = order_id.simple().to_string();
    format!("INV-{}-{}", now.format("%Y%m%d"), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn line(id: Uuid, quantity: i32) -> CheckoutLine {
        CheckoutLine {
            product_detail_id: id,
            quantity,
            price: None,
        }
    }

    #[test]
    fn phone_keeps_first_and_last_three() {
        assert_eq!(mask_phone("0901234567"), "090****567");
        assert_eq!(mask_phone("84901234567"), "849****567");
        assert_eq!(mask_phone("123456789"), "123456789");
        assert_eq!(mask_phone(""), "");
    }

    #[test]
    fn email_keeps_first_char_and_domain() {
        assert_eq!(mask_email("nguyen@example.com"), "n****@example.com");
        assert_eq!(mask_email("ab@x.vn"), "a****@x.vn");
        assert_eq!(mask_email("a@x.vn"), "a@x.vn");
        assert_eq!(mask_email("@x.vn"), "@x.vn");
        assert_eq!(mask_email("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn payment_method_is_classified_case_insensitively() {
        assert_eq!(PaymentMethod::classify("cod"), PaymentMethod::Cod);
        assert_eq!(PaymentMethod::classify(" VNPay "), PaymentMethod::VnPay);
        assert_eq!(PaymentMethod::classify("momo"), PaymentMethod::Unknown);

        assert_eq!(PaymentMethod::Cod.label(), "Thanh toán khi nhận hàng");
        assert_eq!(PaymentMethod::Cod.payment_status(), "Chưa thanh toán");
        assert_eq!(PaymentMethod::VnPay.label(), "Thanh toán bằng VNPay");
        assert_eq!(PaymentMethod::VnPay.payment_status(), "Đã thanh toán");
        assert_eq!(PaymentMethod::Unknown.label(), "Không xác định");
        assert_eq!(PaymentMethod::Unknown.payment_status(), "Chưa thanh toán");
    }

    #[test]
    fn invoice_number_has_date_and_short_id() {
        let id = Uuid::parse_str("6f9619ff-8b86-d011-b42d-00c04fc964ff").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 11, 5, 8, 0, 0).unwrap();
        assert_eq!(build_invoice_number(id, now), "INV-20241105-6f9619ff");
    }

    #[test]
    fn subtotal_sums_price_times_quantity() {
        assert_eq!(compute_subtotal([(30, 2), (15, 2)]).unwrap(), 90);
        assert_eq!(compute_subtotal(std::iter::empty()).unwrap(), 0);
        assert!(compute_subtotal([(i64::MAX, 2)]).is_err());
    }

    #[test]
    fn checkout_lines_must_mirror_the_cart() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let cart = HashMap::from([(a, 2), (b, 1)]);

        assert!(ensure_matches_cart(&[line(a, 2), line(b, 1)], &cart).is_ok());
        assert!(ensure_matches_cart(&[line(a, 2)], &cart).is_err());
        assert!(ensure_matches_cart(&[line(a, 3), line(b, 1)], &cart).is_err());
        assert!(ensure_matches_cart(&[line(a, 2), line(a, 2)], &cart).is_err());
        assert!(ensure_matches_cart(&[line(a, 2), line(Uuid::new_v4(), 1)], &cart).is_err());
    }

    #[test]
    fn checkout_payload_is_validated() {
        let base = || CheckoutRequest {
            items: vec![line(Uuid::new_v4(), 1)],
            total: None,
            shipping_cost: 10,
            address: Some("somewhere".into()),
            address_id: None,
            payment_method: "COD".into(),
            voucher_id: None,
        };
        assert!(validate_checkout(&base()).is_ok());
        assert!(validate_checkout(&CheckoutRequest { items: vec![], ..base() }).is_err());
        assert!(validate_checkout(&CheckoutRequest { shipping_cost: -1, ..base() }).is_err());
        assert!(
            validate_checkout(&CheckoutRequest {
                items: vec![line(Uuid::new_v4(), 0)],
                ..base()
            })
            .is_err()
        );
    }

    #[test]
    fn revenue_window_includes_whole_end_day() {
        let start = NaiveDate::from_ymd_opt(2024, 11, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 11, 30).unwrap();
        let (from, until) = revenue_window(start, end).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap());
        assert_eq!(until, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert!(revenue_window(end, start).is_err());
    }

    #[test]
    fn revenue_window_rejects_the_last_representable_day() {
        let err = revenue_window(NaiveDate::MIN, NaiveDate::MAX).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn masking_only_touches_contact_fields() {
        let order = OrderDto {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            invoice_number: "INV-1".into(),
            order_date: Utc::now(),
            payment_method: PaymentMethod::Cod.label().into(),
            payment_status: PaymentMethod::Cod.payment_status().into(),
            shipping_address: "addr".into(),
            shipping_cost: 10,
            total_amount: 100,
            point_earned: 0,
            point_used: 0,
            status_id: PENDING_STATUS_ID,
            status_name: "Chờ xác nhận".into(),
            voucher_id: None,
            full_name: "Tran Thi B".into(),
            phone: Some("0912345678".into()),
            email: "tranb@example.com".into(),
        };
        let masked = masked(order);
        assert_eq!(masked.phone.as_deref(), Some("091****678"));
        assert_eq!(masked.email, "t****@example.com");
        assert_eq!(masked.full_name, "Tran Thi B");
    }
}
