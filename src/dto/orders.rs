use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{MonthlyRevenue, OrderDetail, StatusOrder};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutLine {
    pub product_detail_id: Uuid,
    pub quantity: i32,
    /// Unit price the client displayed; rejected when it no longer matches.
    pub price: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutLine>,
    pub total: Option<i64>,
    #[serde(default)]
    pub shipping_cost: i64,
    pub address: Option<String>,
    pub address_id: Option<Uuid>,
    pub payment_method: String,
    pub voucher_id: Option<Uuid>,
}

/// Order joined with its status name and the buyer's contact data.
#[derive(Debug, Clone, Serialize, ToSchema, FromRow)]
pub struct OrderDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub invoice_number: String,
    pub order_date: DateTime<Utc>,
    pub payment_method: String,
    pub payment_status: String,
    pub shipping_address: String,
    pub shipping_cost: i64,
    pub total_amount: i64,
    pub point_earned: i32,
    pub point_used: i32,
    pub status_id: i32,
    pub status_name: String,
    pub voucher_id: Option<Uuid>,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithDetails {
    pub order: OrderDto,
    pub details: Vec<OrderDetail>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusOrderList {
    pub items: Vec<StatusOrder>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RevenueTotal {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_revenue: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthlyRevenueList {
    pub items: Vec<MonthlyRevenue>,
}
