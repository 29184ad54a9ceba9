use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Public view of an account; the password hash never leaves the service layer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub status: bool,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Shared shape of brands, categories, colors, sizes, weights and roles.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct LookupItem {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub brand_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct ProductDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub color_id: Option<Uuid>,
    pub color_name: Option<String>,
    pub size_id: Option<Uuid>,
    pub size_name: Option<String>,
    pub weight_id: Option<Uuid>,
    pub weight_name: Option<String>,
    pub price: i64,
    pub quantity: i32,
    pub status: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_detail_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// A cart line joined with what the buyer needs to see.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct CartLine {
    pub id: Uuid,
    pub product_detail_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub price: i64,
    pub quantity: i32,
    pub available: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Favorite {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct OrderDetail {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_detail_id: Uuid,
    pub product_name: String,
    pub brand_name: Option<String>,
    pub category_name: Option<String>,
    pub color_name: Option<String>,
    pub size_name: Option<String>,
    pub weight_name: Option<String>,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusOrder {
    pub id: i32,
    pub status_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Voucher {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub quantity: i32,
    pub percents: i32,
    pub condition: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub street: String,
    pub ward: String,
    pub district: String,
    pub province: String,
    pub full_address: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct MonthlyRevenue {
    pub year: i32,
    pub month: i32,
    pub total_revenue: i64,
}
