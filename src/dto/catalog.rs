use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{LookupItem, Product, ProductDetail};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LookupRequest {
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LookupList {
    pub items: Vec<LookupItem>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub brand_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub brand_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductDetailRequest {
    pub product_id: Uuid,
    pub color_id: Option<Uuid>,
    pub size_id: Option<Uuid>,
    pub weight_id: Option<Uuid>,
    pub price: i64,
    pub quantity: i32,
    pub status: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductDetailRequest {
    pub color_id: Option<Uuid>,
    pub size_id: Option<Uuid>,
    pub weight_id: Option<Uuid>,
    pub price: Option<i64>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStatusRequest {
    pub status: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetailList {
    pub items: Vec<ProductDetail>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryAdjustRequest {
    pub delta: i32,
}
