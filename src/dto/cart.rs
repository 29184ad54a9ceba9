use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::CartLine;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_detail_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartRequest {
    pub product_detail_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartList {
    pub items: Vec<CartLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockUpdate {
    pub product_detail_id: Uuid,
    pub remaining: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockUpdateList {
    pub items: Vec<StockUpdate>,
}
