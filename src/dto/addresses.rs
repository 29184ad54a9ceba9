use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Address;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddressRequest {
    pub street: String,
    pub ward: String,
    pub district: String,
    pub province: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressList {
    pub items: Vec<Address>,
}
