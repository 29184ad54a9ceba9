use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Voucher;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVoucherRequest {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub quantity: i32,
    pub percents: i32,
    #[serde(default)]
    pub condition: i64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateVoucherRequest {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub quantity: Option<i32>,
    pub percents: Option<i32>,
    pub condition: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VoucherList {
    pub items: Vec<Voucher>,
}
