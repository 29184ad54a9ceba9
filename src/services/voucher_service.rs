use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::vouchers::{CreateVoucherRequest, UpdateVoucherRequest, VoucherList},
    entity::vouchers::{ActiveModel, Column, Entity as Vouchers, Model as VoucherModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Voucher,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_vouchers(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<VoucherList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Vouchers::find().order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(voucher_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Vouchers", VoucherList { items }, Some(meta)))
}

pub async fn create_voucher(
    state: &AppState,
    user: &AuthUser,
    payload: CreateVoucherRequest,
) -> AppResult<ApiResponse<Voucher>> {
    ensure_admin(user)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    validate_terms(
        payload.start_date,
        payload.end_date,
        payload.quantity,
        payload.percents,
        payload.condition,
    )?;

    let voucher = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        start_date: Set(payload.start_date),
        end_date: Set(payload.end_date),
        quantity: Set(payload.quantity),
        percents: Set(payload.percents),
        condition: Set(payload.condition),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "voucher_create",
        "vouchers",
        serde_json::json!({ "voucher_id": voucher.id, "name": voucher.name }),
    )
    .await;

    Ok(ApiResponse::success(
        "Voucher created",
        voucher_from_entity(voucher),
        Some(Meta::empty()),
    ))
}

pub async fn update_voucher(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateVoucherRequest,
) -> AppResult<ApiResponse<Voucher>> {
    ensure_admin(user)?;
    let existing = Vouchers::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFoundResource("Voucher"))?;

    validate_terms(
        payload.start_date.unwrap_or(existing.start_date),
        payload.end_date.unwrap_or(existing.end_date),
        payload.quantity.unwrap_or(existing.quantity),
        payload.percents.unwrap_or(existing.percents),
        payload.condition.unwrap_or(existing.condition),
    )?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("name must not be empty".into()));
        }
        active.name = Set(name);
    }
    if let Some(start_date) = payload.start_date {
        active.start_date = Set(start_date);
    }
    if let Some(end_date) = payload.end_date {
        active.end_date = Set(end_date);
    }
    if let Some(quantity) = payload.quantity {
        active.quantity = Set(quantity);
    }
    if let Some(percents) = payload.percents {
        active.percents = Set(percents);
    }
    if let Some(condition) = payload.condition {
        active.condition = Set(condition);
    }
    let voucher = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Voucher updated",
        voucher_from_entity(voucher),
        Some(Meta::empty()),
    ))
}

/// Vouchers already used by an order are protected by the foreign key (409).
pub async fn delete_voucher(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Vouchers::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFoundResource("Voucher"));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "voucher_delete",
        "vouchers",
        serde_json::json!({ "voucher_id": id }),
    )
    .await;

    Ok(ApiResponse::done("Voucher deleted"))
}

/// One conditional UPDATE: concurrent redemptions can never push quantity below zero.
pub async fn decrement_voucher_quantity<C: ConnectionTrait>(
    conn: &C,
    voucher_id: Uuid,
) -> AppResult<VoucherModel> {
    let result = Vouchers::update_many()
        .col_expr(Column::Quantity, Expr::col(Column::Quantity).sub(1))
        .filter(Column::Id.eq(voucher_id))
        .filter(Column::Quantity.gt(0))
        .exec(conn)
        .await?;

    let voucher = Vouchers::find_by_id(voucher_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFoundResource("Voucher"))?;

    if result.rows_affected == 0 {
        return Err(AppError::BadRequest("Voucher is out of stock".into()));
    }
    Ok(voucher)
}

pub async fn decrement(
    state: &AppState,
    user: &AuthUser,
    voucher_id: Uuid,
) -> AppResult<ApiResponse<Voucher>> {
    ensure_admin(user)?;
    let voucher = decrement_voucher_quantity(&state.orm, voucher_id).await?;
    Ok(ApiResponse::success(
        "Voucher quantity decremented",
        voucher_from_entity(voucher),
        Some(Meta::empty()),
    ))
}

fn validate_terms(
    start_date: NaiveDate,
    end_date: NaiveDate,
    quantity: i32,
    percents: i32,
    condition: i64,
) -> AppResult<()> {
    if end_date < start_date {
        return Err(AppError::BadRequest(
            "end_date must not be before start_date".into(),
        ));
    }
    if quantity < 0 {
        return Err(AppError::BadRequest("quantity must not be negative".into()));
    }
    if !(0..=100).contains(&percents) {
        return Err(AppError::BadRequest("percents must be between 0 and 100".into()));
    }
    if condition < 0 {
        return Err(AppError::BadRequest("condition must not be negative".into()));
    }
    Ok(())
}

/// Date window and minimum subtotal; quantity is enforced by the decrement itself.
pub(crate) fn ensure_redeemable(
    voucher: &VoucherModel,
    today: NaiveDate,
    subtotal: i64,
) -> AppResult<()> {
    if today < voucher.start_date || today > voucher.end_date {
        return Err(AppError::BadRequest("Voucher is not active".into()));
    }
    if subtotal < voucher.condition {
        return Err(AppError::BadRequest(format!(
            "Order subtotal must be at least {} to use this voucher",
            voucher.condition
        )));
    }
    Ok(())
}

pub(crate) fn voucher_from_entity(model: VoucherModel) -> Voucher {
    Voucher {
        id: model.id,
        name: model.name,
        start_date: model.start_date,
        end_date: model.end_date,
        quantity: model.quantity,
        percents: model.percents,
        condition: model.condition,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn voucher() -> VoucherModel {
        VoucherModel {
            id: Uuid::new_v4(),
            name: "PET10".into(),
            start_date: date(2024, 11, 1),
            end_date: date(2024, 11, 30),
            quantity: 3,
            percents: 10,
            condition: 200_000,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn terms_are_validated() {
        let start = date(2024, 1, 1);
        assert!(validate_terms(start, start, 0, 0, 0).is_ok());
        assert!(validate_terms(start, date(2023, 12, 31), 1, 10, 0).is_err());
        assert!(validate_terms(start, start, -1, 10, 0).is_err());
        assert!(validate_terms(start, start, 1, 101, 0).is_err());
        assert!(validate_terms(start, start, 1, -5, 0).is_err());
    }

    #[test]
    fn voucher_applies_inside_window_above_condition() {
        let v = voucher();
        assert!(ensure_redeemable(&v, date(2024, 11, 1), 200_000).is_ok());
        assert!(ensure_redeemable(&v, date(2024, 11, 30), 500_000).is_ok());
        assert!(ensure_redeemable(&v, date(2024, 10, 31), 500_000).is_err());
        assert!(ensure_redeemable(&v, date(2024, 12, 1), 500_000).is_err());
        assert!(ensure_redeemable(&v, date(2024, 11, 15), 199_999).is_err());
    }
}
