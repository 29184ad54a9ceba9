use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    dto::addresses::{AddressList, AddressRequest},
    entity::addresses::{ActiveModel, Column, Entity as Addresses, Model as AddressModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Address,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_addresses(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AddressList>> {
    let items = Addresses::find()
        .filter(Column::UserId.eq(user.user_id))
        .order_by_desc(Column::IsDefault)
        .order_by_asc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(address_from_entity)
        .collect();

    Ok(ApiResponse::success("OK", AddressList { items }, Some(Meta::empty())))
}

/// The default address, else the oldest one.
pub async fn first_address(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Address>> {
    let address = Addresses::find()
        .filter(Column::UserId.eq(user.user_id))
        .order_by_desc(Column::IsDefault)
        .order_by_asc(Column::CreatedAt)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFoundResource("Address"))?;

    Ok(ApiResponse::success(
        "OK",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

pub async fn add_address(
    state: &AppState,
    user: &AuthUser,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    let parts = normalized_parts(&payload)?;

    let txn = state.orm.begin().await?;
    if payload.is_default {
        clear_defaults(&txn, user.user_id, None).await?;
    }

    let address = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        full_address: Set(format_full_address(&parts)),
        street: Set(parts.street),
        ward: Set(parts.ward),
        district: Set(parts.district),
        province: Set(parts.province),
        is_default: Set(payload.is_default),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Address added",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

pub async fn update_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    let parts = normalized_parts(&payload)?;

    let txn = state.orm.begin().await?;
    let existing = Addresses::find_by_id(id)
        .filter(Column::UserId.eq(user.user_id))
        .one(&txn)
        .await?
        .ok_or(AppError::NotFoundResource("Address"))?;

    if payload.is_default {
        clear_defaults(&txn, user.user_id, Some(existing.id)).await?;
    }

    let mut active: ActiveModel = existing.into();
    active.full_address = Set(format_full_address(&parts));
    active.street = Set(parts.street);
    active.ward = Set(parts.ward);
    active.district = Set(parts.district);
    active.province = Set(parts.province);
    active.is_default = Set(payload.is_default);
    let address = active.update(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Address updated",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

/// Resolves an address the caller owns, used by checkout.
pub(crate) async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    address_id: Uuid,
) -> AppResult<AddressModel> {
    Addresses::find_by_id(address_id)
        .filter(Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or(AppError::NotFoundResource("Address"))
}

async fn clear_defaults<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    keep: Option<Uuid>,
) -> AppResult<()> {
    let mut update = Addresses::update_many()
        .col_expr(Column::IsDefault, Expr::value(false))
        .filter(Column::UserId.eq(user_id))
        .filter(Column::IsDefault.eq(true));
    if let Some(id) = keep {
        update = update.filter(Column::Id.ne(id));
    }
    update.exec(conn).await?;
    Ok(())
}

struct AddressParts {
    street: String,
    ward: String,
    district: String,
    province: String,
}

fn normalized_parts(payload: &AddressRequest) -> AppResult<AddressParts> {
    let field = |value: &str, name: &str| -> AppResult<String> {
        let value = value.trim();
        if value.is_empty() {
            return Err(AppError::BadRequest(format!("{name} must not be empty")));
        }
        Ok(value.to_string())
    };

    Ok(AddressParts {
        street: field(&payload.street, "street")?,
        ward: field(&payload.ward, "ward")?,
        district: field(&payload.district, "district")?,
        province: field(&payload.province, "province")?,
    })
}

fn format_full_address(parts: &AddressParts) -> String {
    format!(
        "{}, {}, {}, {}",
        parts.street, parts.ward, parts.district, parts.province
    )
}

fn address_from_entity(model: AddressModel) -> Address {
    Address {
        id: model.id,
        user_id: model.user_id,
        street: model.street,
        ward: model.ward,
        district: model.district,
        province: model.province,
        full_address: model.full_address,
        is_default: model.is_default,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
