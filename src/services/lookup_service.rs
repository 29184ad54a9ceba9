use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::catalog::{LookupList, LookupRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::LookupItem,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
};

/// The name-only tables that share one CRUD implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Brand,
    Category,
    Color,
    Size,
    Weight,
    Role,
}

impl LookupKind {
    pub fn table(self) -> &'static str {
        match self {
            LookupKind::Brand => "brands",
            LookupKind::Category => "product_categories",
            LookupKind::Color => "product_colors",
            LookupKind::Size => "product_sizes",
            LookupKind::Weight => "product_weights",
            LookupKind::Role => "roles",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LookupKind::Brand => "Brand",
            LookupKind::Category => "Category",
            LookupKind::Color => "Color",
            LookupKind::Size => "Size",
            LookupKind::Weight => "Weight",
            LookupKind::Role => "Role",
        }
    }
}

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    Ok(name.to_string())
}

pub async fn list(
    pool: &DbPool,
    kind: LookupKind,
    pagination: Pagination,
) -> AppResult<ApiResponse<LookupList>> {
    let (page, limit, offset) = pagination.normalize();
    // Table names come from the closed LookupKind enum, never from input.
    let items = sqlx::query_as::<_, LookupItem>(&format!(
        "SELECT id, name, created_at FROM {} ORDER BY name ASC LIMIT $1 OFFSET $2",
        kind.table()
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", kind.table()))
        .fetch_one(pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("OK", LookupList { items }, Some(meta)))
}

pub async fn get(pool: &DbPool, kind: LookupKind, id: Uuid) -> AppResult<ApiResponse<LookupItem>> {
    let item = sqlx::query_as::<_, LookupItem>(&format!(
        "SELECT id, name, created_at FROM {} WHERE id = $1",
        kind.table()
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFoundResource(kind.label()))?;

    Ok(ApiResponse::success("OK", item, Some(Meta::empty())))
}

pub async fn create(
    pool: &DbPool,
    user: &AuthUser,
    kind: LookupKind,
    payload: LookupRequest,
) -> AppResult<ApiResponse<LookupItem>> {
    ensure_admin(user)?;
    let name = validate_name(&payload.name)?;

    let item = sqlx::query_as::<_, LookupItem>(&format!(
        "INSERT INTO {} (name) VALUES ($1) RETURNING id, name, created_at",
        kind.table()
    ))
    .bind(&name)
    .fetch_one(pool)
    .await?;

    audit::record(
        pool,
        Some(user.user_id),
        "lookup_create",
        kind.table(),
        serde_json::json!({ "id": item.id, "name": item.name }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("{} created", kind.label()),
        item,
        Some(Meta::empty()),
    ))
}

pub async fn update(
    pool: &DbPool,
    user: &AuthUser,
    kind: LookupKind,
    id: Uuid,
    payload: LookupRequest,
) -> AppResult<ApiResponse<LookupItem>> {
    ensure_admin(user)?;
    let name = validate_name(&payload.name)?;

    let item = sqlx::query_as::<_, LookupItem>(&format!(
        "UPDATE {} SET name = $2 WHERE id = $1 RETURNING id, name, created_at",
        kind.table()
    ))
    .bind(id)
    .bind(&name)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFoundResource(kind.label()))?;

    audit::record(
        pool,
        Some(user.user_id),
        "lookup_update",
        kind.table(),
        serde_json::json!({ "id": item.id, "name": item.name }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("{} updated", kind.label()),
        item,
        Some(Meta::empty()),
    ))
}

/// Rows still referenced elsewhere fail with a foreign-key violation, surfaced as 409.
pub async fn delete(
    pool: &DbPool,
    user: &AuthUser,
    kind: LookupKind,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFoundResource(kind.label()));
    }

    audit::record(
        pool,
        Some(user.user_id),
        "lookup_delete",
        kind.table(),
        serde_json::json!({ "id": id }),
    )
    .await;

    Ok(ApiResponse::done(format!("{} deleted", kind.label())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_maps_to_its_table() {
        assert_eq!(LookupKind::Brand.table(), "brands");
        assert_eq!(LookupKind::Category.table(), "product_categories");
        assert_eq!(LookupKind::Color.table(), "product_colors");
        assert_eq!(LookupKind::Size.table(), "product_sizes");
        assert_eq!(LookupKind::Weight.table(), "product_weights");
        assert_eq!(LookupKind::Role.table(), "roles");
    }

    #[test]
    fn blank_names_are_rejected_and_others_trimmed() {
        assert!(validate_name("   ").is_err());
        assert_eq!(validate_name("  Whiskas ").unwrap(), "Whiskas");
    }
}
