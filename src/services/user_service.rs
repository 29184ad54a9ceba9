use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, QueryFilter, Set,
    Statement, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::users::{ChangePasswordRequest, CreateUserRequest, UpdateUserRequest, UserList, UserRole},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ROLE_USER, ensure_admin, ensure_self_or_admin},
    models::User,
    notifications::{self, templates},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
    utils::password::{hash_password, validate_new_password, verify_password},
};

// A user holding several roles reports `admin` first.
const USER_SELECT: &str = r#"
    SELECT u.id, u.email, u.full_name, u.phone, u.status, u.created_at,
           COALESCE((
               SELECT r.name FROM user_roles ur
               JOIN roles r ON r.id = ur.role_id
               WHERE ur.user_id = u.id
               ORDER BY (r.name = 'admin') DESC, r.name
               LIMIT 1
           ), 'user') AS role
    FROM users u
"#;

pub(crate) async fn fetch_user(pool: &DbPool, id: Uuid) -> AppResult<User> {
    sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE u.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFoundResource("User"))
}

pub(crate) fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AppError::BadRequest("email is not valid".into())),
    }
}

pub(crate) async fn find_by_email<C: ConnectionTrait>(
    conn: &C,
    email: &str,
) -> AppResult<Option<UserModel>> {
    Ok(Users::find()
        .filter(UserCol::Email.eq(email))
        .one(conn)
        .await?)
}

pub(crate) async fn insert_user<C: ConnectionTrait>(
    conn: &C,
    email: String,
    password_hash: Option<String>,
    full_name: String,
    phone: Option<String>,
) -> AppResult<UserModel> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(password_hash),
        full_name: Set(full_name),
        phone: Set(phone),
        status: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;
    Ok(user)
}

pub(crate) async fn assign_role<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    role: &str,
) -> AppResult<()> {
    let result = conn
        .execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, id FROM roles WHERE name = $2
            ON CONFLICT DO NOTHING
            "#,
            [user_id.into(), role.into()],
        ))
        .await?;
    if result.rows_affected() == 0 {
        let exists = conn
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT 1 FROM roles WHERE name = $1",
                [role.into()],
            ))
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFoundResource("Role"));
        }
    }
    Ok(())
}

pub async fn list_users(
    state: &AppState,
    caller: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(caller)?;
    let (page, limit, offset) = pagination.normalize();

    let items = sqlx::query_as::<_, User>(&format!(
        "{USER_SELECT} ORDER BY u.created_at DESC LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

pub async fn get_role(
    state: &AppState,
    caller: &AuthUser,
    user_id: Uuid,
) -> AppResult<ApiResponse<UserRole>> {
    ensure_self_or_admin(caller, user_id)?;
    let user = fetch_user(&state.pool, user_id).await?;
    Ok(ApiResponse::success(
        "Role",
        UserRole {
            user_id: user.id,
            role: user.role,
        },
        Some(Meta::empty()),
    ))
}

pub async fn create_user(
    state: &AppState,
    caller: &AuthUser,
    payload: CreateUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(caller)?;
    let email = normalize_email(&payload.email)?;
    validate_new_password(&payload.password)?;
    let full_name = payload.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(AppError::BadRequest("full_name must not be empty".into()));
    }

    if find_by_email(&state.orm, &email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let role = payload.role.as_deref().unwrap_or(ROLE_USER);

    let txn = state.orm.begin().await?;
    let user = insert_user(&txn, email, Some(password_hash), full_name, payload.phone).await?;
    assign_role(&txn, user.id, role).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(caller.user_id),
        "user_create",
        "users",
        serde_json::json!({ "user_id": user.id, "role": role }),
    )
    .await;

    let user = fetch_user(&state.pool, user.id).await?;
    Ok(ApiResponse::success("User created", user, Some(Meta::empty())))
}

pub async fn update_user(
    state: &AppState,
    caller: &AuthUser,
    user_id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_self_or_admin(caller, user_id)?;
    if payload.status.is_some() && !caller.is_admin() {
        return Err(AppError::Forbidden);
    }

    let existing = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFoundResource("User"))?;

    let mut active: UserActive = existing.into();
    if let Some(full_name) = payload.full_name {
        let full_name = full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(AppError::BadRequest("full_name must not be empty".into()));
        }
        active.full_name = Set(full_name);
    }
    if let Some(phone) = payload.phone {
        let phone = phone.trim().to_string();
        active.phone = Set((!phone.is_empty()).then_some(phone));
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    active.update(&state.orm).await?;

    let user = fetch_user(&state.pool, user_id).await?;
    Ok(ApiResponse::success("User updated", user, Some(Meta::empty())))
}

/// Users with orders cannot be deleted; the foreign key answers 409.
pub async fn delete_user(
    state: &AppState,
    caller: &AuthUser,
    user_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(caller)?;
    if caller.user_id == user_id {
        return Err(AppError::BadRequest("You cannot delete your own account".into()));
    }

    let result = Users::delete_by_id(user_id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFoundResource("User"));
    }

    audit::record(
        &state.pool,
        Some(caller.user_id),
        "user_delete",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::done("User deleted"))
}

/// The notification row is written in the same transaction as the new hash
/// and delivered by the outbox worker.
pub async fn change_password(
    state: &AppState,
    caller: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let user = Users::find_by_id(caller.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFoundResource("User"))?;

    let current_hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Account has no password set".into()))?;
    if !verify_password(&payload.current_password, current_hash) {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }
    if payload.current_password == payload.new_password {
        return Err(AppError::BadRequest(
            "New password must differ from the current one".into(),
        ));
    }
    validate_new_password(&payload.new_password)?;

    let new_hash = hash_password(&payload.new_password)?;
    let email = templates::password_changed(
        &user.email,
        &user.full_name,
        &Utc::now().format("%d/%m/%Y %H:%M UTC").to_string(),
    )
    .map_err(AppError::internal)?;

    let txn = state.orm.begin().await?;
    let mut active: UserActive = user.into();
    active.password_hash = Set(Some(new_hash));
    active.update(&txn).await?;
    notifications::enqueue(&txn, email).await?;
    txn.commit().await?;
    state.outbox_signal.notify_one();

    audit::record(
        &state.pool,
        Some(caller.user_id),
        "password_change",
        "users",
        serde_json::json!({ "user_id": caller.user_id }),
    )
    .await;

    Ok(ApiResponse::done("Password changed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(
            normalize_email("  Meo.Meo@PetCare.VN ").unwrap(),
            "meo.meo@petcare.vn"
        );
    }

    #[test]
    fn malformed_emails_are_rejected() {
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@petcare.vn").is_err());
        assert!(normalize_email("cat@localhost").is_err());
    }
}
