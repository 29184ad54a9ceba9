#![allow(dead_code)]

use petcare_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    middleware::auth::AuthUser,
    state::AppState,
};
use uuid::Uuid;

/// `None` when no database is configured, so the calling test can skip.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    Ok(Some(AppState::new(
        pool,
        AppConfig::with_database_url(database_url),
    )?))
}

pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

pub async fn create_user(state: &AppState, role: &str) -> anyhow::Result<(AuthUser, String)> {
    let email = format!("{}@petcare.test", unique(role));
    let (user_id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO users (email, full_name, phone) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&email)
    .bind("Test Owner")
    .bind("0901234567")
    .fetch_one(&state.pool)
    .await?;

    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id) SELECT $1, id FROM roles WHERE name = $2",
    )
    .bind(user_id)
    .bind(role)
    .execute(&state.pool)
    .await?;

    Ok((
        AuthUser {
            user_id,
            role: role.to_string(),
        },
        email,
    ))
}

/// A product with one variant; returns the variant id.
pub async fn create_variant(state: &AppState, price: i64, quantity: i32) -> anyhow::Result<Uuid> {
    let (product_id,): (Uuid,) =
        sqlx::query_as("INSERT INTO products (name) VALUES ($1) RETURNING id")
            .bind(unique("Hạt cho mèo"))
            .fetch_one(&state.pool)
            .await?;

    let (detail_id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO product_details (product_id, price, quantity) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(product_id)
    .bind(price)
    .bind(quantity)
    .fetch_one(&state.pool)
    .await?;
    Ok(detail_id)
}

pub async fn stock_of(state: &AppState, detail_id: Uuid) -> anyhow::Result<i32> {
    let (quantity,): (i32,) = sqlx::query_as("SELECT quantity FROM product_details WHERE id = $1")
        .bind(detail_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(quantity)
}
