mod common;

use axum::{http::StatusCode, response::IntoResponse};
use petcare_api::error::AppError;
use sea_orm::ConnectionTrait;

const NEGATIVE_QUANTITY: &str = "INSERT INTO vouchers (name, start_date, end_date, quantity, percents) \
     VALUES ('negative-voucher', '2024-11-01', '2024-11-30', -1, 10)";

#[tokio::test]
async fn check_violations_are_client_errors_on_both_drivers() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let orm_err = state
        .orm
        .execute_unprepared(NEGATIVE_QUANTITY)
        .await
        .expect_err("check constraint");
    let response = AppError::from(orm_err).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let sqlx_err = sqlx::query(NEGATIVE_QUANTITY)
        .execute(&state.pool)
        .await
        .expect_err("check constraint");
    let response = AppError::from(sqlx_err).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn unique_violations_from_the_orm_are_conflicts() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (_, email) = common::create_user(&state, "user").await?;

    let orm_err = state
        .orm
        .execute_unprepared(&format!(
            "INSERT INTO users (email, full_name) VALUES ('{email}', 'Trùng lặp')"
        ))
        .await
        .expect_err("duplicate email");
    let response = AppError::from(orm_err).into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    Ok(())
}
