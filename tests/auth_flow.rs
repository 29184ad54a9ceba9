mod common;

use petcare_api::{
    dto::{
        auth::{
            ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
            VerifyOtpRequest,
        },
        users::ChangePasswordRequest,
    },
    error::AppError,
    middleware::auth::AuthUser,
    services::{auth_service, user_service},
    utils::jwt::decode_token,
};
use uuid::Uuid;

#[tokio::test]
async fn register_verify_login_and_recover_password() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let email = format!("{}@petcare.test", common::unique("owner"));

    auth_service::register(
        &state,
        RegisterRequest {
            email: email.to_uppercase(),
            password: "meo-meo-123".into(),
            full_name: "Nguyễn Văn Mèo".into(),
        },
    )
    .await?;

    let (otp,): (String,) =
        sqlx::query_as("SELECT otp_code FROM pending_registrations WHERE email = $1")
            .bind(&email)
            .fetch_one(&state.pool)
            .await?;

    let wrong = auth_service::verify_otp(
        &state,
        VerifyOtpRequest {
            email: email.clone(),
            otp: if otp == "111111" { "222222".into() } else { "111111".into() },
        },
    )
    .await;
    assert!(matches!(wrong, Err(AppError::BadRequest(_))));

    let user = auth_service::verify_otp(
        &state,
        VerifyOtpRequest {
            email: email.clone(),
            otp,
        },
    )
    .await?
    .data
    .expect("user");
    assert_eq!(user.role, "user");

    let again = auth_service::register(
        &state,
        RegisterRequest {
            email: email.clone(),
            password: "another-pass".into(),
            full_name: "Someone".into(),
        },
    )
    .await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    let session = auth_service::login(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "meo-meo-123".into(),
        },
    )
    .await?
    .data
    .expect("session");
    let claims = decode_token(&session.token, &state.config.jwt_secret)?;
    assert_eq!(claims.sub, user.id.to_string());
    assert_eq!(claims.role, "user");

    let bad_login = auth_service::login(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "wrong".into(),
        },
    )
    .await;
    assert!(matches!(bad_login, Err(AppError::Unauthorized(_))));

    auth_service::forgot_password(&state, ForgotPasswordRequest { email: email.clone() }).await?;
    let (token,): (Uuid,) = sqlx::query_as(
        "SELECT token FROM password_reset_tokens WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user.id)
    .fetch_one(&state.pool)
    .await?;

    auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            token,
            new_password: "gau-gau-456".into(),
        },
    )
    .await?;

    let reused = auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            token,
            new_password: "gau-gau-789".into(),
        },
    )
    .await;
    assert!(matches!(reused, Err(AppError::BadRequest(_))));

    auth_service::login(
        &state,
        LoginRequest {
            email,
            password: "gau-gau-456".into(),
        },
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn forgot_password_for_unknown_email_is_not_found() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let result = auth_service::forgot_password(
        &state,
        ForgotPasswordRequest {
            email: format!("{}@petcare.test", common::unique("ghost")),
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::NotFoundResource(_))));
    Ok(())
}

#[tokio::test]
async fn change_password_queues_a_notification() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let email = format!("{}@petcare.test", common::unique("changer"));
    auth_service::register(
        &state,
        RegisterRequest {
            email: email.clone(),
            password: "first-pass".into(),
            full_name: "Trần Thị Chó".into(),
        },
    )
    .await?;
    let (otp,): (String,) =
        sqlx::query_as("SELECT otp_code FROM pending_registrations WHERE email = $1")
            .bind(&email)
            .fetch_one(&state.pool)
            .await?;
    let user = auth_service::verify_otp(&state, VerifyOtpRequest { email: email.clone(), otp })
        .await?
        .data
        .expect("user");
    let caller = AuthUser {
        user_id: user.id,
        role: user.role.clone(),
    };

    let same = user_service::change_password(
        &state,
        &caller,
        ChangePasswordRequest {
            current_password: "first-pass".into(),
            new_password: "first-pass".into(),
        },
    )
    .await;
    assert!(matches!(same, Err(AppError::BadRequest(_))));

    user_service::change_password(
        &state,
        &caller,
        ChangePasswordRequest {
            current_password: "first-pass".into(),
            new_password: "second-pass".into(),
        },
    )
    .await?;

    // One OTP mail from registration, one for the password change.
    let (mails,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM email_outbox WHERE recipient = $1")
            .bind(&email)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(mails, 2);
    Ok(())
}

#[tokio::test]
async fn repeated_wrong_codes_discard_the_pending_registration() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let email = format!("{}@petcare.test", common::unique("guess"));

    auth_service::register(
        &state,
        RegisterRequest {
            email: email.clone(),
            password: "gau-gau-123".into(),
            full_name: "Trần Thị Cún".into(),
        },
    )
    .await?;

    let (otp,): (String,) =
        sqlx::query_as("SELECT otp_code FROM pending_registrations WHERE email = $1")
            .bind(&email)
            .fetch_one(&state.pool)
            .await?;
    let wrong_code = if otp == "111111" { "222222" } else { "111111" };

    for _ in 0..auth_service::MAX_OTP_ATTEMPTS {
        let res = auth_service::verify_otp(
            &state,
            VerifyOtpRequest {
                email: email.clone(),
                otp: wrong_code.into(),
            },
        )
        .await;
        assert!(matches!(res, Err(AppError::BadRequest(_))));
    }

    let late = auth_service::verify_otp(
        &state,
        VerifyOtpRequest {
            email: email.clone(),
            otp,
        },
    )
    .await;
    assert!(matches!(late, Err(AppError::BadRequest(_))));

    let (pending,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM pending_registrations WHERE email = $1")
            .bind(&email)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(pending, 0);

    let (users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(users, 0);
    Ok(())
}
