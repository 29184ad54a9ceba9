use chrono::{Duration, Utc};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
    sea_query::LockType,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    audit,
    dto::auth::{
        FacebookLoginRequest, ForgotPasswordRequest, GoogleLoginRequest, LoginRequest,
        LoginResponse, PendingRegistration, RegisterRequest, ResendOtpRequest,
        ResetPasswordRequest, VerifyOtpRequest,
    },
    entity::{
        password_reset_tokens::{
            ActiveModel as ResetActive, Column as ResetCol, Entity as PasswordResetTokens,
        },
        pending_registrations::{ActiveModel as PendingActive, Entity as PendingRegistrations},
        users::{ActiveModel as UserActive, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::ROLE_USER,
    models::User,
    notifications::{self, templates},
    response::{ApiResponse, Meta},
    services::user_service::{
        assign_role, fetch_user, find_by_email, insert_user, normalize_email,
    },
    state::AppState,
    utils::{
        jwt::issue_token,
        password::{hash_password, validate_new_password, verify_password},
    },
};

/// Wrong codes allowed before the pending registration is discarded.
pub const MAX_OTP_ATTEMPTS: i32 = 5;

/// Stores a pending registration and mails a one-time code; the account is
/// created by [`verify_otp`].
pub async fn register(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<PendingRegistration>> {
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
    let code = generate_otp();
    let expires_at = Utc::now() + Duration::minutes(state.config.otp_ttl_minutes);
    let mail = templates::registration_otp(&email, &full_name, &code, state.config.otp_ttl_minutes)
        .map_err(AppError::internal)?;

    let txn = state.orm.begin().await?;
    PendingRegistrations::delete_by_id(email.clone())
        .exec(&txn)
        .await?;
    PendingActive {
        email: Set(email.clone()),
        full_name: Set(full_name),
        password_hash: Set(password_hash),
        otp_code: Set(code),
        attempts: Set(0),
        expires_at: Set(expires_at.into()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;
    notifications::enqueue(&txn, mail).await?;
    txn.commit().await?;
    state.outbox_signal.notify_one();

    tracing::info!(email = %email, "registration pending OTP verification");
    Ok(ApiResponse::success(
        "Verification code sent",
        PendingRegistration { email, expires_at },
        Some(Meta::empty()),
    ))
}

pub async fn verify_otp(
    state: &AppState,
    payload: VerifyOtpRequest,
) -> AppResult<ApiResponse<User>> {
    let email = normalize_email(&payload.email)?;

    let txn = state.orm.begin().await?;
    let pending = PendingRegistrations::find_by_id(email.clone())
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::BadRequest("No pending registration for this email".into()))?;

    if pending.expires_at.with_timezone(&Utc) < Utc::now() {
        return Err(AppError::BadRequest("Verification code has expired".into()));
    }
    if pending.otp_code != payload.otp.trim() {
        let attempts = pending.attempts + 1;
        if attempts >= MAX_OTP_ATTEMPTS {
            PendingRegistrations::delete_by_id(pending.email)
                .exec(&txn)
                .await?;
            txn.commit().await?;
            tracing::warn!(email = %email, "pending registration discarded after repeated wrong codes");
            return Err(AppError::BadRequest(
                "Too many incorrect codes, please register again".into(),
            ));
        }
        let mut active: PendingActive = pending.into();
        active.attempts = Set(attempts);
        active.update(&txn).await?;
        txn.commit().await?;
        return Err(AppError::BadRequest("Verification code is incorrect".into()));
    }
    if find_by_email(&txn, &email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".into()));
    }

    let user = insert_user(
        &txn,
        pending.email.clone(),
        Some(pending.password_hash.clone()),
        pending.full_name.clone(),
        None,
    )
    .await?;
    assign_role(&txn, user.id, ROLE_USER).await?;
    PendingRegistrations::delete_by_id(pending.email)
        .exec(&txn)
        .await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    let user = fetch_user(&state.pool, user.id).await?;
    Ok(ApiResponse::success("Account created", user, Some(Meta::empty())))
}

pub async fn resend_otp(
    state: &AppState,
    payload: ResendOtpRequest,
) -> AppResult<ApiResponse<PendingRegistration>> {
    let email = normalize_email(&payload.email)?;

    let txn = state.orm.begin().await?;
    let pending = PendingRegistrations::find_by_id(email.clone())
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::BadRequest("No pending registration for this email".into()))?;

    let code = generate_otp();
    let expires_at = Utc::now() + Duration::minutes(state.config.otp_ttl_minutes);
    let mail = templates::registration_otp(
        &email,
        &pending.full_name,
        &code,
        state.config.otp_ttl_minutes,
    )
    .map_err(AppError::internal)?;

    let mut active: PendingActive = pending.into();
    active.otp_code = Set(code);
    active.expires_at = Set(expires_at.into());
    active.update(&txn).await?;
    notifications::enqueue(&txn, mail).await?;
    txn.commit().await?;
    state.outbox_signal.notify_one();

    Ok(ApiResponse::success(
        "Verification code sent",
        PendingRegistration { email, expires_at },
        Some(Meta::empty()),
    ))
}

pub async fn login(state: &AppState, payload: LoginRequest) -> AppResult<ApiResponse<LoginResponse>> {
    let invalid = || AppError::Unauthorized("Invalid email or password".into());
    let email = payload.email.trim().to_lowercase();

    let user = find_by_email(&state.orm, &email).await?.ok_or_else(invalid)?;
    let hash = user.password_hash.as_deref().ok_or_else(invalid)?;
    if !verify_password(&payload.password, hash) {
        return Err(invalid());
    }
    if !user.status {
        return Err(AppError::Unauthorized("Account is disabled".into()));
    }

    let resp = issue_session(state, user.id).await?;
    audit::record(
        &state.pool,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id, "method": "password" }),
    )
    .await;

    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

#[derive(Debug, Deserialize)]
struct GoogleTokenInfo {
    aud: String,
    email: Option<String>,
    /// Google answers `"true"` as a string; accept a JSON bool as well.
    email_verified: Option<serde_json::Value>,
    name: Option<String>,
}

pub async fn google_login(
    state: &AppState,
    payload: GoogleLoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let client_id = state
        .config
        .google_client_id
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("Google login is not configured".into()))?;
    if payload.id_token.trim().is_empty() {
        return Err(AppError::BadRequest("id_token must not be empty".into()));
    }

    let response = state
        .http
        .get(&state.config.google_tokeninfo_url)
        .query(&[("id_token", payload.id_token.trim())])
        .send()
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "google tokeninfo request failed");
            AppError::Unauthorized("Google token could not be verified".into())
        })?;
    if !response.status().is_success() {
        return Err(AppError::Unauthorized("Google token rejected".into()));
    }
    let info: GoogleTokenInfo = response
        .json()
        .await
        .map_err(|_| AppError::Unauthorized("Google token could not be verified".into()))?;

    let email = verified_google_email(&info, client_id)
        .ok_or_else(|| AppError::Unauthorized("Google token rejected".into()))?;
    let full_name = info.name.clone().unwrap_or_else(|| email.clone());

    let user = find_or_create_oauth_user(state, email, full_name).await?;
    let resp = issue_session(state, user.id).await?;
    audit::record(
        &state.pool,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id, "method": "google" }),
    )
    .await;

    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

#[derive(Debug, Deserialize)]
struct FacebookProfile {
    email: Option<String>,
    name: Option<String>,
}

/// The email comes from Facebook's answer, never from the client.
pub async fn facebook_login(
    state: &AppState,
    payload: FacebookLoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let access_token = payload.access_token.trim();
    if access_token.is_empty() {
        return Err(AppError::BadRequest("access_token must not be empty".into()));
    }

    let url = format!("{}/me", state.config.facebook_graph_url.trim_end_matches('/'));
    let response = state
        .http
        .get(url)
        .query(&[("fields", "id,name,email"), ("access_token", access_token)])
        .send()
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "facebook graph request failed");
            AppError::Unauthorized("Facebook token could not be verified".into())
        })?;
    if !response.status().is_success() {
        return Err(AppError::Unauthorized("Facebook token rejected".into()));
    }
    let profile: FacebookProfile = response
        .json()
        .await
        .map_err(|_| AppError::Unauthorized("Facebook token could not be verified".into()))?;

    let email = profile
        .email
        .as_deref()
        .map(normalize_email)
        .transpose()?
        .ok_or_else(|| AppError::BadRequest("Facebook account has no email".into()))?;
    let full_name = profile.name.unwrap_or_else(|| email.clone());

    let user = find_or_create_oauth_user(state, email, full_name).await?;
    let resp = issue_session(state, user.id).await?;
    audit::record(
        &state.pool,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id, "method": "facebook" }),
    )
    .await;

    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let email = normalize_email(&payload.email)?;
    let user = find_by_email(&state.orm, &email)
        .await?
        .ok_or(AppError::NotFoundResource("User"))?;

    let token = Uuid::new_v4();
    let ttl = state.config.reset_token_ttl_minutes;
    let link = reset_link(&state.config.frontend_url, token);
    let mail = templates::password_reset(&user.email, &user.full_name, &link, ttl)
        .map_err(AppError::internal)?;

    let txn = state.orm.begin().await?;
    ResetActive {
        token: Set(token),
        user_id: Set(user.id),
        expires_at: Set((Utc::now() + Duration::minutes(ttl)).into()),
        used_at: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;
    notifications::enqueue(&txn, mail).await?;
    txn.commit().await?;
    state.outbox_signal.notify_one();

    Ok(ApiResponse::done("Password reset email sent"))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    validate_new_password(&payload.new_password)?;
    let invalid = || AppError::BadRequest("Invalid or expired reset token".into());

    let txn = state.orm.begin().await?;
    let reset = PasswordResetTokens::find_by_id(payload.token)
        .filter(ResetCol::UsedAt.is_null())
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(invalid)?;
    if reset.expires_at.with_timezone(&Utc) < Utc::now() {
        return Err(invalid());
    }

    let user = Users::find_by_id(reset.user_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFoundResource("User"))?;
    let user_id = user.id;

    let mut active_user: UserActive = user.into();
    active_user.password_hash = Set(Some(hash_password(&payload.new_password)?));
    active_user.update(&txn).await?;

    let mut active_reset: ResetActive = reset.into();
    active_reset.used_at = Set(Some(Utc::now().into()));
    active_reset.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user_id),
        "password_reset",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::done("Password has been reset"))
}

async fn find_or_create_oauth_user(
    state: &AppState,
    email: String,
    full_name: String,
) -> AppResult<UserModel> {
    if let Some(user) = find_by_email(&state.orm, &email).await? {
        if !user.status {
            return Err(AppError::Unauthorized("Account is disabled".into()));
        }
        return Ok(user);
    }

    let txn = state.orm.begin().await?;
    let user = insert_user(&txn, email, None, full_name, None).await?;
    assign_role(&txn, user.id, ROLE_USER).await?;
    txn.commit().await?;
    tracing::info!(user_id = %user.id, "account created from social login");
    Ok(user)
}

async fn issue_session(state: &AppState, user_id: Uuid) -> AppResult<LoginResponse> {
    let user = fetch_user(&state.pool, user_id).await?;
    let token = issue_token(
        user.id,
        &user.role,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )?;
    Ok(LoginResponse { token, user })
}

fn verified_google_email(info: &GoogleTokenInfo, client_id: &str) -> Option<String> {
    if info.aud != client_id {
        return None;
    }
    let verified = match &info.email_verified {
        Some(serde_json::Value::Bool(flag)) => *flag,
        Some(serde_json::Value::String(flag)) => flag.eq_ignore_ascii_case("true"),
        _ => false,
    };
    if !verified {
        return None;
    }
    info.email
        .as_deref()
        .and_then(|email| normalize_email(email).ok())
}

fn reset_link(frontend_url: &str, token: Uuid) -> String {
    format!(
        "{}/reset-password?token={}",
        frontend_url.trim_end_matches('/'),
        token
    )
}

/// Six digits, never starting with zero.
pub fn generate_otp() -> String {
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_info(aud: &str, verified: serde_json::Value) -> GoogleTokenInfo {
        GoogleTokenInfo {
            aud: aud.into(),
            email: Some("Pet.Owner@Gmail.com".into()),
            email_verified: Some(verified),
            name: Some("Pet Owner".into()),
        }
    }

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..50 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn google_token_needs_matching_audience_and_verified_email() {
        let ok = token_info("client-1", serde_json::json!("true"));
        assert_eq!(
            verified_google_email(&ok, "client-1").as_deref(),
            Some("pet.owner@gmail.com")
        );
        assert!(verified_google_email(&ok, "client-2").is_none());

        let as_bool = token_info("client-1", serde_json::json!(true));
        assert!(verified_google_email(&as_bool, "client-1").is_some());

        let unverified = token_info("client-1", serde_json::json!("false"));
        assert!(verified_google_email(&unverified, "client-1").is_none());
    }

    #[test]
    fn reset_link_points_at_frontend() {
        let token = Uuid::nil();
        assert_eq!(
            reset_link("http://localhost:5173/", token),
            "http://localhost:5173/reset-password?token=00000000-0000-0000-0000-000000000000"
        );
    }
}
