use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::auth::{
        FacebookLoginRequest, ForgotPasswordRequest, GoogleLoginRequest, LoginRequest,
        LoginResponse, PendingRegistration, RegisterRequest, ResendOtpRequest,
        ResetPasswordRequest, VerifyOtpRequest,
    },
    error::AppResult,
    models::User,
    response::ApiResponse,
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify-otp", post(verify_otp))
        .route("/resend-otp", post(resend_otp))
        .route("/login", post(login))
        .route("/google-login", post(google_login))
        .route("/facebook-login", post(facebook_login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Verification code sent", body = ApiResponse<PendingRegistration>),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<PendingRegistration>>> {
    let resp = auth_service::register(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Account created", body = ApiResponse<User>),
        (status = 400, description = "Unknown, expired or wrong code")
    ),
    tag = "Auth"
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = auth_service::verify_otp(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/resend-otp",
    request_body = ResendOtpRequest,
    responses(
        (status = 200, description = "Verification code sent", body = ApiResponse<PendingRegistration>),
        (status = 400, description = "No pending registration")
    ),
    tag = "Auth"
)]
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(payload): Json<ResendOtpRequest>,
) -> AppResult<Json<ApiResponse<PendingRegistration>>> {
    let resp = auth_service::resend_otp(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let resp = auth_service::login(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/google-login",
    request_body = GoogleLoginRequest,
    responses(
        (status = 200, description = "Login with Google", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Token rejected")
    ),
    tag = "Auth"
)]
pub async fn google_login(
    State(state): State<AppState>,
    Json(payload): Json<GoogleLoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let resp = auth_service::google_login(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/facebook-login",
    request_body = FacebookLoginRequest,
    responses(
        (status = 200, description = "Login with Facebook", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Empty token or no email"),
        (status = 401, description = "Token rejected")
    ),
    tag = "Auth"
)]
pub async fn facebook_login(
    State(state): State<AppState>,
    Json(payload): Json<FacebookLoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let resp = auth_service::facebook_login(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset email sent", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "User not found")
    ),
    tag = "Auth"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::forgot_password(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid or expired token")
    ),
    tag = "Auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::reset_password(&state, payload).await?;
    Ok(Json(resp))
}
