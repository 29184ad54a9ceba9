use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub cors_origin: String,
    /// Base URL used to build links inside emails (password reset).
    pub frontend_url: String,
    pub google_client_id: Option<String>,
    pub google_tokeninfo_url: String,
    pub facebook_graph_url: String,
    pub otp_ttl_minutes: i64,
    pub reset_token_ttl_minutes: i64,
    pub smtp: Option<SmtpConfig>,
    pub mail_from: String,
    pub outbox_poll_seconds: u64,
    pub outbox_max_attempts: i32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000);

        let smtp = match env::var("SMTP_HOST") {
            Ok(smtp_host) if !smtp_host.is_empty() => Some(SmtpConfig {
                host: smtp_host,
                port: parse_or("SMTP_PORT", 587),
                username: env::var("SMTP_USERNAME").unwrap_or_default(),
                password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            jwt_ttl_hours: parse_or("JWT_TTL_HOURS", 24),
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            google_client_id: env::var("GOOGLE_CLIENT_ID").ok().filter(|v| !v.is_empty()),
            google_tokeninfo_url: env::var("GOOGLE_TOKENINFO_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/tokeninfo".to_string()),
            facebook_graph_url: env::var("FACEBOOK_GRAPH_URL")
                .unwrap_or_else(|_| "https://graph.facebook.com".to_string()),
            otp_ttl_minutes: parse_or("OTP_TTL_MINUTES", 10),
            reset_token_ttl_minutes: parse_or("RESET_TOKEN_TTL_MINUTES", 30),
            smtp,
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "PetCare <no-reply@petcare.local>".to_string()),
            outbox_poll_seconds: parse_or("OUTBOX_POLL_SECONDS", 15),
            outbox_max_attempts: parse_or("OUTBOX_MAX_ATTEMPTS", 5),
        })
    }

    /// Configuration for tests and tools that only need a database.
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            jwt_secret: "test-secret".to_string(),
            jwt_ttl_hours: 24,
            cors_origin: "http://localhost:5173".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            google_client_id: None,
            google_tokeninfo_url: "https://oauth2.googleapis.com/tokeninfo".to_string(),
            facebook_graph_url: "https://graph.facebook.com".to_string(),
            otp_ttl_minutes: 10,
            reset_token_ttl_minutes: 30,
            smtp: None,
            mail_from: "PetCare <no-reply@petcare.local>".to_string(),
            outbox_poll_seconds: 15,
            outbox_max_attempts: 5,
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
