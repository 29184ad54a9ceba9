use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    error::{AppError, AppResult},
};

pub fn issue_token(user_id: Uuid, role: &str, secret: &str, ttl_hours: i64) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or_else(|| AppError::internal("Failed to set expiration"))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(AppError::internal)
}

pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_decodes_with_same_secret() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, "user", "secret", 1).unwrap();
        let claims = decode_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "user");
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = issue_token(Uuid::new_v4(), "admin", "secret", 1).unwrap();
        assert!(matches!(
            decode_token(&token, "other"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token(Uuid::new_v4(), "user", "secret", -2).unwrap();
        assert!(decode_token(&token, "secret").is_err());
    }
}
