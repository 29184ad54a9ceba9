use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use uuid::Uuid;

use crate::{error::AppError, state::AppState, utils::jwt::decode_token};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

pub fn ensure_role(user: &AuthUser, role: &str) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, ROLE_ADMIN)
}

/// Owner of the resource, or an admin.
pub fn ensure_self_or_admin(user: &AuthUser, owner_id: Uuid) -> Result<(), AppError> {
    if user.user_id == owner_id || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = decode_token(token, &state.config.jwt_secret)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

        Ok(AuthUser {
            user_id,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header_value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/cart");
        if let Some(value) = header_value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_token_is_extracted() {
        let parts = parts_with(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn missing_or_foreign_scheme_is_unauthorized() {
        assert!(matches!(
            bearer_token(&parts_with(None)),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            bearer_token(&parts_with(Some("Basic Zm9vOmJhcg=="))),
            Err(AppError::Unauthorized(_))
        ));
        assert!(bearer_token(&parts_with(Some("Bearer  "))).is_err());
    }

    #[test]
    fn owner_or_admin_passes() {
        let owner = Uuid::new_v4();
        let user = AuthUser { user_id: owner, role: ROLE_USER.into() };
        let stranger = AuthUser { user_id: Uuid::new_v4(), role: ROLE_USER.into() };
        let admin = AuthUser { user_id: Uuid::new_v4(), role: ROLE_ADMIN.into() };

        assert!(ensure_self_or_admin(&user, owner).is_ok());
        assert!(ensure_self_or_admin(&admin, owner).is_ok());
        assert!(matches!(
            ensure_self_or_admin(&stranger, owner),
            Err(AppError::Forbidden)
        ));
    }
}
