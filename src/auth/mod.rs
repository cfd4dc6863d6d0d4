use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
    routing::post,
    Router,
};

use sqlx::SqlitePool;

use crate::{identity, ids::{ProfileId, UserId}, AppError, AppState};

pub mod jwt;
pub mod password;
mod login;
mod register;
mod token;

pub use jwt::{Claims, JwtService, TokenPair, TokenType};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register::register))
        .route("/signin", post(login::signin))
        .route("/token", post(token::obtain_pair))
        .route("/token/refresh", post(token::refresh))
        .route("/token/verify", post(token::verify))
}

/// The caller, taken from a valid `Authorization: Bearer <access token>`
/// whose account still exists and is active.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub profile: ProfileId,
    pub username: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    JwtService: FromRef<S>,
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jwt = JwtService::from_ref(state);
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Authentication credentials were not provided.".to_owned()))?;

        let claims = jwt.verify(token, Some(TokenType::Access))?;

        let db_pool = SqlitePool::from_ref(state);
        let mut conn = db_pool.acquire().await?;
        let user = match identity::user_for_profile(&mut conn, claims.profile).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => return Err(AppError::Unauthorized("User not found".to_owned())),
            Err(e) => return Err(e),
        };
        if user.id != claims.user_id || !user.is_active {
            return Err(AppError::Unauthorized("User is inactive".to_owned()));
        }
        tracing::debug!("authenticated u/{} ({})", claims.user_id, claims.profile);

        Ok(AuthUser {
            user_id: claims.user_id,
            profile: claims.profile,
            username: user.username,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    Some(header.strip_prefix("Bearer ").unwrap_or(header))
}
