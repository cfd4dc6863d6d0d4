use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::ids::{ProfileId, UserId};
use crate::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: UserId,
    pub profile: ProfileId,
    pub username: String,
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub jti: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

/// Issues and checks access/refresh tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &str, issuer: String, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn create_pair(&self, user_id: UserId, profile: ProfileId, username: &str) -> AppResult<TokenPair> {
        Ok(TokenPair {
            refresh: self.create_token(TokenType::Refresh, user_id, profile, username)?,
            access: self.create_token(TokenType::Access, user_id, profile, username)?,
        })
    }

    pub fn create_token(
        &self,
        token_type: TokenType,
        user_id: UserId,
        profile: ProfileId,
        username: &str,
    ) -> AppResult<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            profile,
            username: username.to_owned(),
            token_type,
            exp: (now + ttl).unix_timestamp(),
            iat: now.unix_timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().simple().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(e.into()))
    }

    /// Decodes `token`, checking signature, expiry and issuer. With
    /// `expected` set, a token of the other type is rejected too.
    pub fn verify(&self, token: &str, expected: Option<TokenType>) -> AppResult<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Token is invalid or expired".to_owned()))?;

        if expected.is_some_and(|t| t != claims.token_type) {
            return Err(AppError::Unauthorized("Token has wrong type".to_owned()));
        }
        Ok(claims)
    }

    /// Exchanges a refresh token for a new access token.
    pub fn refresh(&self, refresh_token: &str) -> AppResult<String> {
        let claims = self.verify(refresh_token, Some(TokenType::Refresh))?;
        self.create_token(TokenType::Access, claims.user_id, claims.profile, &claims.username)
    }
}
