use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{identity, AppResult, AppState};

use super::{JwtService, TokenPair};

#[derive(Deserialize)]
pub(crate) struct ObtainRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
pub(crate) struct RefreshRequest {
    refresh: String,
}

#[derive(Deserialize)]
pub(crate) struct VerifyRequest {
    token: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn obtain_pair(
    State(db_pool): State<SqlitePool>,
    State(jwt): State<JwtService>,
    Json(ObtainRequest { username, password }): Json<ObtainRequest>,
) -> AppResult<Json<TokenPair>> {
    let mut conn = db_pool.acquire().await?;
    let user = identity::authenticate(&mut conn, &username, &password).await?;
    let profile = identity::profile_uuid_for_user(&mut conn, user.id).await?;

    Ok(Json(jwt.create_pair(user.id, profile, &user.username)?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn refresh(
    State(jwt): State<JwtService>,
    Json(RefreshRequest { refresh }): Json<RefreshRequest>,
) -> AppResult<Json<Value>> {
    let access = jwt.refresh(&refresh)?;
    Ok(Json(json!({ "access": access })))
}

#[debug_handler(state = AppState)]
pub(crate) async fn verify(
    State(jwt): State<JwtService>,
    Json(VerifyRequest { token }): Json<VerifyRequest>,
) -> AppResult<Json<Value>> {
    jwt.verify(&token, None)?;
    Ok(Json(json!({})))
}
