use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{auth::AuthUser, db::UserProfile, identity, AppError, AppResult, AppState};

#[derive(Deserialize)]
pub(crate) struct CheckUsernameRequest {
    username: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn profile(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Json<UserProfile>> {
    let mut conn = db_pool.acquire().await?;
    Ok(Json(identity::profile_for_user(&mut conn, user.user_id).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn check_username(
    State(db_pool): State<SqlitePool>,
    Json(CheckUsernameRequest { username }): Json<CheckUsernameRequest>,
) -> AppResult<Json<Value>> {
    let Some(username) = username.filter(|u| !u.trim().is_empty()) else {
        return Err(AppError::validation("Username is required"));
    };

    let mut conn = db_pool.acquire().await?;
    if identity::username_taken(&mut conn, username.trim()).await? {
        Ok(Json(json!({ "available": false, "message": "Username already taken" })))
    } else {
        Ok(Json(json!({ "available": true, "message": "Username is available" })))
    }
}
