use axum::{debug_handler, extract::State, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{identity, ids::UserId, AppError, AppResult, AppState};

use super::JwtService;

#[derive(Deserialize)]
pub(crate) struct SigninRequest {
    username_or_email: String,
    password: String,
}

#[derive(Serialize)]
pub(crate) struct SigninResponse {
    refresh: String,
    access: String,
    user_id: UserId,
    username: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn signin(
    State(db_pool): State<SqlitePool>,
    State(jwt): State<JwtService>,
    Json(SigninRequest { username_or_email, password }): Json<SigninRequest>,
) -> AppResult<Json<SigninResponse>> {
    let mut conn = db_pool.acquire().await?;

    let username = if username_or_email.contains('@') {
        let Some(user) = identity::find_user_by_email(&mut conn, &username_or_email).await? else {
            return Err(AppError::validation("Invalid email"));
        };
        user.username
    } else {
        username_or_email
    };

    let user = identity::authenticate(&mut conn, &username, &password).await?;
    let profile = identity::profile_uuid_for_user(&mut conn, user.id).await?;
    let pair = jwt.create_pair(user.id, profile, &user.username)?;

    tracing::info!("welcome u/{} ({})", user.username, user.id);

    Ok(Json(SigninResponse {
        refresh: pair.refresh,
        access: pair.access,
        user_id: user.id,
        username: user.username,
    }))
}
