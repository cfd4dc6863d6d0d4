use axum::{debug_handler, extract::{Path, State}, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    auth::AuthUser,
    db::User,
    identity::{self, UserChanges},
    ids::{ProfileId, UserId},
    AppError, AppResult, AppState,
};

/// A user as the API shows it, with the profile uuid alongside.
#[derive(Serialize)]
pub(crate) struct UserView {
    #[serde(flatten)]
    user: User,
    uuid: Option<ProfileId>,
}

#[derive(Deserialize)]
pub(crate) struct UpdateUserRequest {
    username: Option<String>,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    password: Option<String>,
}

async fn view(conn: &mut SqliteConnection, user: User) -> AppResult<UserView> {
    let uuid = match identity::profile_uuid_for_user(conn, user.id).await {
        Ok(uuid) => Some(uuid),
        Err(AppError::NotFound(_)) => None,
        Err(e) => return Err(e),
    };
    Ok(UserView { user, uuid })
}

async fn require_self_or_staff(conn: &mut SqliteConnection, caller: &AuthUser, target: UserId) -> AppResult<()> {
    if caller.user_id == target {
        return Ok(());
    }
    if identity::find_user(conn, caller.user_id).await?.is_staff {
        return Ok(());
    }
    Err(AppError::Forbidden("You can only change your own account.".to_owned()))
}

#[debug_handler(state = AppState)]
pub(crate) async fn list_users(
    State(db_pool): State<SqlitePool>,
    _caller: AuthUser,
) -> AppResult<Json<Vec<UserView>>> {
    let mut conn = db_pool.acquire().await?;
    let mut views = vec![];
    for user in identity::list_users(&mut conn).await? {
        views.push(view(&mut conn, user).await?);
    }
    Ok(Json(views))
}

#[debug_handler(state = AppState)]
pub(crate) async fn user(
    State(db_pool): State<SqlitePool>,
    _caller: AuthUser,
    Path(id): Path<UserId>,
) -> AppResult<Json<UserView>> {
    let mut conn = db_pool.acquire().await?;
    let user = identity::find_user(&mut conn, id).await?;
    Ok(Json(view(&mut conn, user).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_user(
    State(db_pool): State<SqlitePool>,
    caller: AuthUser,
    Path(id): Path<UserId>,
    Json(req): Json<UpdateUserRequest>,
) -> AppResult<Json<UserView>> {
    let mut tx = db_pool.begin().await?;
    require_self_or_staff(&mut tx, &caller, id).await?;

    if req.email.as_deref().is_some_and(|e| !e.contains('@')) {
        return Err(AppError::validation("Enter a valid email address."));
    }
    if req.username.as_deref().is_some_and(|u| u.trim().is_empty()) {
        return Err(AppError::validation("Username is required."));
    }

    let user = identity::update_user(&mut tx, id, UserChanges {
        username: req.username.map(|u| u.trim().to_owned()),
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
        password: req.password,
    }).await?;
    let view = view(&mut tx, user).await?;
    tx.commit().await?;

    Ok(Json(view))
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete_user(
    State(db_pool): State<SqlitePool>,
    caller: AuthUser,
    Path(id): Path<UserId>,
) -> AppResult<StatusCode> {
    let mut tx = db_pool.begin().await?;
    require_self_or_staff(&mut tx, &caller, id).await?;
    identity::delete_user(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!("user {id} deleted by {}", caller.user_id);
    Ok(StatusCode::NO_CONTENT)
}
