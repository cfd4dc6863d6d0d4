use axum::{debug_handler, extract::State, http::StatusCode, Json};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::AuthUser,
    db::{Room, Visibility},
    identity,
    ids::ProfileId,
    members::Membership,
    AppError, AppResult, AppState,
};

use super::registry::{self, NewRoom};

#[derive(Debug, Deserialize)]
pub(crate) struct NewRoomRequest {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    visibility: Visibility,
    #[serde(default)]
    members_uuids: Vec<ProfileId>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn new_room(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Json(req): Json<NewRoomRequest>,
) -> AppResult<(StatusCode, Json<Room>)> {
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Room name is required."));
    }

    let mut tx = db_pool.begin().await?;
    let mut room = registry::create_room(&mut tx, user.profile, NewRoom {
        name: req.name.trim().to_owned(),
        description: req.description,
        category: req.category,
        visibility: req.visibility,
        ..Default::default()
    }).await?;

    if !req.members_uuids.is_empty() {
        for member in req.members_uuids {
            if !identity::profile_exists(&mut tx, member).await? {
                return Err(AppError::not_found(format!("profile {member}")));
            }
            room.add_member(member);
        }
        registry::save_room(&mut tx, &mut room).await?;
    }
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(room)))
}
