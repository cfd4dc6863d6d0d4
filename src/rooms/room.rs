use axum::{debug_handler, extract::{Path, Query, State}, http::StatusCode, Json};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::AuthUser,
    db::{self, Room, Visibility},
    identity,
    ids::{ProfileId, RoomId, UserId},
    members::Membership,
    AppError, AppResult, AppState,
};

use super::registry;

#[derive(Debug, Deserialize)]
pub(crate) struct RoomFilter {
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateRoomRequest {
    name: Option<String>,
    description: Option<String>,
    category: Option<String>,
    visibility: Option<Visibility>,
    active: Option<bool>,
    latest_message: Option<String>,
    owner_uuid: Option<ProfileId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddMemberRequest {
    profile_uuid: ProfileId,
}

fn can_see(room: &Room, user: &AuthUser) -> bool {
    room.visibility == Visibility::Public || room.is_member(&user.profile)
}

fn require_owner(room: &Room, user: &AuthUser) -> AppResult<()> {
    if room.owner_uuid != user.profile {
        return Err(AppError::Forbidden("Only the room owner can do that.".to_owned()));
    }
    Ok(())
}

#[debug_handler(state = AppState)]
pub(crate) async fn list_rooms(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Query(RoomFilter { category }): Query<RoomFilter>,
) -> AppResult<Json<Vec<Room>>> {
    let mut conn = db_pool.acquire().await?;
    let rooms = registry::list_rooms(&mut conn, category.as_deref()).await?;
    Ok(Json(rooms.into_iter().filter(|r| can_see(r, &user)).collect()))
}

#[debug_handler(state = AppState)]
pub(crate) async fn public_rooms(
    State(db_pool): State<SqlitePool>,
    _user: AuthUser,
) -> AppResult<Json<Vec<Room>>> {
    let mut conn = db_pool.acquire().await?;
    Ok(Json(registry::list_public_rooms(&mut conn).await?))
}

/// Rooms owned by or including the user with internal id `user_id`.
#[debug_handler(state = AppState)]
pub(crate) async fn user_rooms(
    State(db_pool): State<SqlitePool>,
    _user: AuthUser,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<Vec<Room>>> {
    let mut conn = db_pool.acquire().await?;
    let profile = identity::profile_uuid_for_user(&mut conn, user_id)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::not_found("user"),
            e => e,
        })?;
    Ok(Json(registry::rooms_for_profile(&mut conn, profile).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn room(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Path(room_id): Path<RoomId>,
) -> AppResult<Json<Room>> {
    let mut conn = db_pool.acquire().await?;
    let room = registry::find_room(&mut conn, room_id).await?;

    // private rooms look absent to outsiders
    if !can_see(&room, &user) {
        return Err(AppError::not_found("room"));
    }
    Ok(Json(room))
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_room(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Path(room_id): Path<RoomId>,
    Json(req): Json<UpdateRoomRequest>,
) -> AppResult<Json<Room>> {
    let mut tx = db_pool.begin().await?;
    let mut room = registry::find_room(&mut tx, room_id).await?;
    require_owner(&room, &user)?;

    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return Err(AppError::validation("Room name is required."));
        }
        room.name = name.trim().to_owned();
    }
    if let Some(description) = req.description {
        room.description = description;
    }
    if let Some(category) = req.category {
        room.category = category;
    }
    if let Some(visibility) = req.visibility {
        room.visibility = visibility;
    }
    if let Some(active) = req.active {
        room.active = active;
    }
    if let Some(latest_message) = req.latest_message {
        room.latest_message = Some(latest_message);
        room.last_active = Some(db::now());
    }
    if let Some(owner) = req.owner_uuid {
        if !identity::profile_exists(&mut tx, owner).await? {
            return Err(AppError::not_found(format!("profile {owner}")));
        }
        room.owner_uuid = owner;
    }

    registry::save_room(&mut tx, &mut room).await?;
    tx.commit().await?;

    Ok(Json(room))
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete_room(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Path(room_id): Path<RoomId>,
) -> AppResult<StatusCode> {
    let mut tx = db_pool.begin().await?;
    let room = registry::find_room(&mut tx, room_id).await?;
    require_owner(&room, &user)?;

    registry::delete_room(&mut tx, room.id).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// The owner may add anyone; anybody may join a public room themselves.
#[debug_handler(state = AppState)]
pub(crate) async fn add_member(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Path(room_id): Path<RoomId>,
    Json(AddMemberRequest { profile_uuid }): Json<AddMemberRequest>,
) -> AppResult<Json<Room>> {
    let mut tx = db_pool.begin().await?;
    let mut room = registry::find_room(&mut tx, room_id).await?;

    let joining_self = profile_uuid == user.profile && room.visibility == Visibility::Public;
    if !joining_self {
        require_owner(&room, &user)?;
    }
    if !identity::profile_exists(&mut tx, profile_uuid).await? {
        return Err(AppError::not_found(format!("profile {profile_uuid}")));
    }

    if room.add_member(profile_uuid) {
        registry::save_room(&mut tx, &mut room).await?;
        tx.commit().await?;
        tracing::info!("{profile_uuid} joined room {}", room.id);
    }

    Ok(Json(room))
}
