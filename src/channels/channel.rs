use axum::{debug_handler, extract::{Path, State}, http::StatusCode, Json};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    auth::AuthUser,
    db::{Channel, Room, Visibility},
    identity,
    ids::{ChannelId, ProfileId, RoomId},
    members::Membership,
    rooms, AppError, AppResult, AppState,
};

use super::registry;

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateChannelRequest {
    name: Option<String>,
    color: Option<String>,
    owner_uuid: Option<ProfileId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddMemberRequest {
    profile_uuid: ProfileId,
}

/// Loads the room of `channel`, hiding private rooms from outsiders.
async fn visible_room(conn: &mut SqliteConnection, room_id: RoomId, user: &AuthUser) -> AppResult<Room> {
    let room = rooms::registry::find_room(conn, room_id).await?;
    if room.visibility == Visibility::Private && !room.is_member(&user.profile) {
        return Err(AppError::not_found("room"));
    }
    Ok(room)
}

fn can_manage(channel: &Channel, room: &Room, user: &AuthUser) -> bool {
    channel.owner_uuid == user.profile || room.owner_uuid == user.profile
}

#[debug_handler(state = AppState)]
pub(crate) async fn list_channels(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
) -> AppResult<Json<Vec<Channel>>> {
    let mut conn = db_pool.acquire().await?;
    let visible: Vec<RoomId> = rooms::registry::list_rooms(&mut conn, None)
        .await?
        .into_iter()
        .filter(|r| r.visibility == Visibility::Public || r.is_member(&user.profile))
        .map(|r| r.id)
        .collect();

    let channels = registry::list_channels(&mut conn).await?;
    Ok(Json(channels.into_iter().filter(|c| visible.contains(&c.room_uuid)).collect()))
}

#[debug_handler(state = AppState)]
pub(crate) async fn room_channels(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Path(room_uuid): Path<RoomId>,
) -> AppResult<Json<Vec<Channel>>> {
    let mut conn = db_pool.acquire().await?;
    let room = visible_room(&mut conn, room_uuid, &user).await?;
    Ok(Json(registry::channels_in_room(&mut conn, room.id).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn channel(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Path(uuid): Path<ChannelId>,
) -> AppResult<Json<Channel>> {
    let mut conn = db_pool.acquire().await?;
    let channel = registry::find_channel(&mut conn, uuid).await?;
    visible_room(&mut conn, channel.room_uuid, &user)
        .await
        .map_err(|_| AppError::not_found("channel"))?;
    Ok(Json(channel))
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_channel(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Path(uuid): Path<ChannelId>,
    Json(req): Json<UpdateChannelRequest>,
) -> AppResult<Json<Channel>> {
    let mut tx = db_pool.begin().await?;
    let mut channel = registry::find_channel(&mut tx, uuid).await?;
    let room = rooms::registry::find_room(&mut tx, channel.room_uuid).await?;
    if !can_manage(&channel, &room, &user) {
        return Err(AppError::Forbidden("Only the channel or room owner can do that.".to_owned()));
    }

    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return Err(AppError::validation("Channel name is required."));
        }
        channel.name = name.trim().to_owned();
    }
    if let Some(color) = req.color {
        channel.color = color;
    }
    if let Some(owner) = req.owner_uuid {
        if !room.is_member(&owner) {
            return Err(AppError::validation("The new owner must be a member of the room."));
        }
        channel.owner_uuid = owner;
    }

    registry::save_channel(&mut tx, &mut channel).await?;
    tx.commit().await?;

    Ok(Json(channel))
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete_channel(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Path(uuid): Path<ChannelId>,
) -> AppResult<StatusCode> {
    let mut tx = db_pool.begin().await?;
    let channel = registry::find_channel(&mut tx, uuid).await?;
    let room = rooms::registry::find_room(&mut tx, channel.room_uuid).await?;
    if !can_manage(&channel, &room, &user) {
        return Err(AppError::Forbidden("Only the channel or room owner can do that.".to_owned()));
    }

    registry::delete_channel(&mut tx, uuid).await?;
    tx.commit().await?;

    tracing::info!("channel {uuid} deleted from room {}", room.id);
    Ok(StatusCode::NO_CONTENT)
}

/// Room members may join a channel themselves; the channel or room owner may
/// add any room member.
#[debug_handler(state = AppState)]
pub(crate) async fn add_member(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Path(uuid): Path<ChannelId>,
    Json(AddMemberRequest { profile_uuid }): Json<AddMemberRequest>,
) -> AppResult<Json<Channel>> {
    let mut tx = db_pool.begin().await?;
    let mut channel = registry::find_channel(&mut tx, uuid).await?;
    let room = rooms::registry::find_room(&mut tx, channel.room_uuid).await?;

    let joining_self = profile_uuid == user.profile;
    if !joining_self && !can_manage(&channel, &room, &user) {
        return Err(AppError::Forbidden("Only the channel or room owner can add others.".to_owned()));
    }
    if !identity::profile_exists(&mut tx, profile_uuid).await? {
        return Err(AppError::not_found(format!("profile {profile_uuid}")));
    }
    if !room.is_member(&profile_uuid) {
        return Err(AppError::validation("Profile is not a member of this room."));
    }

    if channel.add_member(profile_uuid) {
        registry::save_channel(&mut tx, &mut channel).await?;
        tx.commit().await?;
    }

    Ok(Json(channel))
}
