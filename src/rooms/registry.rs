use sqlx::{types::Json, SqliteConnection};
use time::OffsetDateTime;

use crate::{
    channels,
    db::{self, Room, Visibility},
    ids::{ProfileId, RoomId},
    members::{MemberSet, Membership},
    AppError, AppResult,
};

const ROOM_COLUMNS: &str = "id,name,description,category,visibility,active,owner_uuid,members_uuids,\
    channel_ids,latest_message,last_active,created_at,last_updated";

#[derive(Debug, Clone, Default)]
pub struct NewRoom {
    pub name: String,
    pub description: String,
    pub category: String,
    pub visibility: Visibility,
    pub latest_message: Option<String>,
    pub last_active: Option<OffsetDateTime>,
}

/// Creates a room owned by `owner`, who becomes its first member.
pub async fn create_room(conn: &mut SqliteConnection, owner: ProfileId, new: NewRoom) -> AppResult<Room> {
    let now = db::now();
    let room: Room = sqlx::query_as(&format!(
        "INSERT INTO rooms (id,name,description,category,visibility,active,owner_uuid,members_uuids,\
         channel_ids,latest_message,last_active,created_at,last_updated) \
         VALUES (?,?,?,?,?,1,?,?,'[]',?,?,?,?) RETURNING {ROOM_COLUMNS}"
    ))
    .bind(RoomId::new())
    .bind(&new.name)
    .bind(&new.description)
    .bind(&new.category)
    .bind(new.visibility)
    .bind(owner)
    .bind(Json(MemberSet::with_owner(owner)))
    .bind(&new.latest_message)
    .bind(new.last_active)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    tracing::info!("room {:?} ({}) created by {owner}", room.name, room.id);
    Ok(room)
}

pub async fn find_room(conn: &mut SqliteConnection, id: RoomId) -> AppResult<Room> {
    sqlx::query_as(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id=?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("room"))
}

pub async fn list_rooms(conn: &mut SqliteConnection, category: Option<&str>) -> AppResult<Vec<Room>> {
    Ok(
        sqlx::query_as(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE (?1 IS NULL OR category=?1) ORDER BY created_at,id"
        ))
        .bind(category)
        .fetch_all(&mut *conn)
        .await?
    )
}

pub async fn list_public_rooms(conn: &mut SqliteConnection) -> AppResult<Vec<Room>> {
    Ok(
        sqlx::query_as(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE visibility=? ORDER BY created_at,id"
        ))
        .bind(Visibility::Public)
        .fetch_all(&mut *conn)
        .await?
    )
}

/// Rooms `profile` owns or is a member of.
pub async fn rooms_for_profile(conn: &mut SqliteConnection, profile: ProfileId) -> AppResult<Vec<Room>> {
    Ok(
        sqlx::query_as(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms \
             WHERE owner_uuid=?1 OR EXISTS (SELECT 1 FROM json_each(rooms.members_uuids) WHERE value=?1) \
             ORDER BY created_at,id"
        ))
        .bind(profile)
        .fetch_all(&mut *conn)
        .await?
    )
}

pub async fn find_rooms_by_name(conn: &mut SqliteConnection, owner: ProfileId, name: &str) -> AppResult<Vec<Room>> {
    Ok(
        sqlx::query_as(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE owner_uuid=? AND name=?"))
            .bind(owner)
            .bind(name)
            .fetch_all(&mut *conn)
            .await?
    )
}

/// Ids and names of every room, oldest first.
pub async fn all_room_refs(conn: &mut SqliteConnection) -> AppResult<Vec<(RoomId, String)>> {
    Ok(
        sqlx::query_as("SELECT id,name FROM rooms ORDER BY created_at,id")
            .fetch_all(&mut *conn)
            .await?
    )
}

/// Writes every mutable column of `room` back. The owner is put back into the
/// member set first, so no write can leave a room without its owner.
pub async fn save_room(conn: &mut SqliteConnection, room: &mut Room) -> AppResult<()> {
    room.ensure_owner_member();
    room.last_updated = db::now();

    sqlx::query(
        "UPDATE rooms SET name=?,description=?,category=?,visibility=?,active=?,owner_uuid=?,\
         members_uuids=?,channel_ids=?,latest_message=?,last_active=?,last_updated=? WHERE id=?"
    )
    .bind(&room.name)
    .bind(&room.description)
    .bind(&room.category)
    .bind(room.visibility)
    .bind(room.active)
    .bind(room.owner_uuid)
    .bind(&room.members_uuids)
    .bind(&room.channel_ids)
    .bind(&room.latest_message)
    .bind(room.last_active)
    .bind(room.last_updated)
    .bind(room.id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Deletes the room and every channel that belongs to it.
pub async fn delete_room(conn: &mut SqliteConnection, id: RoomId) -> AppResult<()> {
    let removed = channels::registry::delete_channels_in_room(&mut *conn, id).await?;
    let result = sqlx::query("DELETE FROM rooms WHERE id=?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("room"));
    }

    tracing::info!("room {id} deleted with {removed} channels");
    Ok(())
}
