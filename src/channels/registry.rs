use sqlx::{types::Json, SqliteConnection};
use time::OffsetDateTime;

use crate::{
    appresult::is_unique_violation,
    db::{Channel, Room},
    ids::{ChannelId, ProfileId, RoomId},
    members::{MemberSet, Membership},
    rooms, AppError, AppResult,
};

const CHANNEL_COLUMNS: &str =
    "id,uuid,relative_id,room_uuid,name,owner_uuid,members_uuids,color,created_at";

#[derive(Debug, Clone)]
pub struct NewChannel {
    pub name: String,
    pub owner: ProfileId,
    pub color: String,
    pub created_at: OffsetDateTime,
}

/// Creates a channel in `room`, owned by `new.owner`, at the next free
/// position, and links its uuid into the room's channel list. The room row is
/// saved as part of this.
pub async fn create_channel(conn: &mut SqliteConnection, room: &mut Room, new: NewChannel) -> AppResult<Channel> {
    let channel: Channel = sqlx::query_as(&format!(
        "INSERT INTO channels (uuid,relative_id,room_uuid,name,owner_uuid,members_uuids,color,created_at) \
         VALUES (?1,(SELECT COALESCE(MAX(relative_id),0)+1 FROM channels WHERE room_uuid=?2),?2,?3,?4,?5,?6,?7) \
         RETURNING {CHANNEL_COLUMNS}"
    ))
    .bind(ChannelId::new())
    .bind(room.id)
    .bind(&new.name)
    .bind(new.owner)
    .bind(Json(MemberSet::with_owner(new.owner)))
    .bind(&new.color)
    .bind(new.created_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Another channel took that position, try again.".to_owned())
        } else {
            e.into()
        }
    })?;

    let uuid = channel.uuid.ok_or("inserted channel has no uuid")?;
    room.link_channel(uuid);
    rooms::registry::save_room(&mut *conn, room).await?;

    Ok(channel)
}

pub async fn find_channel(conn: &mut SqliteConnection, uuid: ChannelId) -> AppResult<Channel> {
    sqlx::query_as(&format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE uuid=?"))
        .bind(uuid)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("channel"))
}

pub async fn find_channel_by_row(conn: &mut SqliteConnection, id: i64) -> AppResult<Option<Channel>> {
    Ok(
        sqlx::query_as(&format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE id=?"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
    )
}

pub async fn list_channels(conn: &mut SqliteConnection) -> AppResult<Vec<Channel>> {
    Ok(
        sqlx::query_as(&format!("SELECT {CHANNEL_COLUMNS} FROM channels ORDER BY room_uuid,relative_id,id"))
            .fetch_all(&mut *conn)
            .await?
    )
}

/// Channels of `room` in position order; unpositioned ones last.
pub async fn channels_in_room(conn: &mut SqliteConnection, room: RoomId) -> AppResult<Vec<Channel>> {
    Ok(
        sqlx::query_as(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels WHERE room_uuid=? \
             ORDER BY relative_id IS NULL,relative_id,created_at,id"
        ))
        .bind(room)
        .fetch_all(&mut *conn)
        .await?
    )
}

/// Row ids and names of every channel, optionally only those without a uuid.
pub async fn all_channel_refs(conn: &mut SqliteConnection, missing_uuid_only: bool) -> AppResult<Vec<(i64, String)>> {
    Ok(
        sqlx::query_as("SELECT id,name FROM channels WHERE (?1 = 0 OR uuid IS NULL) ORDER BY id")
            .bind(missing_uuid_only)
            .fetch_all(&mut *conn)
            .await?
    )
}

/// Writes name, owner, members and color. The uuid and position are never
/// touched here.
pub async fn save_channel(conn: &mut SqliteConnection, channel: &mut Channel) -> AppResult<()> {
    channel.ensure_owner_member();

    sqlx::query("UPDATE channels SET name=?,owner_uuid=?,members_uuids=?,color=? WHERE id=?")
        .bind(&channel.name)
        .bind(channel.owner_uuid)
        .bind(&channel.members_uuids)
        .bind(&channel.color)
        .bind(channel.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Gives the channel at row `id` a uuid unless it already has one. Returns the
/// uuid that was assigned.
pub async fn assign_uuid(conn: &mut SqliteConnection, id: i64) -> AppResult<Option<ChannelId>> {
    let uuid = ChannelId::new();
    let result = sqlx::query("UPDATE channels SET uuid=? WHERE id=? AND uuid IS NULL")
        .bind(uuid)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok((result.rows_affected() == 1).then_some(uuid))
}

/// Target positions for channels given as `(row id, created_at, current
/// position)`: 1..N by creation time, row id breaking ties. Only channels whose
/// position changes are returned.
pub fn position_changes(channels: &[(i64, OffsetDateTime, Option<i64>)]) -> Vec<(i64, i64)> {
    let mut ordered: Vec<_> = channels.iter().collect();
    ordered.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));

    ordered.into_iter()
        .zip(1..)
        .filter(|((_, _, current), position)| *current != Some(*position))
        .map(|((id, _, _), position)| (*id, position))
        .collect()
}

/// Renumbers the channels of `room` densely from 1 in creation order. Returns
/// how many channels moved.
pub async fn recompute_positions(conn: &mut SqliteConnection, room: RoomId) -> AppResult<usize> {
    let rows: Vec<(i64, OffsetDateTime, Option<i64>)> =
        sqlx::query_as("SELECT id,created_at,relative_id FROM channels WHERE room_uuid=?")
            .bind(room)
            .fetch_all(&mut *conn)
            .await?;

    let changes = position_changes(&rows);

    // Clear first so the (room_uuid, relative_id) unique index never sees
    // two channels on the same position mid-shuffle.
    for (id, _) in &changes {
        sqlx::query("UPDATE channels SET relative_id=NULL WHERE id=?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    for (id, position) in &changes {
        sqlx::query("UPDATE channels SET relative_id=? WHERE id=?")
            .bind(position)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(changes.len())
}

/// Deletes the channel, unlinks it from its room and closes the gap it left
/// in the room's positions.
pub async fn delete_channel(conn: &mut SqliteConnection, uuid: ChannelId) -> AppResult<Channel> {
    let channel = find_channel(&mut *conn, uuid).await?;
    delete_channel_row(&mut *conn, &channel).await?;
    Ok(channel)
}

pub async fn delete_channel_row(conn: &mut SqliteConnection, channel: &Channel) -> AppResult<()> {
    sqlx::query("DELETE FROM channels WHERE id=?")
        .bind(channel.id)
        .execute(&mut *conn)
        .await?;

    match rooms::registry::find_room(&mut *conn, channel.room_uuid).await {
        Ok(mut room) => {
            if let Some(uuid) = channel.uuid {
                if room.unlink_channel(uuid) {
                    rooms::registry::save_room(&mut *conn, &mut room).await?;
                }
            }
            recompute_positions(&mut *conn, room.id).await?;
        }
        Err(AppError::NotFound(_)) => {
            tracing::warn!("channel {} pointed at missing room {}", channel.id, channel.room_uuid);
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

pub(crate) async fn delete_channels_in_room(conn: &mut SqliteConnection, room: RoomId) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM channels WHERE room_uuid=?")
        .bind(room)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
