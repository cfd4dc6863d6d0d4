use async_trait::async_trait;
use sqlx::SqliteConnection;

use crate::{
    channels::{self, registry::NewChannel},
    db::{self, DEFAULT_CHANNEL_COLOR},
    identity, rooms, AppError, AppResult,
};

use super::{all_rooms, BatchJob, Outcome, RoomItem};

pub const DEFAULT_CHANNEL_NAME: &str = "Intro";

/// Creates one "Intro" channel, owned by the room owner, in every room whose
/// channel list is empty. Rooms that list any channel are left alone.
pub struct ProvisionDefaultChannels;

#[async_trait]
impl BatchJob for ProvisionDefaultChannels {
    type Item = RoomItem;

    fn name(&self) -> &'static str {
        "create-default-channels"
    }

    fn description(&self) -> &'static str {
        "Create an \"Intro\" channel in every room that has none"
    }

    async fn find_work(&self, conn: &mut SqliteConnection) -> AppResult<Vec<RoomItem>> {
        all_rooms(conn).await
    }

    async fn execute_one(&self, item: &RoomItem, conn: &mut SqliteConnection) -> AppResult<Outcome> {
        let mut room = rooms::registry::find_room(&mut *conn, item.id).await?;
        if !room.channel_ids.is_empty() {
            return Ok(Outcome::Unchanged);
        }

        match identity::user_for_profile(&mut *conn, room.owner_uuid).await {
            Ok(_) => {}
            Err(AppError::NotFound(_)) => {
                return Ok(Outcome::Skipped(format!("owner {} does not exist", room.owner_uuid)));
            }
            Err(e) => return Err(e),
        }

        let owner = room.owner_uuid;
        let channel = channels::registry::create_channel(&mut *conn, &mut room, NewChannel {
            name: DEFAULT_CHANNEL_NAME.to_owned(),
            owner,
            color: DEFAULT_CHANNEL_COLOR.to_owned(),
            created_at: db::now(),
        }).await?;

        tracing::debug!("created {DEFAULT_CHANNEL_NAME} channel #{} in room {}", channel.id, room.id);
        Ok(Outcome::Updated)
    }
}
