use async_trait::async_trait;
use sqlx::SqliteConnection;

use crate::{channels, members::Membership, rooms, AppResult};

use super::{all_rooms, BatchJob, Outcome, RoomItem};

/// Puts the owner of each room, and of each of its channels, back into the
/// matching member set.
pub struct SyncOwnerMembership;

#[async_trait]
impl BatchJob for SyncOwnerMembership {
    type Item = RoomItem;

    fn name(&self) -> &'static str {
        "sync-owner-membership"
    }

    fn description(&self) -> &'static str {
        "Put every room and channel owner back into its member set"
    }

    async fn find_work(&self, conn: &mut SqliteConnection) -> AppResult<Vec<RoomItem>> {
        all_rooms(conn).await
    }

    async fn execute_one(&self, item: &RoomItem, conn: &mut SqliteConnection) -> AppResult<Outcome> {
        let mut room = rooms::registry::find_room(&mut *conn, item.id).await?;
        let mut changed = false;

        if !room.members().contains(&room.owner()) {
            rooms::registry::save_room(&mut *conn, &mut room).await?;
            changed = true;
        }

        for mut channel in channels::registry::channels_in_room(&mut *conn, room.id).await? {
            if !channel.members().contains(&channel.owner()) {
                channels::registry::save_channel(&mut *conn, &mut channel).await?;
                changed = true;
            }
        }

        Ok(if changed { Outcome::Updated } else { Outcome::Unchanged })
    }
}
