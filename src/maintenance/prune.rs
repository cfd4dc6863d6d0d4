use async_trait::async_trait;
use sqlx::SqliteConnection;

use crate::{
    channels,
    db::ChannelRef,
    ids::ChannelId,
    rooms, AppResult,
};

use super::{all_rooms, BatchJob, Outcome, RoomItem};

/// Rebuilds each room's channel list: entries that are not the uuid of one of
/// the room's own channels are dropped, then the room's channels that are
/// missing from the list are appended in position order.
pub struct PruneChannelRefs;

#[async_trait]
impl BatchJob for PruneChannelRefs {
    type Item = RoomItem;

    fn name(&self) -> &'static str {
        "prune-channel-refs"
    }

    fn description(&self) -> &'static str {
        "Drop channel references that do not point at a channel of the room"
    }

    async fn find_work(&self, conn: &mut SqliteConnection) -> AppResult<Vec<RoomItem>> {
        all_rooms(conn).await
    }

    async fn execute_one(&self, item: &RoomItem, conn: &mut SqliteConnection) -> AppResult<Outcome> {
        let mut room = rooms::registry::find_room(&mut *conn, item.id).await?;
        let owned: Vec<ChannelId> = channels::registry::channels_in_room(&mut *conn, room.id)
            .await?
            .into_iter()
            .filter_map(|c| c.uuid)
            .collect();

        let rebuilt = rebuild_refs(&room.channel_ids, &owned);
        if rebuilt == *room.channel_ids {
            return Ok(Outcome::Unchanged);
        }

        tracing::debug!("room {}: {} channel refs -> {}", room.id, room.channel_ids.len(), rebuilt.len());
        *room.channel_ids = rebuilt;
        rooms::registry::save_room(&mut *conn, &mut room).await?;
        Ok(Outcome::Updated)
    }
}

/// `current` with everything not in `owned` removed, followed by the members
/// of `owned` it did not list.
fn rebuild_refs(current: &[ChannelRef], owned: &[ChannelId]) -> Vec<ChannelRef> {
    let mut refs: Vec<ChannelRef> = vec![];
    for r in current {
        if let ChannelRef::Uuid(id) = r {
            if owned.contains(id) && !refs.contains(r) {
                refs.push(r.clone());
            }
        }
    }
    for id in owned {
        let r = ChannelRef::Uuid(*id);
        if !refs.contains(&r) {
            refs.push(r);
        }
    }
    refs
}
