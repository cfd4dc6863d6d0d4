use async_trait::async_trait;
use sqlx::SqliteConnection;

use crate::{channels, AppResult};

use super::{all_rooms, BatchJob, Outcome, RoomItem};

pub struct RecomputePositions;

#[async_trait]
impl BatchJob for RecomputePositions {
    type Item = RoomItem;

    fn name(&self) -> &'static str {
        "recompute-positions"
    }

    fn description(&self) -> &'static str {
        "Renumber each room's channels 1..N by creation time"
    }

    async fn find_work(&self, conn: &mut SqliteConnection) -> AppResult<Vec<RoomItem>> {
        all_rooms(conn).await
    }

    async fn execute_one(&self, item: &RoomItem, conn: &mut SqliteConnection) -> AppResult<Outcome> {
        let moved = channels::registry::recompute_positions(conn, item.id).await?;
        Ok(if moved > 0 { Outcome::Updated } else { Outcome::Unchanged })
    }
}
