use async_trait::async_trait;
use sqlx::SqliteConnection;

use crate::{channels, AppResult};

use super::{all_channels, BatchJob, ChannelItem, Outcome};

/// Assigns a uuid to every channel that has none. A uuid that is already
/// there is never replaced.
pub struct BackfillChannelUuids;

#[async_trait]
impl BatchJob for BackfillChannelUuids {
    type Item = ChannelItem;

    fn name(&self) -> &'static str {
        "backfill-channel-uuids"
    }

    fn description(&self) -> &'static str {
        "Give every channel without a uuid a fresh one"
    }

    async fn find_work(&self, conn: &mut SqliteConnection) -> AppResult<Vec<ChannelItem>> {
        all_channels(conn, true).await
    }

    async fn execute_one(&self, item: &ChannelItem, conn: &mut SqliteConnection) -> AppResult<Outcome> {
        Ok(match channels::registry::assign_uuid(conn, item.id).await? {
            Some(uuid) => {
                tracing::debug!("channel #{} is now {uuid}", item.id);
                Outcome::Updated
            }
            None => Outcome::Unchanged,
        })
    }
}
