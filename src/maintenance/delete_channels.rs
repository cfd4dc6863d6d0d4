use async_trait::async_trait;
use sqlx::SqliteConnection;

use crate::{channels, AppResult};

use super::{all_channels, BatchJob, ChannelItem, Outcome};

/// Deletes every channel and unlinks it from its room.
pub struct DeleteChannels;

#[async_trait]
impl BatchJob for DeleteChannels {
    type Item = ChannelItem;

    fn name(&self) -> &'static str {
        "delete-channels"
    }

    fn description(&self) -> &'static str {
        "Delete every channel"
    }

    async fn find_work(&self, conn: &mut SqliteConnection) -> AppResult<Vec<ChannelItem>> {
        let channels = all_channels(conn, false).await?;
        if channels.is_empty() {
            tracing::warn!("no channels found");
        }
        Ok(channels)
    }

    async fn execute_one(&self, item: &ChannelItem, conn: &mut SqliteConnection) -> AppResult<Outcome> {
        let Some(channel) = channels::registry::find_channel_by_row(&mut *conn, item.id).await? else {
            return Ok(Outcome::Unchanged);
        };
        channels::registry::delete_channel_row(&mut *conn, &channel).await?;
        Ok(Outcome::Updated)
    }
}
