//! Batch jobs that bring rooms and channels back into a consistent state.
//!
//! A job finds the entities it wants to look at, then handles them one at a
//! time. [`run_job`] gives every entity its own transaction: a failure rolls
//! back that entity alone and is recorded in the [`BatchReport`], and the run
//! carries on with the next one. Jobs are idempotent, so a run that was cut
//! short can simply be started again.

mod backfill;
mod default_channels;
mod delete_channels;
mod owners;
mod populate;
mod positions;
mod prune;

pub use backfill::BackfillChannelUuids;
pub use default_channels::ProvisionDefaultChannels;
pub use delete_channels::DeleteChannels;
pub use owners::SyncOwnerMembership;
pub use populate::PopulateRooms;
pub use positions::RecomputePositions;
pub use prune::PruneChannelRefs;

use std::fmt;

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{channels, ids::RoomId, rooms, AppResult};

/// What happened to a single entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Updated,
    /// Already in the wanted state.
    Unchanged,
    /// Could not be handled, for the given reason. Nothing was written.
    Skipped(String),
}

#[async_trait]
pub trait BatchJob: Send + Sync {
    type Item: fmt::Display + Send + Sync;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        ""
    }

    async fn find_work(&self, conn: &mut SqliteConnection) -> AppResult<Vec<Self::Item>>;

    async fn execute_one(&self, item: &Self::Item, conn: &mut SqliteConnection) -> AppResult<Outcome>;
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub job: &'static str,
    pub updated: usize,
    pub unchanged: usize,
    /// `(entity, reason)`
    pub skipped: Vec<(String, String)>,
    /// `(entity, error)`
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    fn new(job: &'static str) -> Self {
        Self { job, ..Default::default() }
    }

    pub fn total(&self) -> usize {
        self.updated + self.unchanged + self.skipped.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} updated, {} unchanged, {} skipped, {} failed",
            self.job,
            self.updated,
            self.unchanged,
            self.skipped.len(),
            self.failed.len(),
        )
    }
}

pub async fn run_job<J: BatchJob>(pool: &SqlitePool, job: &J) -> AppResult<BatchReport> {
    let items = {
        let mut conn = pool.acquire().await?;
        job.find_work(&mut conn).await?
    };
    tracing::info!(job = job.name(), "{} to process", items.len());

    let mut report = BatchReport::new(job.name());
    for item in &items {
        let mut tx = pool.begin().await?;
        match job.execute_one(item, &mut tx).await {
            Ok(Outcome::Updated) => {
                tx.commit().await?;
                tracing::info!(job = job.name(), "updated {item}");
                report.updated += 1;
            }
            Ok(Outcome::Unchanged) => {
                tx.commit().await?;
                tracing::debug!(job = job.name(), "{item} already up to date");
                report.unchanged += 1;
            }
            Ok(Outcome::Skipped(reason)) => {
                tx.rollback().await?;
                tracing::warn!(job = job.name(), "skipping {item}: {reason}");
                report.skipped.push((item.to_string(), reason));
            }
            Err(e) => {
                tx.rollback().await?;
                tracing::error!(job = job.name(), "{item} failed: {e}");
                report.failed.push((item.to_string(), e.to_string()));
            }
        }
    }

    tracing::info!("{report}");
    Ok(report)
}

/// A room as a unit of work.
#[derive(Debug, Clone)]
pub struct RoomItem {
    pub id: RoomId,
    pub name: String,
}

impl fmt::Display for RoomItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room {:?} ({})", self.name, self.id)
    }
}

async fn all_rooms(conn: &mut SqliteConnection) -> AppResult<Vec<RoomItem>> {
    Ok(
        rooms::registry::all_room_refs(conn)
            .await?
            .into_iter()
            .map(|(id, name)| RoomItem { id, name })
            .collect()
    )
}

/// A channel row as a unit of work.
#[derive(Debug, Clone)]
pub struct ChannelItem {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for ChannelItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {:?} (#{})", self.name, self.id)
    }
}

async fn all_channels(conn: &mut SqliteConnection, missing_uuid_only: bool) -> AppResult<Vec<ChannelItem>> {
    Ok(
        channels::registry::all_channel_refs(conn, missing_uuid_only)
            .await?
            .into_iter()
            .map(|(id, name)| ChannelItem { id, name })
            .collect()
    )
}

/// The maintenance commands, each one or more jobs run in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::Subcommand)]
pub enum Task {
    /// Give every channel without a uuid a fresh one
    BackfillChannelUuids,
    /// Renumber each room's channels 1..N by creation time
    RecomputePositions,
    /// Create an "Intro" channel in every room that has none
    CreateDefaultChannels,
    /// Drop channel references that do not point at a channel of the room
    PruneChannelRefs,
    /// Put every room and channel owner back into its member set
    SyncOwnerMembership,
    /// Delete every channel
    DeleteChannels,
    /// Create the predefined study rooms, owned by the "admin" user
    PopulateRooms,
    /// Prune stale channel references, then create missing "Intro" channels
    UpdateRoomMembers,
    /// Run every consistency job
    All,
}

pub async fn run_task(pool: &SqlitePool, task: Task) -> AppResult<Vec<BatchReport>> {
    Ok(match task {
        Task::BackfillChannelUuids => vec![run_job(pool, &BackfillChannelUuids).await?],
        Task::RecomputePositions => vec![run_job(pool, &RecomputePositions).await?],
        Task::CreateDefaultChannels => vec![run_job(pool, &ProvisionDefaultChannels).await?],
        Task::PruneChannelRefs => vec![run_job(pool, &PruneChannelRefs).await?],
        Task::SyncOwnerMembership => vec![run_job(pool, &SyncOwnerMembership).await?],
        Task::DeleteChannels => vec![run_job(pool, &DeleteChannels).await?],
        Task::PopulateRooms => vec![run_job(pool, &PopulateRooms).await?],
        Task::UpdateRoomMembers => vec![
            run_job(pool, &PruneChannelRefs).await?,
            run_job(pool, &ProvisionDefaultChannels).await?,
        ],
        Task::All => vec![
            run_job(pool, &BackfillChannelUuids).await?,
            run_job(pool, &PruneChannelRefs).await?,
            run_job(pool, &ProvisionDefaultChannels).await?,
            run_job(pool, &RecomputePositions).await?,
            run_job(pool, &SyncOwnerMembership).await?,
        ],
    })
}
