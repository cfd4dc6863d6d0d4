use async_trait::async_trait;
use sqlx::SqliteConnection;

use crate::{
    db::Visibility,
    identity,
    res::{self, SeedRoom},
    rooms::{self, registry::NewRoom},
    AppError, AppResult,
};

use super::{BatchJob, Outcome};

pub const SEED_OWNER: &str = "admin";

/// Creates the predefined public study rooms, owned by the `admin` user.
/// A room that user already owns under the same name is not created again.
pub struct PopulateRooms;

#[async_trait]
impl BatchJob for PopulateRooms {
    type Item = SeedRoom;

    fn name(&self) -> &'static str {
        "populate-rooms"
    }

    fn description(&self) -> &'static str {
        "Create the predefined study rooms"
    }

    async fn find_work(&self, _conn: &mut SqliteConnection) -> AppResult<Vec<SeedRoom>> {
        Ok(res::seed_rooms()?)
    }

    async fn execute_one(&self, seed: &SeedRoom, conn: &mut SqliteConnection) -> AppResult<Outcome> {
        let Some(admin) = identity::find_user_by_username(&mut *conn, SEED_OWNER).await? else {
            return Ok(Outcome::Skipped(format!("user {SEED_OWNER:?} does not exist")));
        };
        let owner = match identity::profile_uuid_for_user(&mut *conn, admin.id).await {
            Ok(owner) => owner,
            Err(AppError::NotFound(_)) => {
                return Ok(Outcome::Skipped(format!("user {SEED_OWNER:?} has no profile")));
            }
            Err(e) => return Err(e),
        };

        if !rooms::registry::find_rooms_by_name(&mut *conn, owner, &seed.name).await?.is_empty() {
            return Ok(Outcome::Unchanged);
        }

        rooms::registry::create_room(&mut *conn, owner, NewRoom {
            name: seed.name.clone(),
            description: seed.category.clone(),
            category: seed.category.clone(),
            visibility: Visibility::Public,
            latest_message: Some(seed.recent_message.clone()),
            last_active: Some(seed.last_active),
        }).await?;
        Ok(Outcome::Updated)
    }
}
