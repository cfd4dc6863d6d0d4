use axum::{debug_handler, extract::State, http::StatusCode, Json};
use rand::seq::IndexedRandom;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::AuthUser,
    db::{self, Channel, DEFAULT_CHANNEL_COLOR},
    ids::RoomId,
    members::Membership,
    rooms, AppError, AppResult, AppState,
};

use super::registry::{self, NewChannel};

const COLORS: [&str; 8] = [
    "rgb(216, 210, 123)", "rgb(123, 182, 216)", "rgb(216, 140, 123)", "rgb(150, 216, 123)",
    "rgb(186, 123, 216)", "rgb(216, 123, 172)", "rgb(123, 216, 196)", "rgb(216, 176, 123)",
];

fn random_color() -> String {
    COLORS.choose(&mut rand::rng()).copied().unwrap_or(DEFAULT_CHANNEL_COLOR).to_owned()
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewChannelRequest {
    room_uuid: RoomId,
    name: String,
    color: Option<String>,
}

/// Any member of the room may open a channel in it and becomes its owner.
#[debug_handler(state = AppState)]
pub(crate) async fn new_channel(
    State(db_pool): State<SqlitePool>,
    user: AuthUser,
    Json(NewChannelRequest { room_uuid, name, color }): Json<NewChannelRequest>,
) -> AppResult<(StatusCode, Json<Channel>)> {
    if name.trim().is_empty() {
        return Err(AppError::validation("Channel name is required."));
    }

    // take the write lock up front so concurrent creations in one room queue
    // up instead of racing for the next position
    let mut tx = db_pool.begin_with("BEGIN IMMEDIATE").await?;
    let mut room = rooms::registry::find_room(&mut tx, room_uuid).await?;
    if !room.is_member(&user.profile) {
        return Err(AppError::Forbidden("Only room members can create channels.".to_owned()));
    }

    let channel = registry::create_channel(&mut tx, &mut room, NewChannel {
        name: name.trim().to_owned(),
        owner: user.profile,
        color: color.filter(|c| !c.trim().is_empty()).unwrap_or_else(random_color),
        created_at: db::now(),
    }).await?;
    tx.commit().await?;

    tracing::info!("channel {:?} created in room {} at position {:?}", channel.name, room.id, channel.relative_id);
    Ok((StatusCode::CREATED, Json(channel)))
}
