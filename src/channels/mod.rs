pub mod registry;
mod channel;
mod new;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(channel::list_channels).post(new::new_channel))
        .route("/room/{room_uuid}", get(channel::room_channels))
        .route("/{uuid}", get(channel::channel).put(channel::update_channel).patch(channel::update_channel).delete(channel::delete_channel))
        .route("/{uuid}/members", post(channel::add_member))
}
