pub mod registry;
mod new;
mod room;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(room::list_rooms).post(new::new_room))
        .route("/public", get(room::public_rooms))
        .route("/user/{user_id}", get(room::user_rooms))
        .route("/{id}", get(room::room).put(room::update_room).patch(room::update_room).delete(room::delete_room))
        .route("/{id}/members", post(room::add_member))
}
