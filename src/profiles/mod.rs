mod page;
mod users;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(page::profile))
        .route("/check-username", post(page::check_username))
        .route("/users", get(users::list_users))
        .route("/users/profile", get(page::profile))
        .route("/users/{id}", get(users::user).put(users::update_user).patch(users::update_user).delete(users::delete_user))
}
