use axum::{debug_handler, Json};
use serde_json::{json, Value};

/// Lists the entry points of the API.
#[debug_handler]
pub async fn index() -> Json<Value> {
    Json(json!({
        "register": "/register",
        "signin": "/signin",
        "token": "/token",
        "token_refresh": "/token/refresh",
        "token_verify": "/token/verify",
        "profile": "/profile",
        "check_username": "/check-username",
        "users": "/users",
        "rooms": "/rooms",
        "channels": "/channels",
    }))
}
