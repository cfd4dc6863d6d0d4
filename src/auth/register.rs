use axum::{debug_handler, extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{identity::{self, NewUser}, mail::Mailer, AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterRequest {
    username: String,
    email: String,
    password: String,
    confirm_password: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

impl RegisterRequest {
    fn validate(&self) -> AppResult<()> {
        if self.username.trim().is_empty() {
            return Err(AppError::validation("Username is required."));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(AppError::validation("Enter a valid email address."));
        }
        if self.password.is_empty() {
            return Err(AppError::validation("Password is required."));
        }
        if self.password != self.confirm_password {
            return Err(AppError::validation("Passwords do not match."));
        }
        Ok(())
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    State(mailer): State<Mailer>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;

    let mut tx = db_pool.begin().await?;
    let (user, _profile) = identity::create_user(&mut tx, NewUser {
        username: req.username.trim().to_owned(),
        email: req.email.trim().to_owned(),
        password: req.password,
        first_name: req.first_name,
        last_name: req.last_name,
    }).await?;
    tx.commit().await?;

    mailer.send_in_background(
        "Welcome to Read Rocket!".to_owned(),
        format!("Hello {},\n\nThank you for registering with us!", user.username),
        vec![user.email.clone()],
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully!",
            "user": { "username": user.username, "email": user.email },
        })),
    ))
}
