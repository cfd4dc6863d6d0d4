use anyhow::Context;
use studyrooms::{app, auth::JwtService, config::Config, connect, init_tracing, mail::Mailer, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    let db_pool = connect(&config.database_url, config.db_max_connections)
        .await
        .context("could not open the database")?;

    let jwt = JwtService::new(
        &config.jwt_secret,
        config.jwt_issuer.clone(),
        time::Duration::minutes(config.access_token_minutes),
        time::Duration::hours(config.refresh_token_hours),
    );
    let mailer = Mailer::new(config.mailerlite_api_key.clone(), config.mailerlite_url.clone());
    if !mailer.is_enabled() {
        tracing::warn!("MAILERLITE_API_KEY not set, welcome emails are disabled");
    }

    let app = app(AppState { db_pool, jwt, mailer });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
