use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod forum;
mod model;
mod service;

use forum::{ForumClient, RedditClient};
use model::Config;
use service::CompanionService;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (ignore if missing)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr();

    // Process-wide forum client, dependency-injected into the service so
    // tests can substitute fakes
    let forum: Arc<dyn ForumClient> = Arc::new(RedditClient::new(
        config.reddit.clone(),
        &config.companion.subreddit,
        &config.companion.user_agent,
    ));

    let companion_service = web::Data::new(CompanionService::new(forum, &config.companion));
    let config_data = web::Data::new(config);

    tracing::info!("Starting CMV companion server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(companion_service.clone())
            .app_data(config_data.clone())
            .configure(api::session::configure)
            .configure(api::health::configure)
            .configure(api::openapi::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
