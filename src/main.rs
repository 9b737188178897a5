use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use dotenvy::dotenv;
use teloxide::Bot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use movie_tracker_bot::config::Config;
use movie_tracker_bot::genres::GenreDictionary;
use movie_tracker_bot::reminder;
use movie_tracker_bot::router::UpdateRouter;
use movie_tracker_bot::server::{self, AppState};
use movie_tracker_bot::session::MokaSessionStore;
use movie_tracker_bot::storage::Storage;
use movie_tracker_bot::tg::TelegramMessenger;
use movie_tracker_bot::tmdb::TmdbClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    info!(version = env!("CARGO_PKG_VERSION"), "movie tracker bot starting");

    let storage = Storage::open(&cfg.database_url).await?;

    let tmdb = TmdbClient::new(cfg.tmdb_bearer.clone(), cfg.tmdb_base_url.clone(), cfg.tmdb_timeout)?;
    let genres = GenreDictionary::load_or_fetch(Path::new(&cfg.genre_file), &tmdb).await;
    let tmdb = tmdb.with_genres(genres);

    let messenger = TelegramMessenger::new(Bot::new(&cfg.telegram_token));
    reminder::spawn(storage.clone(), messenger.clone());

    let sessions = MokaSessionStore::new(cfg.session_capacity, cfg.session_idle);
    let router = UpdateRouter::new(tmdb, messenger, storage, sessions, cfg.default_region.clone())
        .with_bot_username(cfg.bot_username.clone());
    if cfg.webhook_url.is_none() {
        warn!("TELEGRAM_WEBHOOK_URL is not set, /set_webhook is disabled");
    }
    let state = Arc::new(AppState { router, webhook_url: cfg.webhook_url.clone() });

    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");
    axum::serve(listener, server::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("movie tracker bot stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
