//! Runtime configuration, read from the environment (and `.env`) at startup.

use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    /// Public base URL; `/webhook` is appended when registering.
    pub webhook_url: Option<String>,
    /// Username used to accept `/command@bot` forms in group chats.
    pub bot_username: String,

    pub tmdb_bearer: String,
    pub tmdb_base_url: String,
    pub tmdb_timeout: Duration,

    pub database_url: String,
    pub genre_file: String,
    pub bind_address: String,
    pub default_region: String,

    pub session_capacity: u64,
    pub session_idle: Duration,

    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            telegram_token: std::env::var("TELEGRAM_BOT_TOKEN")
                .context("TELEGRAM_BOT_TOKEN is missing")?,
            webhook_url: std::env::var("TELEGRAM_WEBHOOK_URL").ok(),
            bot_username: env_or("BOT_USERNAME", ""),
            tmdb_bearer: std::env::var("TMDB_BEARER_TOKEN")
                .context("TMDB_BEARER_TOKEN is missing")?,
            tmdb_base_url: env_or("TMDB_BASE_URL", "https://api.themoviedb.org/3"),
            tmdb_timeout: Duration::from_secs(parse_env("TMDB_TIMEOUT_SECS", 10)),
            database_url: env_or("DATABASE_URL", "sqlite://movie_tracker_bot.db"),
            genre_file: env_or("GENRE_FILE", "./genres.json"),
            bind_address: env_or("BIND_ADDRESS", "0.0.0.0:8000"),
            default_region: env_or("DEFAULT_REGION", "US"),
            session_capacity: parse_env("SESSION_CAPACITY", 10_000),
            session_idle: Duration::from_secs(parse_env("SESSION_IDLE_SECS", 24 * 60 * 60)),
            log_json: std::env::var("LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
