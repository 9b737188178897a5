//! Durable user and tracked-movie state in SQLite.
//!
//! Every operation is a single statement on a one-connection pool, so writes
//! are serialized and immediately durable without explicit transactions.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use tracing::info;

use crate::tmdb::Movie;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedMovie {
    pub chat_id: i64,
    pub movie_id: i64,
    pub title: String,
    pub release_date: Option<String>,
    pub genres: Vec<String>,
    pub poster_url: Option<String>,
    pub added_at: String,
}

#[derive(FromRow)]
struct TrackedRow {
    chat_id: i64,
    movie_id: i64,
    title: String,
    release_date: Option<String>,
    genres: String,
    poster: Option<String>,
    added_at: String,
}

impl From<TrackedRow> for TrackedMovie {
    fn from(r: TrackedRow) -> Self {
        Self {
            chat_id: r.chat_id,
            movie_id: r.movie_id,
            title: r.title,
            release_date: r.release_date,
            genres: serde_json::from_str(&r.genres).unwrap_or_default(),
            poster_url: r.poster,
            added_at: r.added_at,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open (creating if missing) the database at `url` and make sure the
    /// schema exists. `sqlite::memory:` works for tests.
    pub async fn open(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let storage = Self { pool };
        storage.init_schema().await?;
        info!(database_url = %url, "storage ready");
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                chat_id INTEGER PRIMARY KEY,
                region TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_movies (
                chat_id INTEGER NOT NULL,
                movie_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                release_date TEXT,
                genres TEXT NOT NULL,
                poster TEXT,
                added_at TEXT NOT NULL,
                PRIMARY KEY (chat_id, movie_id),
                FOREIGN KEY (chat_id) REFERENCES users(chat_id)
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Set the chat's region, creating the user on first use. `created_at` is
    /// only written by the insert; updates keep the first stamp.
    pub async fn upsert_user_region(&self, chat_id: i64, region: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO users (chat_id, region, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(chat_id) DO UPDATE SET region = excluded.region",
        )
        .bind(chat_id)
        .bind(region)
        .bind(now_stamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Create the user with `default_region` unless it already exists.
    pub async fn ensure_user(&self, chat_id: i64, default_region: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO users (chat_id, region, created_at) VALUES (?1, ?2, ?3)")
            .bind(chat_id)
            .bind(default_region)
            .bind(now_stamp())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_user_region(&self, chat_id: i64) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT region FROM users WHERE chat_id = ?1")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await
    }

    #[cfg(test)]
    async fn user_created_at(&self, chat_id: i64) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT created_at FROM users WHERE chat_id = ?1")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Returns `true` if the movie was newly tracked, `false` if it already was.
    pub async fn add_tracked_movie(&self, chat_id: i64, movie: &Movie) -> Result<bool, sqlx::Error> {
        let genres = serde_json::to_string(&movie.genres).unwrap_or_else(|_| "[]".to_string());
        let result = sqlx::query(
            "INSERT OR IGNORE INTO user_movies
                (chat_id, movie_id, title, release_date, genres, poster, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(chat_id)
        .bind(movie.id)
        .bind(&movie.title)
        .bind(&movie.release_date)
        .bind(genres)
        .bind(&movie.poster_url)
        .bind(now_stamp())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns `true` if a row was deleted; removing an untracked movie is fine.
    pub async fn remove_tracked_movie(&self, chat_id: i64, movie_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_movies WHERE chat_id = ?1 AND movie_id = ?2")
            .bind(chat_id)
            .bind(movie_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn tracked_for_user(&self, chat_id: i64) -> Result<Vec<TrackedMovie>, sqlx::Error> {
        let rows: Vec<TrackedRow> = sqlx::query_as(
            "SELECT chat_id, movie_id, title, release_date, genres, poster, added_at
             FROM user_movies WHERE chat_id = ?1 ORDER BY added_at, movie_id",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TrackedMovie::from).collect())
    }

    /// Every tracked movie, grouped by chat.
    pub async fn all_tracked_by_user(&self) -> Result<BTreeMap<i64, Vec<TrackedMovie>>, sqlx::Error> {
        let rows: Vec<TrackedRow> = sqlx::query_as(
            "SELECT chat_id, movie_id, title, release_date, genres, poster, added_at
             FROM user_movies ORDER BY chat_id, added_at, movie_id",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut grouped: BTreeMap<i64, Vec<TrackedMovie>> = BTreeMap::new();
        for row in rows {
            grouped.entry(row.chat_id).or_default().push(row.into());
        }
        Ok(grouped)
    }
}

/// Fixed-width UTC stamp, so text order matches time order.
fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
