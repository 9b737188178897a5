//! Per-chat browse sessions: the last fetched page of movies and where the
//! user is in it.

use std::future::Future;
use std::time::Duration;

use moka::future::Cache;

use crate::tmdb::Movie;

/// Movies rendered per message.
pub const PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseMode {
    All,
    Genre(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseSession {
    /// The whole remote page, as returned by the catalog.
    pub movies: Vec<Movie>,
    /// Offset of the slice currently shown.
    pub page_cursor: usize,
    /// Remote page the movies came from (1-based).
    pub page_number: u32,
    pub region: String,
    pub mode: BrowseMode,
}

impl BrowseSession {
    pub fn new(movies: Vec<Movie>, page_number: u32, region: String, mode: BrowseMode) -> Self {
        Self { movies, page_cursor: 0, page_number, region, mode }
    }

    /// `movies[offset..offset + PAGE_SIZE]`, clamped; empty once past the end.
    pub fn slice(&self, offset: usize) -> &[Movie] {
        let start = offset.min(self.movies.len());
        let end = offset.saturating_add(PAGE_SIZE).min(self.movies.len());
        &self.movies[start..end]
    }

    pub fn has_offset(&self, offset: usize) -> bool {
        offset < self.movies.len()
    }

    pub fn find(&self, movie_id: i64) -> Option<&Movie> {
        self.movies.iter().find(|m| m.id == movie_id)
    }
}

/// Where browse sessions live between requests. Last write wins.
pub trait SessionStore: Send + Sync + 'static {
    fn get(&self, chat_id: i64) -> impl Future<Output = Option<BrowseSession>> + Send;

    fn set(&self, chat_id: i64, session: BrowseSession) -> impl Future<Output = ()> + Send;
}

/// In-memory store bounded by entry count and idle time.
#[derive(Clone)]
pub struct MokaSessionStore {
    cache: Cache<i64, BrowseSession>,
}

impl MokaSessionStore {
    pub fn new(max_capacity: u64, time_to_idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(time_to_idle)
            .build();
        Self { cache }
    }
}

impl SessionStore for MokaSessionStore {
    async fn get(&self, chat_id: i64) -> Option<BrowseSession> {
        self.cache.get(&chat_id).await
    }

    async fn set(&self, chat_id: i64, session: BrowseSession) {
        self.cache.insert(chat_id, session).await;
    }
}
