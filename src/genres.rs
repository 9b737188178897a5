//! TMDB genre id → name dictionary.
//!
//! The list is fetched from TMDB once and kept in a local JSON file
//! (`{"genres": [{"id": 28, "name": "Action"}, ...]}`); later boots read the
//! file and never hit the network.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::error::GenreError;
use crate::tmdb::TmdbClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// File and wire shape of the genre list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreDictionary {
    genres: Vec<Genre>,
}

impl GenreDictionary {
    pub fn new(genres: Vec<Genre>) -> Self {
        Self { genres }
    }

    pub fn name(&self, id: i64) -> Option<&str> {
        self.genres.iter().find(|g| g.id == id).map(|g| g.name.as_str())
    }

    /// Name for display; ids missing from the dictionary render as "Unknown".
    pub fn display_name(&self, id: i64) -> &str {
        self.name(id).unwrap_or("Unknown")
    }

    /// Genres in the order TMDB returned them.
    pub fn iter(&self) -> impl Iterator<Item = &Genre> {
        self.genres.iter()
    }

    pub fn len(&self) -> usize {
        self.genres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
    }

    pub async fn read_file(path: &Path) -> Result<Self, GenreError> {
        let data = fs::read(path).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Snapshot to `<path>.tmp`, then rename over the target.
    pub async fn write_file(&self, path: &Path) -> Result<(), GenreError> {
        let snapshot = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &snapshot).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read the dictionary from `path`, fetching and persisting it first when
    /// the file does not exist. Never fails: any error degrades to an empty
    /// dictionary, so genre names later show up as "Unknown".
    pub async fn load_or_fetch(path: &Path, tmdb: &TmdbClient) -> Self {
        if !fs::try_exists(path).await.unwrap_or(false) {
            match fetch_and_store(path, tmdb).await {
                Ok(dict) => {
                    info!(path = %path.display(), genres = dict.len(), "genre dictionary fetched");
                    return dict;
                }
                Err(e) => {
                    warn!(error = %e, "genre dictionary fetch failed, continuing without genre names");
                    return Self::default();
                }
            }
        }
        match Self::read_file(path).await {
            Ok(dict) => {
                info!(path = %path.display(), genres = dict.len(), "genre dictionary loaded");
                dict
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "genre dictionary unreadable, continuing without genre names");
                Self::default()
            }
        }
    }
}

async fn fetch_and_store(path: &Path, tmdb: &TmdbClient) -> Result<GenreDictionary, GenreError> {
    let dict = tmdb.fetch_genres().await?;
    dict.write_file(path).await?;
    Ok(dict)
}
