use thiserror::Error;

/// Anything that can go wrong while talking to TMDB.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog responded with {status} for {endpoint}")]
    Status {
        status: reqwest::StatusCode,
        endpoint: &'static str,
    },
}

/// Reading or writing the local genre dictionary file.
#[derive(Debug, Error)]
pub enum GenreError {
    #[error("genre file io: {0}")]
    Io(#[from] std::io::Error),

    #[error("genre file is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Errors surfaced by the update router and the reminder job.
///
/// Catalog failures are normally turned into a chat message before they get
/// here; whatever reaches the webhook boundary is logged and dropped.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("storage: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("telegram: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("invalid url {0}")]
    InvalidUrl(String),
}
