#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use movie_tracker_bot::error::{BotError, CatalogError};
use movie_tracker_bot::genres::{Genre, GenreDictionary};
use movie_tracker_bot::router::{InboundUpdate, UpdateRouter};
use movie_tracker_bot::session::{BrowseMode, MokaSessionStore};
use movie_tracker_bot::storage::Storage;
use movie_tracker_bot::tg::Messenger;
use movie_tracker_bot::tmdb::{Catalog, Movie, MoviePage};
use serde_json::json;
use teloxide::{ApiError, RequestError};
use teloxide::types::{BotCommand, InlineKeyboardButtonKind, InlineKeyboardMarkup};

pub const CHAT: i64 = 4242;

pub fn movie(id: i64) -> Movie {
    Movie {
        id,
        title: format!("Movie {id}"),
        release_date: Some("2030-06-01".to_string()),
        genres: vec!["Action".to_string()],
        poster_url: if id % 2 == 0 { Some(format!("https://image.tmdb.org/t/p/w500/{id}.jpg")) } else { None },
    }
}

pub fn movies(ids: std::ops::RangeInclusive<i64>) -> Vec<Movie> {
    ids.map(movie).collect()
}

/* ====== Catalog ====== */

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogCall {
    pub mode: BrowseMode,
    pub region: String,
    pub page: u32,
}

#[derive(Clone, Default)]
pub struct FakeCatalog {
    pages: Arc<Mutex<HashMap<u32, Vec<Movie>>>>,
    failing: Arc<Mutex<bool>>,
    calls: Arc<Mutex<Vec<CatalogCall>>>,
    genres: GenreDictionary,
}

impl FakeCatalog {
    /// A catalog whose genre dictionary failed to load.
    pub fn without_genres() -> Self {
        Self::default()
    }

    pub fn new() -> Self {
        Self {
            genres: GenreDictionary::new(vec![
                Genre { id: 28, name: "Action".into() },
                Genre { id: 35, name: "Comedy".into() },
                Genre { id: 27, name: "Horror".into() },
            ]),
            ..Default::default()
        }
    }

    pub fn with_page(self, page: u32, movies: Vec<Movie>) -> Self {
        self.pages.lock().unwrap().insert(page, movies);
        self
    }

    pub fn set_page(&self, page: u32, movies: Vec<Movie>) {
        self.pages.lock().unwrap().insert(page, movies);
    }

    pub fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<CatalogCall> {
        self.calls.lock().unwrap().clone()
    }

    fn serve(&self, mode: BrowseMode, region: &str, page: u32) -> Result<MoviePage, CatalogError> {
        self.calls.lock().unwrap().push(CatalogCall { mode, region: region.to_string(), page });
        if *self.failing.lock().unwrap() {
            return Err(CatalogError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                endpoint: "movie/upcoming",
            });
        }
        let movies = self.pages.lock().unwrap().get(&page).cloned().unwrap_or_default();
        Ok(MoviePage { movies, elapsed: Duration::from_millis(3) })
    }
}

impl Catalog for FakeCatalog {
    async fn list_upcoming(&self, region: &str, page: u32) -> Result<MoviePage, CatalogError> {
        self.serve(BrowseMode::All, region, page)
    }

    async fn list_upcoming_by_genre(&self, genre_id: i64, region: &str, page: u32) -> Result<MoviePage, CatalogError> {
        self.serve(BrowseMode::Genre(genre_id), region, page)
    }

    fn genres(&self) -> &GenreDictionary {
        &self.genres
    }
}

/* ====== Messenger ====== */

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text { chat_id: i64, text: String, keyboard: Option<InlineKeyboardMarkup> },
    Photo { chat_id: i64, url: String, caption: String },
    Ack(String),
    Commands(Vec<String>),
    Webhook(String),
}

#[derive(Clone, Default)]
pub struct FakeMessenger {
    sent: Arc<Mutex<Vec<Sent>>>,
    failing_chats: Arc<Mutex<Vec<i64>>>,
}

impl FakeMessenger {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Outbound messages and photos, acknowledgements excluded.
    pub fn replies(&self) -> Vec<Sent> {
        self.sent().into_iter().filter(|s| !matches!(s, Sent::Ack(_))).collect()
    }

    pub fn last_text(&self) -> String {
        match self.replies().last() {
            Some(Sent::Text { text, .. }) => text.clone(),
            other => panic!("expected a text reply, got {other:?}"),
        }
    }

    pub fn last_callbacks(&self) -> Vec<String> {
        match self.replies().last() {
            Some(Sent::Text { keyboard: Some(kb), .. }) => callback_data(kb),
            other => panic!("expected a reply with keyboard, got {other:?}"),
        }
    }

    pub fn fail_for(&self, chat_id: i64) {
        self.failing_chats.lock().unwrap().push(chat_id);
    }

    fn record(&self, s: Sent) {
        self.sent.lock().unwrap().push(s);
    }
}

pub fn callback_data(kb: &InlineKeyboardMarkup) -> Vec<String> {
    kb.inline_keyboard
        .iter()
        .flatten()
        .filter_map(|b| match &b.kind {
            InlineKeyboardButtonKind::CallbackData(d) => Some(d.clone()),
            _ => None,
        })
        .collect()
}

impl Messenger for FakeMessenger {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<InlineKeyboardMarkup>) -> Result<(), BotError> {
        if self.failing_chats.lock().unwrap().contains(&chat_id) {
            return Err(BotError::Telegram(RequestError::Api(ApiError::BotBlocked)));
        }
        self.record(Sent::Text { chat_id, text: text.to_string(), keyboard });
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
        _keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), BotError> {
        self.record(Sent::Photo { chat_id, url: photo_url.to_string(), caption: caption.to_string() });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), BotError> {
        self.record(Sent::Ack(callback_id.to_string()));
        Ok(())
    }

    async fn set_commands(&self, commands: Vec<BotCommand>) -> Result<(), BotError> {
        self.record(Sent::Commands(commands.into_iter().map(|c| c.command.trim_start_matches('/').to_string()).collect()));
        Ok(())
    }

    async fn set_webhook(&self, url: &str) -> Result<(), BotError> {
        self.record(Sent::Webhook(url.to_string()));
        Ok(())
    }
}

/* ====== Wiring ====== */

pub type TestRouter = UpdateRouter<FakeCatalog, FakeMessenger, MokaSessionStore>;

pub struct Harness {
    pub router: TestRouter,
    pub catalog: FakeCatalog,
    pub messenger: FakeMessenger,
    pub storage: Storage,
}

pub async fn harness(catalog: FakeCatalog) -> Harness {
    harness_with_storage(catalog, Storage::open("sqlite::memory:").await.unwrap())
}

pub fn harness_with_storage(catalog: FakeCatalog, storage: Storage) -> Harness {
    let messenger = FakeMessenger::default();
    let sessions = MokaSessionStore::new(100, Duration::from_secs(600));
    let router = UpdateRouter::new(catalog.clone(), messenger.clone(), storage.clone(), sessions, "US".into());
    Harness { router, catalog, messenger, storage }
}

pub fn text_update(chat_id: i64, text: &str) -> InboundUpdate {
    serde_json::from_value(json!({
        "update_id": 1,
        "message": { "message_id": 7, "chat": { "id": chat_id, "type": "private" }, "text": text }
    }))
    .unwrap()
}

pub fn callback_update(chat_id: i64, data: &str) -> InboundUpdate {
    serde_json::from_value(json!({
        "update_id": 2,
        "callback_query": {
            "id": format!("cb-{data}"),
            "message": { "message_id": 8, "chat": { "id": chat_id } },
            "data": data
        }
    }))
    .unwrap()
}
