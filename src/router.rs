//! Routes inbound webhook updates (commands and button presses) to handlers.
//!
//! Every handled update ends in exactly one outbound message, or one photo for
//! a movie detail with a poster. Button presses are acknowledged first.

use chrono::Utc;
use serde::Deserialize;
use teloxide::types::InlineKeyboardMarkup;
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

use crate::callback::CallbackAction;
use crate::error::{BotError, CatalogError};
use crate::reminder::send_tracked_list;
use crate::session::{BrowseMode, BrowseSession, SessionStore, PAGE_SIZE};
use crate::storage::Storage;
use crate::tg::{
    detail_caption, html_escape, keyboard_genres, keyboard_movie_page, keyboard_regions,
    movie_page_text, Command, Messenger,
};
use crate::tmdb::{Catalog, Movie, MoviePage};

const WELCOME: &str = "🎬 Welcome to Movie Tracker Bot!\n👇 Please choose your region below";
const ABOUT: &str = "🎬 Movie Tracker Bot keeps an eye on upcoming releases for you.\n\
    Track a movie and you'll get a daily countdown until it hits the screens.\n\
    Movie data and posters: © TMDB";
const HELP_HINT: &str = "Sorry, I don't recognize that command. Try /help to see what I can do!";
const REBROWSE: &str = "⚠️ Please type /upcoming or /upcoming_genre again to refresh the list.";
const NOT_FOUND: &str = "⚠️ Movie not found in the current list. Try /upcoming or /upcoming_genre again.";

/* ====== Inbound webhook payload ====== */

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundUpdate {
    pub message: Option<InboundMessage>,
    pub callback_query: Option<InboundCallback>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub chat: InboundChat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InboundChat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundCallback {
    pub id: String,
    pub message: Option<InboundMessage>,
    pub data: Option<String>,
}

pub struct UpdateRouter<C, M, S> {
    catalog: C,
    messenger: M,
    storage: Storage,
    sessions: S,
    default_region: String,
    bot_username: String,
}

impl<C: Catalog, M: Messenger, S: SessionStore> UpdateRouter<C, M, S> {
    pub fn new(catalog: C, messenger: M, storage: Storage, sessions: S, default_region: String) -> Self {
        Self {
            catalog,
            messenger,
            storage,
            sessions,
            default_region,
            bot_username: String::new(),
        }
    }

    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = username.into();
        self
    }

    pub fn messenger(&self) -> &M {
        &self.messenger
    }

    pub async fn handle_update(&self, update: InboundUpdate) -> Result<(), BotError> {
        if let Some(q) = update.callback_query {
            return self.on_callback(q).await;
        }
        if let Some(msg) = update.message {
            return self.on_message(msg).await;
        }
        debug!("ignoring update without message or callback");
        Ok(())
    }

    /* ====== Text / commands ====== */

    async fn on_message(&self, msg: InboundMessage) -> Result<(), BotError> {
        let chat_id = msg.chat.id;
        let text = msg.text.unwrap_or_default();
        let Some(cmd) = Command::parse_text(&text, &self.bot_username) else {
            return self.reply(chat_id, HELP_HINT).await;
        };
        info!(chat_id, ?cmd, "command");
        match cmd {
            Command::Start => self.messenger.send_text(chat_id, WELCOME, Some(keyboard_regions())).await,
            Command::Help => self.reply(chat_id, &Command::descriptions().to_string()).await,
            Command::About => self.reply(chat_id, ABOUT).await,
            Command::Upcoming => self.start_browse(chat_id, BrowseMode::All).await,
            Command::UpcomingGenre => self.send_genre_picker(chat_id).await,
            Command::Tracked => self.send_tracked(chat_id).await,
        }
    }

    async fn send_genre_picker(&self, chat_id: i64) -> Result<(), BotError> {
        let genres = self.catalog.genres();
        if genres.is_empty() {
            return self.reply(chat_id, "⚠️ The genre list is unavailable right now.").await;
        }
        self.messenger
            .send_text(chat_id, "👇 Select your preferred movie genre", Some(keyboard_genres(genres)))
            .await
    }

    async fn send_tracked(&self, chat_id: i64) -> Result<(), BotError> {
        let movies = self.storage.tracked_for_user(chat_id).await?;
        if movies.is_empty() {
            return self
                .reply(chat_id, "You are not tracking any movies yet. Browse with /upcoming and tap ⭐ Add.")
                .await;
        }
        send_tracked_list(&self.messenger, chat_id, "⭐ Your tracked movies", &movies, Utc::now().date_naive()).await
    }

    /* ====== Callback buttons ====== */

    async fn on_callback(&self, q: InboundCallback) -> Result<(), BotError> {
        if let Err(e) = self.messenger.answer_callback(&q.id).await {
            warn!(callback_id = %q.id, error = %e, "callback acknowledgement failed");
        }
        let Some(chat_id) = q.message.as_ref().map(|m| m.chat.id) else {
            debug!(callback_id = %q.id, "callback without originating message");
            return Ok(());
        };
        let data = q.data.unwrap_or_default();
        let Some(action) = CallbackAction::parse(&data) else {
            warn!(chat_id, %data, "unrecognized callback data");
            return self.reply(chat_id, HELP_HINT).await;
        };
        info!(chat_id, %action, "callback");
        match action {
            CallbackAction::Region(code) => {
                self.storage.upsert_user_region(chat_id, &code).await?;
                self.reply(chat_id, &format!("✅ Your region is: {}", html_escape(&code))).await
            }
            CallbackAction::Genre(id) => self.start_browse(chat_id, BrowseMode::Genre(id)).await,
            CallbackAction::Next(offset) => self.next_page(chat_id, offset).await,
            CallbackAction::Add(id) => self.add_movie(chat_id, id).await,
            CallbackAction::Detail(id) => self.show_detail(chat_id, id).await,
            CallbackAction::Remove(id) => self.remove_movie(chat_id, id).await,
        }
    }

    async fn start_browse(&self, chat_id: i64, mode: BrowseMode) -> Result<(), BotError> {
        let region = self
            .storage
            .get_user_region(chat_id)
            .await?
            .unwrap_or_else(|| self.default_region.clone());
        let page = match self.fetch(mode, &region, 1).await {
            Ok(page) => page,
            Err(e) => return self.reply(chat_id, &failure(&e)).await,
        };
        if page.movies.is_empty() {
            let text = match mode {
                BrowseMode::All => "Sorry. There are no upcoming movies.",
                BrowseMode::Genre(_) => "Can't find any upcoming movies of this genre.",
            };
            return self.reply(chat_id, text).await;
        }
        let session = BrowseSession::new(page.movies, 1, region, mode);
        let (text, keyboard) = self.render_page(&session, 0);
        self.sessions.set(chat_id, session).await;
        self.messenger.send_text(chat_id, &text, Some(keyboard)).await
    }

    async fn next_page(&self, chat_id: i64, offset: usize) -> Result<(), BotError> {
        let Some(mut session) = self.sessions.get(chat_id).await else {
            return self.reply(chat_id, REBROWSE).await;
        };

        if session.has_offset(offset) {
            session.page_cursor = offset;
            let (text, keyboard) = self.render_page(&session, offset);
            self.sessions.set(chat_id, session).await;
            return self.messenger.send_text(chat_id, &text, Some(keyboard)).await;
        }

        let next = session.page_number + 1;
        let page = match self.fetch(session.mode, &session.region, next).await {
            Ok(page) => page,
            Err(e) => return self.reply(chat_id, &failure(&e)).await,
        };
        if page.movies.is_empty() {
            let text = format!(
                "📭 No more upcoming movies available in {}.",
                html_escape(&session.region)
            );
            return self.reply(chat_id, &text).await;
        }
        let session = BrowseSession::new(page.movies, next, session.region, session.mode);
        let (text, keyboard) = self.render_page(&session, 0);
        self.sessions.set(chat_id, session).await;
        self.messenger.send_text(chat_id, &text, Some(keyboard)).await
    }

    async fn add_movie(&self, chat_id: i64, movie_id: i64) -> Result<(), BotError> {
        let Some(movie) = self.cached_movie(chat_id, movie_id).await else {
            return self.reply(chat_id, NOT_FOUND).await;
        };
        self.storage.ensure_user(chat_id, &self.default_region).await?;
        let added = self.storage.add_tracked_movie(chat_id, &movie).await?;
        let title = html_escape(&movie.title);
        let text = if added {
            format!("⭐ Added <b>{title}</b> to your tracking list.")
        } else {
            format!("<b>{title}</b> is already in your tracking list.")
        };
        self.reply(chat_id, &text).await
    }

    async fn show_detail(&self, chat_id: i64, movie_id: i64) -> Result<(), BotError> {
        let Some(movie) = self.cached_movie(chat_id, movie_id).await else {
            return self.reply(chat_id, NOT_FOUND).await;
        };
        let caption = detail_caption(&movie);
        match &movie.poster_url {
            Some(poster) => self.messenger.send_photo(chat_id, poster, &caption, None).await,
            None => self.reply(chat_id, &caption).await,
        }
    }

    async fn remove_movie(&self, chat_id: i64, movie_id: i64) -> Result<(), BotError> {
        let removed = self.storage.remove_tracked_movie(chat_id, movie_id).await?;
        let text = if removed {
            "🗑 Removed from your tracking list."
        } else {
            "That movie is not in your tracking list."
        };
        self.reply(chat_id, text).await
    }

    /* ====== Helpers ====== */

    async fn cached_movie(&self, chat_id: i64, movie_id: i64) -> Option<Movie> {
        self.sessions.get(chat_id).await?.find(movie_id).cloned()
    }

    async fn fetch(&self, mode: BrowseMode, region: &str, page: u32) -> Result<MoviePage, CatalogError> {
        let result = match mode {
            BrowseMode::All => self.catalog.list_upcoming(region, page).await,
            BrowseMode::Genre(id) => self.catalog.list_upcoming_by_genre(id, region, page).await,
        };
        match &result {
            Ok(p) => debug!(?mode, region, page, movies = p.movies.len(), elapsed_ms = p.elapsed.as_millis() as u64, "catalog page"),
            Err(e) => warn!(?mode, region, page, error = %e, "catalog request failed"),
        }
        result
    }

    fn render_page(&self, session: &BrowseSession, offset: usize) -> (String, InlineKeyboardMarkup) {
        let header = match session.mode {
            BrowseMode::All => format!("Upcoming Movies · page {}", session.page_number),
            BrowseMode::Genre(id) => format!(
                "Upcoming {} Movies · page {}",
                self.catalog.genres().display_name(id),
                session.page_number
            ),
        };
        let slice = session.slice(offset);
        (movie_page_text(&header, slice), keyboard_movie_page(slice, offset + PAGE_SIZE))
    }

    async fn reply(&self, chat_id: i64, text: &str) -> Result<(), BotError> {
        self.messenger.send_text(chat_id, text, None).await
    }
}

fn failure(e: &CatalogError) -> String {
    format!("Failure: {}", html_escape(&e.to_string()))
}
