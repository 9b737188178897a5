use std::future::Future;

use teloxide::{
    prelude::*,
    types::{
        BotCommand, CallbackQueryId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile,
        ParseMode,
    },
    utils::command::BotCommands,
};
use unicode_segmentation::UnicodeSegmentation;

use crate::callback::CallbackAction;
use crate::error::BotError;
use crate::genres::GenreDictionary;
use crate::tmdb::Movie;

/// Telegram's hard limit for photo captions, counted after HTML parsing.
const CAPTION_LIMIT: usize = 1024;
/// Room left in a caption for the date and genre lines.
const CAPTION_TITLE_LIMIT: usize = CAPTION_LIMIT - 256;

pub const REGIONS: [&str; 2] = ["US", "CA"];

/* ====== Commands ====== */
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "📖 Available commands:")]
pub enum Command {
    #[command(description = "set your region for upcoming movies")]
    Start,
    #[command(description = "display all the commands")]
    Help,
    #[command(description = "view upcoming movie releases")]
    Upcoming,
    #[command(description = "view upcoming movie releases by genre")]
    UpcomingGenre,
    #[command(description = "show the movies you are tracking")]
    Tracked,
    #[command(description = "about this bot")]
    About,
}

impl Command {
    /// Only the first word counts, so `/upcoming please` still works.
    pub fn parse_text(text: &str, bot_username: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?.to_lowercase();
        Self::parse(&first, &bot_username.to_lowercase()).ok()
    }
}

/// Outbound side of the chat transport. Text is always sent as HTML.
pub trait Messenger: Send + Sync + 'static {
    fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> impl Future<Output = Result<(), BotError>> + Send;

    fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> impl Future<Output = Result<(), BotError>> + Send;

    fn answer_callback(&self, callback_id: &str) -> impl Future<Output = Result<(), BotError>> + Send;

    fn set_commands(&self, commands: Vec<BotCommand>) -> impl Future<Output = Result<(), BotError>> + Send;

    fn set_webhook(&self, url: &str) -> impl Future<Output = Result<(), BotError>> + Send;
}

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

impl Messenger for TelegramMessenger {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), BotError> {
        let req = self.bot.send_message(ChatId(chat_id), text).parse_mode(ParseMode::Html);
        match keyboard {
            Some(kb) => req.reply_markup(kb).await?,
            None => req.await?,
        };
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), BotError> {
        let url = parse_url(photo_url)?;
        let req = self
            .bot
            .send_photo(ChatId(chat_id), InputFile::url(url))
            .caption(caption)
            .parse_mode(ParseMode::Html);
        match keyboard {
            Some(kb) => req.reply_markup(kb).await?,
            None => req.await?,
        };
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), BotError> {
        self.bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()))
            .await?;
        Ok(())
    }

    async fn set_commands(&self, commands: Vec<BotCommand>) -> Result<(), BotError> {
        self.bot.set_my_commands(commands).await?;
        Ok(())
    }

    async fn set_webhook(&self, url: &str) -> Result<(), BotError> {
        self.bot.set_webhook(parse_url(url)?).await?;
        Ok(())
    }
}

fn parse_url(raw: &str) -> Result<reqwest::Url, BotError> {
    reqwest::Url::parse(raw).map_err(|e| BotError::InvalidUrl(format!("{raw}: {e}")))
}

/* ====== Keyboards ====== */

pub fn keyboard_regions() -> InlineKeyboardMarkup {
    let row = REGIONS
        .iter()
        .map(|code| InlineKeyboardButton::callback(*code, CallbackAction::Region(code.to_string()).to_string()))
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(vec![row])
}

/// Two genres per row, in dictionary order.
pub fn keyboard_genres(genres: &GenreDictionary) -> InlineKeyboardMarkup {
    let rows = genres
        .iter()
        .map(|g| InlineKeyboardButton::callback(g.name.clone(), CallbackAction::Genre(g.id).to_string()))
        .collect::<Vec<_>>()
        .chunks(2)
        .map(<[InlineKeyboardButton]>::to_vec)
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

/// `⭐ Add n` / `🔍 More detail` per movie, numbered within the slice, then `➡ Next`.
pub fn keyboard_movie_page(slice: &[Movie], next_offset: usize) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    for (i, m) in slice.iter().enumerate() {
        rows.push(vec![
            InlineKeyboardButton::callback(format!("⭐ Add {}", i + 1), CallbackAction::Add(m.id).to_string()),
            InlineKeyboardButton::callback("🔍 More detail", CallbackAction::Detail(m.id).to_string()),
        ]);
    }
    rows.push(vec![InlineKeyboardButton::callback(
        "➡ Next",
        CallbackAction::Next(next_offset).to_string(),
    )]);
    InlineKeyboardMarkup::new(rows)
}

/* ====== Helpers ====== */

pub fn genres_line(genres: &[String]) -> String {
    if genres.is_empty() {
        "N/A".to_string()
    } else {
        html_escape(&genres.join(", "))
    }
}

pub fn date_or_tba(date: Option<&str>) -> String {
    html_escape(date.unwrap_or("TBA"))
}

pub fn movie_page_text(header: &str, slice: &[Movie]) -> String {
    let mut out = format!("🎬 {}\n\n", html_escape(header));
    for (i, m) in slice.iter().enumerate() {
        out.push_str(&format!(
            "{}.\n🎞️ {}\n📅 {}\n🎭 {}\n\n",
            i + 1,
            html_escape(&m.title),
            date_or_tba(m.release_date.as_deref()),
            genres_line(&m.genres),
        ));
    }
    out.trim_end().to_string()
}

/// Clipped before escaping, so a cut never lands inside an HTML entity.
pub fn detail_caption(m: &Movie) -> String {
    format!(
        "🎬 <b>{}</b>\n📅 {}\n🎭 {}",
        html_escape(&clip(&m.title, CAPTION_TITLE_LIMIT)),
        date_or_tba(m.release_date.as_deref()),
        genres_line(&m.genres),
    )
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Cut to `max` grapheme clusters, marking the cut with an ellipsis.
pub fn clip(s: &str, max: usize) -> String {
    if s.graphemes(true).count() <= max {
        s.to_string()
    } else {
        s.graphemes(true).take(max.saturating_sub(1)).collect::<String>() + "…"
    }
}
