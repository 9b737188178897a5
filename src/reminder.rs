//! Daily reminder sweep over everything users are tracking.

use std::fmt;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::callback::CallbackAction;
use crate::error::BotError;
use crate::storage::{Storage, TrackedMovie};
use crate::tg::{clip, date_or_tba, html_escape, Messenger};

const SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Time left until a movie's release, relative to a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    DaysLeft(i64),
    ReleasesToday,
    AlreadyReleased,
    Unknown,
}

impl Countdown {
    pub fn for_release(release_date: Option<&str>, today: NaiveDate) -> Self {
        let Some(date) = release_date.and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok()) else {
            return Self::Unknown;
        };
        let days = (date - today).num_days();
        match days {
            d if d > 0 => Self::DaysLeft(d),
            0 => Self::ReleasesToday,
            _ => Self::AlreadyReleased,
        }
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DaysLeft(1) => f.write_str("1 day left"),
            Self::DaysLeft(n) => write!(f, "{n} days left"),
            Self::ReleasesToday => f.write_str("releases today"),
            Self::AlreadyReleased => f.write_str("already released"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Telegram rejects message text longer than this (UTF-16 code units).
const MESSAGE_LIMIT: usize = 4096;
/// Two buttons per movie; keeps each keyboard well under Telegram's button cap.
const MOVIES_PER_MESSAGE: usize = 40;
const TITLE_LIMIT: usize = 256;

/// Numbered list of tracked movies with their countdowns, plus
/// `❌ Remove n` / `🔍 More detail` buttons per movie.
///
/// Long lists are split at movie boundaries into several messages; each one
/// carries the buttons for its own movies and numbering continues across them.
pub fn render_tracked(header: &str, movies: &[TrackedMovie], today: NaiveDate) -> Vec<(String, InlineKeyboardMarkup)> {
    let mut chunks = Vec::new();
    let mut text = html_escape(header);
    let mut rows = Vec::new();
    for (i, m) in movies.iter().enumerate() {
        let n = i + 1;
        let countdown = Countdown::for_release(m.release_date.as_deref(), today);
        let block = format!(
            "{n}.\n🎞️ {}\n📅 {} — {countdown}",
            html_escape(&clip(&m.title, TITLE_LIMIT)),
            date_or_tba(m.release_date.as_deref()),
        );
        let full = rows.len() >= MOVIES_PER_MESSAGE || utf16_len(&text) + 2 + utf16_len(&block) > MESSAGE_LIMIT;
        if full && !rows.is_empty() {
            chunks.push((std::mem::take(&mut text), InlineKeyboardMarkup::new(std::mem::take(&mut rows))));
        }
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(&block);
        rows.push(vec![
            InlineKeyboardButton::callback(format!("❌ Remove {n}"), CallbackAction::Remove(m.movie_id).to_string()),
            InlineKeyboardButton::callback("🔍 More detail", CallbackAction::Detail(m.movie_id).to_string()),
        ]);
    }
    chunks.push((text, InlineKeyboardMarkup::new(rows)));
    chunks
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Send one reminder per user with tracked movies. Returns how many users got
/// theirs. A failed send is logged and the sweep moves on to the next user.
pub async fn send_daily_reminders<M: Messenger>(
    storage: &Storage,
    messenger: &M,
    today: NaiveDate,
) -> Result<usize, BotError> {
    let users = storage.all_tracked_by_user().await?;
    let header = format!("🎬 Daily Reminder ({})", today.format("%Y-%m-%d"));
    let mut sent = 0;
    for (chat_id, movies) in &users {
        if movies.is_empty() {
            continue;
        }
        match send_tracked_list(messenger, *chat_id, &header, movies, today).await {
            Ok(()) => sent += 1,
            Err(e) => warn!(chat_id, error = %e, "reminder not delivered"),
        }
    }
    Ok(sent)
}

/// Render and send a tracked list, stopping at the first failed message.
pub async fn send_tracked_list<M: Messenger>(
    messenger: &M,
    chat_id: i64,
    header: &str,
    movies: &[TrackedMovie],
    today: NaiveDate,
) -> Result<(), BotError> {
    for (text, keyboard) in render_tracked(header, movies, today) {
        messenger.send_text(chat_id, &text, Some(keyboard)).await?;
    }
    Ok(())
}

/// Sweep now, then every 24 hours. Missed ticks are not made up.
pub fn spawn<M: Messenger>(storage: Storage, messenger: M) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let today = Utc::now().date_naive();
            match send_daily_reminders(&storage, &messenger, today).await {
                Ok(sent) => info!(%today, sent, "daily reminders sent"),
                Err(e) => error!(%today, error = %e, "daily reminder sweep failed"),
            }
        }
    })
}
