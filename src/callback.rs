//! Inline-button payloads (`callback_data`), e.g. `next_5` or `add_12345`.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static CALLBACK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(region|genre|next|add|detail|remove)_([A-Za-z0-9-]+)$").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Region(String),
    Genre(i64),
    Next(usize),
    Add(i64),
    Detail(i64),
    Remove(i64),
}

impl CallbackAction {
    /// `None` for anything the bot never emits.
    pub fn parse(data: &str) -> Option<Self> {
        let caps = CALLBACK_RE.captures(data)?;
        let arg = &caps[2];
        let action = match &caps[1] {
            "region" => Self::Region(arg.to_ascii_uppercase()),
            "genre" => Self::Genre(arg.parse().ok()?),
            "next" => Self::Next(arg.parse().ok()?),
            "add" => Self::Add(arg.parse().ok()?),
            "detail" => Self::Detail(arg.parse().ok()?),
            "remove" => Self::Remove(arg.parse().ok()?),
            _ => return None,
        };
        Some(action)
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region(code) => write!(f, "region_{code}"),
            Self::Genre(id) => write!(f, "genre_{id}"),
            Self::Next(offset) => write!(f, "next_{offset}"),
            Self::Add(id) => write!(f, "add_{id}"),
            Self::Detail(id) => write!(f, "detail_{id}"),
            Self::Remove(id) => write!(f, "remove_{id}"),
        }
    }
}
