pub mod callback;
pub mod config;
pub mod error;
pub mod genres;
pub mod reminder;
pub mod router;
pub mod server;
pub mod session;
pub mod storage;
pub mod tg;
pub mod tmdb;
