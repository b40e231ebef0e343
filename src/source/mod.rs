use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod http;

pub use http::HttpFilmSource;

pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or upstream failure. Callers retry on their next scheduled
    /// interval, never immediately.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("no Letterboxd user named `{0}`")]
    UserNotFound(String),

    #[error("malformed source response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// One logged diary entry, shaped at the adapter boundary. Pages arrive
/// newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiaryEntry {
    pub film_slug: String,
    pub film_name: String,
    pub date: NaiveDate,
    pub rating: Option<i16>,
    pub liked: bool,
    pub rewatched: bool,
    pub review_link: Option<String>,
}

/// One entry of a user's full watch list, keyed by film id upstream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchedFilm {
    pub rating: Option<i16>,
    pub liked: Option<bool>,
    pub watch_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilmRef {
    pub id: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilmDetails {
    pub id: String,
    pub title: String,
    pub year: Option<i32>,
    pub poster_url: Option<String>,
    pub genres: Vec<String>,
    pub url: String,
}

/// The external movie-cataloguing site, behind a seam. The adapter does no
/// retrying of its own and validates response shapes before anything flows
/// downstream.
#[async_trait]
pub trait FilmSource: Send + Sync + 'static {
    /// Profile lookup, also used to validate a username at follow time.
    async fn user_profile(&self, username: &str) -> SourceResult<UserProfile>;

    /// One diary page, 1-indexed, newest entries first. An empty page
    /// signals the end of the user's history.
    async fn diary_page(&self, username: &str, page: u32) -> SourceResult<Vec<DiaryEntry>>;

    /// The user's complete watch list: film id -> observed state.
    async fn all_watches(&self, username: &str) -> SourceResult<HashMap<String, WatchedFilm>>;

    /// Best-match film for a free-text title, or `None`.
    async fn search_film(&self, title: &str) -> SourceResult<Option<FilmRef>>;

    async fn film_details(&self, slug: &str) -> SourceResult<FilmDetails>;

    /// Plain-text body of a review, given the link a diary entry carried.
    async fn review_text(&self, review_link: &str) -> SourceResult<Option<String>>;
}
