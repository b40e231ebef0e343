use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use super::{
    DiaryEntry, FilmDetails, FilmRef, FilmSource, SourceError, SourceResult, UserProfile,
    WatchedFilm,
};

/// Adapter over the Letterboxd data service. All scraping lives on the other
/// side of the wire; this client only fetches JSON and shapes it into the
/// crate's boundary types.
pub struct HttpFilmSource {
    client: Client,
    base_url: String,
}

impl HttpFilmSource {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let user_agent = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> SourceResult<Response> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|err| SourceError::Unavailable(err.to_string()))?;
        Ok(response)
    }

    async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> SourceResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!(
                "source returned {status}"
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|err| SourceError::Malformed(err.to_string()))
    }
}

#[derive(Deserialize)]
struct WireDate {
    year: i32,
    month: u32,
    day: u32,
}

#[derive(Deserialize)]
struct WireActions {
    rating: Option<i16>,
    #[serde(default)]
    liked: bool,
    #[serde(default)]
    rewatched: bool,
    review_link: Option<String>,
}

#[derive(Deserialize)]
struct WireDiaryEntry {
    film_slug: String,
    name: String,
    date: WireDate,
    #[serde(default = "default_actions")]
    actions: WireActions,
}

fn default_actions() -> WireActions {
    WireActions {
        rating: None,
        liked: false,
        rewatched: false,
        review_link: None,
    }
}

#[derive(Deserialize)]
struct WireDiaryPage {
    entries: Vec<WireDiaryEntry>,
}

#[derive(Deserialize)]
struct WireWatchList {
    movies: HashMap<String, WatchedFilm>,
}

#[derive(Deserialize)]
struct WireSearchResults {
    results: Vec<FilmRef>,
}

#[derive(Deserialize)]
struct WireReview {
    text: Option<String>,
}

fn shape_entry(wire: WireDiaryEntry) -> SourceResult<DiaryEntry> {
    let WireDiaryEntry {
        film_slug,
        name,
        date,
        actions,
    } = wire;
    let date = NaiveDate::from_ymd_opt(date.year, date.month, date.day).ok_or_else(|| {
        SourceError::Malformed(format!(
            "invalid diary date {}-{}-{} for {film_slug}",
            date.year, date.month, date.day
        ))
    })?;
    if let Some(rating) = actions.rating {
        if !(0..=10).contains(&rating) {
            return Err(SourceError::Malformed(format!(
                "rating {rating} out of half-star range for {film_slug}"
            )));
        }
    }
    Ok(DiaryEntry {
        film_slug,
        film_name: name,
        date,
        rating: actions.rating,
        liked: actions.liked,
        rewatched: actions.rewatched,
        review_link: actions.review_link,
    })
}

#[async_trait]
impl FilmSource for HttpFilmSource {
    async fn user_profile(&self, username: &str) -> SourceResult<UserProfile> {
        let response = self.get(&format!("/users/{username}"), &[]).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::UserNotFound(username.to_string()));
        }
        Self::decode(response).await
    }

    async fn diary_page(&self, username: &str, page: u32) -> SourceResult<Vec<DiaryEntry>> {
        let page_param = page.to_string();
        let response = self
            .get(
                &format!("/users/{username}/diary"),
                &[("page", page_param.as_str())],
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::UserNotFound(username.to_string()));
        }
        let page: WireDiaryPage = Self::decode(response).await?;
        page.entries.into_iter().map(shape_entry).collect()
    }

    async fn all_watches(&self, username: &str) -> SourceResult<HashMap<String, WatchedFilm>> {
        let response = self.get(&format!("/users/{username}/films"), &[]).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::UserNotFound(username.to_string()));
        }
        let list: WireWatchList = Self::decode(response).await?;
        Ok(list.movies)
    }

    async fn search_film(&self, title: &str) -> SourceResult<Option<FilmRef>> {
        let response = self.get("/search/films", &[("q", title)]).await?;
        let results: WireSearchResults = Self::decode(response).await?;
        Ok(results.results.into_iter().next())
    }

    async fn film_details(&self, slug: &str) -> SourceResult<FilmDetails> {
        let response = self.get(&format!("/films/{slug}"), &[]).await?;
        Self::decode(response).await
    }

    async fn review_text(&self, review_link: &str) -> SourceResult<Option<String>> {
        let response = self.get("/reviews", &[("link", review_link)]).await?;
        let review: WireReview = Self::decode(response).await?;
        Ok(review.text)
    }
}
