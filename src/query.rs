use std::cmp::Reverse;
use std::sync::Arc;

use serde::Serialize;

use crate::models::MovieWatch;
use crate::source::{FilmDetails, FilmSource};
use crate::store::{FollowStore, StoreError, WatchStore};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("no film matched `{0}`")]
    FilmNotFound(String),

    #[error("source: {0}")]
    Source(#[from] crate::source::SourceError),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
pub struct Watcher {
    pub username: String,
    pub rating: Option<i16>,
    pub stars: Option<String>,
    pub liked: Option<bool>,
    pub watch_date: Option<String>,
}

/// The answer to "who watched this film?": resolved film details plus the
/// channel's followed users that logged it, best rating first. An empty
/// watcher list is a valid answer, distinct from `FilmNotFound`.
#[derive(Debug, Serialize)]
pub struct FilmWatchReport {
    pub film: FilmDetails,
    pub watchers: Vec<Watcher>,
}

/// Serves `whowatched` purely from the watch store; reconciliation has
/// already paid the per-user source cost centrally.
pub struct AggregationQuery {
    follows: Arc<dyn FollowStore>,
    watches: Arc<dyn WatchStore>,
    source: Arc<dyn FilmSource>,
}

impl AggregationQuery {
    pub fn new(
        follows: Arc<dyn FollowStore>,
        watches: Arc<dyn WatchStore>,
        source: Arc<dyn FilmSource>,
    ) -> Self {
        Self {
            follows,
            watches,
            source,
        }
    }

    pub async fn who_watched(
        &self,
        guild_id: i64,
        channel_id: i64,
        title: &str,
    ) -> Result<FilmWatchReport, QueryError> {
        let film_ref = self
            .source
            .search_film(title)
            .await?
            .ok_or_else(|| QueryError::FilmNotFound(title.to_string()))?;
        let film = self.source.film_details(&film_ref.slug).await?;

        let usernames: Vec<String> = self
            .follows
            .follows_for_channel(guild_id, channel_id)
            .await?
            .into_iter()
            .map(|follow| follow.username)
            .collect();

        let mut rows = self.watches.watchers_of_film(&film_ref.id, &usernames).await?;
        sort_by_rating(&mut rows);

        let watchers = rows
            .into_iter()
            .map(|row| Watcher {
                username: row.username,
                rating: row.rating,
                stars: row.rating.map(crate::notify::render_stars),
                liked: row.liked,
                watch_date: row.watch_date,
            })
            .collect();

        Ok(FilmWatchReport { film, watchers })
    }
}

/// Descending by rating, unrated last; ties keep retrieval order (the sort
/// is stable).
fn sort_by_rating(rows: &mut [MovieWatch]) {
    rows.sort_by_key(|row| (row.rating.is_none(), Reverse(row.rating.unwrap_or(0))));
}
