use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{info, warn};

use crate::models::FollowedUser;
use crate::notify::{DiaryNotification, Notifier};
use crate::source::{DiaryEntry, FilmSource, SourceResult};
use crate::store::{FollowStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("source: {0}")]
    Source(#[from] crate::source::SourceError),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub subscriptions: usize,
    pub events: usize,
    pub failures: usize,
}

/// Walks diary pages (newest first) and returns the entries newer than the
/// watermark, still in page order.
///
/// A subscription with no watermark yet takes exactly the newest entry, so a
/// fresh follow never back-fills history. Otherwise pages are consumed until
/// an entry at or before the watermark shows up, or a page comes back empty
/// (end of history).
pub async fn collect_new_entries(
    source: &dyn FilmSource,
    username: &str,
    watermark: Option<NaiveDate>,
) -> SourceResult<Vec<DiaryEntry>> {
    let mut collected = Vec::new();

    let mut page = 1;
    loop {
        let entries = source.diary_page(username, page).await?;
        if entries.is_empty() {
            return Ok(collected);
        }

        for entry in entries {
            match watermark {
                Some(watermark) => {
                    if entry.date <= watermark {
                        return Ok(collected);
                    }
                    collected.push(entry);
                }
                None => {
                    collected.push(entry);
                    return Ok(collected);
                }
            }
        }

        page += 1;
    }
}

/// Periodic engine: per subscription, fetch the diary delta, emit one
/// notification per new entry in chronological order, and advance the
/// watermark.
pub struct DiarySyncEngine {
    follows: Arc<dyn FollowStore>,
    source: Arc<dyn FilmSource>,
    notifier: Arc<dyn Notifier>,
}

impl DiarySyncEngine {
    pub fn new(
        follows: Arc<dyn FollowStore>,
        source: Arc<dyn FilmSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            follows,
            source,
            notifier,
        }
    }

    /// One full pass over every subscription. A failing subscription is
    /// logged and skipped; it never blocks the rest of the batch.
    pub async fn run_once(&self) -> Result<SyncSummary, StoreError> {
        let follows = self.follows.all_follows().await?;

        let mut summary = SyncSummary {
            subscriptions: follows.len(),
            ..SyncSummary::default()
        };

        for follow in &follows {
            match self.sync_subscription(follow).await {
                Ok(events) => summary.events += events,
                Err(err) => {
                    summary.failures += 1;
                    warn!(
                        username = %follow.username,
                        guild_id = follow.guild_id,
                        channel_id = follow.channel_id,
                        error = %err,
                        "diary sync failed for subscription; retrying next interval"
                    );
                }
            }
        }

        info!(
            subscriptions = summary.subscriptions,
            events = summary.events,
            failures = summary.failures,
            "diary sync pass finished"
        );
        Ok(summary)
    }

    async fn sync_subscription(&self, follow: &FollowedUser) -> Result<usize, SyncError> {
        let watermark = follow.last_entry_date.map(|ts| ts.date_naive());
        let mut entries =
            collect_new_entries(self.source.as_ref(), &follow.username, watermark).await?;
        if entries.is_empty() {
            return Ok(0);
        }

        // Pages arrive newest first; notifications go out in watch order.
        entries.reverse();

        let profile = self.source.user_profile(&follow.username).await?;

        let mut notifications = Vec::with_capacity(entries.len());
        for entry in &entries {
            notifications.push(self.build_notification(follow, &profile, entry).await?);
        }

        // The newest entry date becomes the new already-processed boundary.
        // Advancing before delivery means a rejected send is dropped rather
        // than redelivered.
        let new_watermark = entries[entries.len() - 1]
            .date
            .and_time(NaiveTime::MIN)
            .and_utc();
        self.follows
            .advance_watermark(follow.id, new_watermark)
            .await?;

        let delivered = notifications.len();
        for notification in notifications {
            if let Err(err) = self.notifier.deliver(notification).await {
                warn!(
                    username = %follow.username,
                    channel_id = follow.channel_id,
                    error = %err,
                    "failed to deliver diary notification; dropping it"
                );
            }
        }

        Ok(delivered)
    }

    async fn build_notification(
        &self,
        follow: &FollowedUser,
        profile: &crate::source::UserProfile,
        entry: &DiaryEntry,
    ) -> Result<DiaryNotification, SyncError> {
        let film = self.source.film_details(&entry.film_slug).await?;

        // Review text is decoration; a failed lookup should not hold the
        // whole subscription back.
        let review = match &entry.review_link {
            Some(link) => match self.source.review_text(link).await {
                Ok(text) => text,
                Err(err) => {
                    warn!(
                        film_slug = %entry.film_slug,
                        error = %err,
                        "could not fetch review text"
                    );
                    None
                }
            },
            None => None,
        };

        Ok(DiaryNotification {
            guild_id: follow.guild_id,
            channel_id: follow.channel_id,
            film_title: entry.film_name.clone(),
            film_url: film.url,
            rating: entry.rating,
            stars: entry.rating.map(crate::notify::render_stars),
            liked: entry.liked,
            rewatched: entry.rewatched,
            review,
            entry_date: entry.date,
            poster_url: film.poster_url,
            genres: film.genres,
            viewer_name: profile.display_name.clone(),
            viewer_avatar_url: profile.avatar_url.clone(),
        })
    }
}
