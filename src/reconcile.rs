use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::models::MovieWatch;
use crate::source::{FilmSource, WatchedFilm};
use crate::store::{FollowStore, StoreError, WatchChange, WatchState, WatchStore};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("source: {0}")]
    Source(#[from] crate::source::SourceError),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub users: usize,
    pub changes: usize,
    pub failures: usize,
}

/// Computes the change set that brings the stored facts in line with the
/// source's full watch list. Last write wins; rows are only touched when the
/// observed state actually differs, and nothing is ever deleted.
pub fn diff_watches(
    existing: &[MovieWatch],
    fetched: &HashMap<String, WatchedFilm>,
) -> Vec<WatchChange> {
    let by_film: HashMap<&str, &MovieWatch> = existing
        .iter()
        .map(|watch| (watch.film_id.as_str(), watch))
        .collect();

    let mut changes = Vec::new();
    for (film_id, watched) in fetched {
        match by_film.get(film_id.as_str()) {
            Some(row) => {
                let changed = row.rating != watched.rating
                    || row.liked != watched.liked
                    || (watched.watch_date.is_some() && row.watch_date != watched.watch_date);
                if changed {
                    changes.push(WatchChange::Update(WatchState {
                        film_id: film_id.clone(),
                        rating: watched.rating,
                        liked: watched.liked,
                        // A source that stopped reporting the date should not
                        // erase one we already observed.
                        watch_date: watched
                            .watch_date
                            .clone()
                            .or_else(|| row.watch_date.clone()),
                    }));
                }
            }
            None => changes.push(WatchChange::Insert(WatchState {
                film_id: film_id.clone(),
                rating: watched.rating,
                liked: watched.liked,
                watch_date: watched.watch_date.clone(),
            })),
        }
    }
    changes
}

/// Periodic engine: full-state reconciliation of every distinct followed
/// user's watch list into the watch store.
pub struct WatchReconciler {
    follows: Arc<dyn FollowStore>,
    watches: Arc<dyn WatchStore>,
    source: Arc<dyn FilmSource>,
}

impl WatchReconciler {
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

    /// One pass over the deduplicated username set. Users processed before a
    /// failure stay committed; the failing user is logged and skipped.
    pub async fn run_once(&self) -> Result<ReconcileSummary, StoreError> {
        let usernames = self.follows.distinct_usernames().await?;

        let mut summary = ReconcileSummary {
            users: usernames.len(),
            ..ReconcileSummary::default()
        };

        for username in &usernames {
            match self.reconcile_user(username).await {
                Ok(changes) => summary.changes += changes,
                Err(err) => {
                    summary.failures += 1;
                    warn!(
                        username = %username,
                        error = %err,
                        "watch reconciliation failed for user; retrying next interval"
                    );
                }
            }
        }

        info!(
            users = summary.users,
            changes = summary.changes,
            failures = summary.failures,
            "watch reconciliation pass finished"
        );
        Ok(summary)
    }

    async fn reconcile_user(&self, username: &str) -> Result<usize, ReconcileError> {
        let fetched = self.source.all_watches(username).await?;
        let existing = self.watches.watches_for_user(username).await?;

        let changes = diff_watches(&existing, &fetched);
        let count = changes.len();
        if count > 0 {
            self.watches.apply_changes(username, changes).await?;
        }
        Ok(count)
    }
}
