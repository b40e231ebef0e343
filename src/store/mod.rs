use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{FollowedUser, MovieWatch};

pub mod pg;

pub use pg::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("pool: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("database: {0}")]
    Database(#[from] diesel::result::Error),
}

#[derive(Debug, PartialEq, Eq)]
pub enum CreateFollowOutcome {
    Created,
    /// The (guild, channel, username) triple already exists. Detected via
    /// the unique constraint so concurrent requests collapse to one row.
    AlreadyFollowing,
}

/// Registry of (guild, channel, followed-username) subscriptions and their
/// diary watermarks.
#[async_trait]
pub trait FollowStore: Send + Sync + 'static {
    async fn create_follow(
        &self,
        guild_id: i64,
        channel_id: i64,
        username: &str,
    ) -> StoreResult<CreateFollowOutcome>;

    /// Returns `false` when the subscription did not exist.
    async fn remove_follow(
        &self,
        guild_id: i64,
        channel_id: i64,
        username: &str,
    ) -> StoreResult<bool>;

    async fn follows_for_channel(
        &self,
        guild_id: i64,
        channel_id: i64,
    ) -> StoreResult<Vec<FollowedUser>>;

    async fn all_follows(&self) -> StoreResult<Vec<FollowedUser>>;

    /// Usernames deduplicated across subscriptions; reconciliation cost is
    /// per user, not per channel.
    async fn distinct_usernames(&self) -> StoreResult<Vec<String>>;

    /// Only the diary sync engine calls this, after it has built the
    /// subscription's events for the batch.
    async fn advance_watermark(
        &self,
        follow_id: Uuid,
        watermark: DateTime<Utc>,
    ) -> StoreResult<()>;
}

/// Observed watch state for one film, as reconciliation wants to persist it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchState {
    pub film_id: String,
    pub rating: Option<i16>,
    pub liked: Option<bool>,
    pub watch_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchChange {
    Insert(WatchState),
    Update(WatchState),
}

/// Normalized per-user-per-film watch facts. Rows are upserted by
/// reconciliation and never deleted.
#[async_trait]
pub trait WatchStore: Send + Sync + 'static {
    async fn watches_for_user(&self, username: &str) -> StoreResult<Vec<MovieWatch>>;

    /// Applies one user's change set in a single transaction.
    async fn apply_changes(&self, username: &str, changes: Vec<WatchChange>) -> StoreResult<()>;

    /// Facts for one film restricted to the given usernames, in retrieval
    /// order (the aggregation query sorts them itself).
    async fn watchers_of_film(
        &self,
        film_id: &str,
        usernames: &[String],
    ) -> StoreResult<Vec<MovieWatch>>;
}
