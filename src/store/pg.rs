use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::{
    CreateFollowOutcome, FollowStore, StoreResult, WatchChange, WatchState, WatchStore,
};
use crate::db::PgPool;
use crate::models::{FollowedUser, MovieWatch, NewFollowedUser, NewMovieWatch};
use crate::schema::{followed_users, movie_watches};

/// Diesel-backed implementation of both stores, sharing one pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FollowStore for PgStore {
    async fn create_follow(
        &self,
        guild_id: i64,
        channel_id: i64,
        username: &str,
    ) -> StoreResult<CreateFollowOutcome> {
        let mut conn = self.pool.get()?;
        let new_follow = NewFollowedUser {
            id: Uuid::new_v4(),
            guild_id,
            channel_id,
            username: username.to_string(),
        };

        match diesel::insert_into(followed_users::table)
            .values(&new_follow)
            .execute(&mut conn)
        {
            Ok(_) => Ok(CreateFollowOutcome::Created),
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => Ok(CreateFollowOutcome::AlreadyFollowing),
            Err(err) => Err(err.into()),
        }
    }

    async fn remove_follow(
        &self,
        guild_id: i64,
        channel_id: i64,
        username: &str,
    ) -> StoreResult<bool> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(
            followed_users::table
                .filter(followed_users::guild_id.eq(guild_id))
                .filter(followed_users::channel_id.eq(channel_id))
                .filter(followed_users::username.eq(username)),
        )
        .execute(&mut conn)?;
        Ok(deleted > 0)
    }

    async fn follows_for_channel(
        &self,
        guild_id: i64,
        channel_id: i64,
    ) -> StoreResult<Vec<FollowedUser>> {
        let mut conn = self.pool.get()?;
        let follows = followed_users::table
            .filter(followed_users::guild_id.eq(guild_id))
            .filter(followed_users::channel_id.eq(channel_id))
            .order(followed_users::created_at.asc())
            .load(&mut conn)?;
        Ok(follows)
    }

    async fn all_follows(&self) -> StoreResult<Vec<FollowedUser>> {
        let mut conn = self.pool.get()?;
        let follows = followed_users::table
            .order(followed_users::created_at.asc())
            .load(&mut conn)?;
        Ok(follows)
    }

    async fn distinct_usernames(&self) -> StoreResult<Vec<String>> {
        let mut conn = self.pool.get()?;
        let usernames = followed_users::table
            .select(followed_users::username)
            .distinct()
            .load(&mut conn)?;
        Ok(usernames)
    }

    async fn advance_watermark(
        &self,
        follow_id: Uuid,
        watermark: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut conn = self.pool.get()?;
        diesel::update(followed_users::table.find(follow_id))
            .set(followed_users::last_entry_date.eq(watermark))
            .execute(&mut conn)?;
        Ok(())
    }
}

#[async_trait]
impl WatchStore for PgStore {
    async fn watches_for_user(&self, username: &str) -> StoreResult<Vec<MovieWatch>> {
        let mut conn = self.pool.get()?;
        let watches = movie_watches::table
            .filter(movie_watches::username.eq(username))
            .load(&mut conn)?;
        Ok(watches)
    }

    async fn apply_changes(&self, username: &str, changes: Vec<WatchChange>) -> StoreResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut conn = self.pool.get()?;
        conn.transaction(|conn| {
            for change in changes {
                match change {
                    WatchChange::Insert(state) => {
                        let WatchState {
                            film_id,
                            rating,
                            liked,
                            watch_date,
                        } = state;
                        let new_watch = NewMovieWatch {
                            id: Uuid::new_v4(),
                            film_id,
                            username: username.to_string(),
                            rating,
                            liked,
                            watch_date,
                        };
                        diesel::insert_into(movie_watches::table)
                            .values(&new_watch)
                            .execute(conn)?;
                    }
                    WatchChange::Update(state) => {
                        diesel::update(
                            movie_watches::table
                                .filter(movie_watches::film_id.eq(&state.film_id))
                                .filter(movie_watches::username.eq(username)),
                        )
                        .set((
                            movie_watches::rating.eq(state.rating),
                            movie_watches::liked.eq(state.liked),
                            movie_watches::watch_date.eq(state.watch_date),
                            movie_watches::updated_at.eq(Utc::now()),
                        ))
                        .execute(conn)?;
                    }
                }
            }
            Ok(())
        })
        .map_err(|err: diesel::result::Error| err.into())
    }

    async fn watchers_of_film(
        &self,
        film_id: &str,
        usernames: &[String],
    ) -> StoreResult<Vec<MovieWatch>> {
        let mut conn = self.pool.get()?;
        let watches = movie_watches::table
            .filter(movie_watches::film_id.eq(film_id))
            .filter(movie_watches::username.eq_any(usernames))
            .load(&mut conn)?;
        Ok(watches)
    }
}
