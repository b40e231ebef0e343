use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

/// One (guild, channel) pair following one Letterboxd user.
#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = followed_users)]
pub struct FollowedUser {
    pub id: Uuid,
    pub guild_id: i64,
    pub channel_id: i64,
    pub username: String,
    pub last_entry_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = followed_users)]
pub struct NewFollowedUser {
    pub id: Uuid,
    pub guild_id: i64,
    pub channel_id: i64,
    pub username: String,
}

/// Most-recently-observed watch state for one (film, username) pair.
/// Keyed independently of subscriptions so reconciliation work is shared
/// across channels following the same person.
#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = movie_watches)]
pub struct MovieWatch {
    pub id: Uuid,
    pub film_id: String,
    pub username: String,
    pub rating: Option<i16>,
    pub liked: Option<bool>,
    pub watch_date: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = movie_watches)]
pub struct NewMovieWatch {
    pub id: Uuid,
    pub film_id: String,
    pub username: String,
    pub rating: Option<i16>,
    pub liked: Option<bool>,
    pub watch_date: Option<String>,
}
