use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::CreateFollowOutcome;

#[derive(Deserialize)]
pub struct CreateFollowRequest {
    pub username: String,
}

#[derive(Serialize)]
pub struct FollowEntry {
    pub username: String,
    pub followed_since: DateTime<Utc>,
    pub last_entry_date: Option<DateTime<Utc>>,
}

pub async fn create_follow(
    State(state): State<AppState>,
    Path((guild_id, channel_id)): Path<(i64, i64)>,
    Json(payload): Json<CreateFollowRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(AppError::bad_request("username must not be empty"));
    }

    // Validate against the source before storing anything; an unknown user
    // surfaces as 404 and no subscription is created.
    state.source.user_profile(username).await?;

    match state
        .follows
        .create_follow(guild_id, channel_id, username)
        .await?
    {
        CreateFollowOutcome::Created => Ok((
            StatusCode::CREATED,
            Json(serde_json::json!({ "username": username })),
        )),
        CreateFollowOutcome::AlreadyFollowing => Err(AppError::conflict(format!(
            "already following `{username}` in this channel"
        ))),
    }
}

pub async fn remove_follow(
    State(state): State<AppState>,
    Path((guild_id, channel_id, username)): Path<(i64, i64, String)>,
) -> AppResult<StatusCode> {
    let removed = state
        .follows
        .remove_follow(guild_id, channel_id, &username)
        .await?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!(
            "not currently following `{username}` in this channel"
        )))
    }
}

pub async fn list_follows(
    State(state): State<AppState>,
    Path((guild_id, channel_id)): Path<(i64, i64)>,
) -> AppResult<Json<Vec<FollowEntry>>> {
    let follows = state
        .follows
        .follows_for_channel(guild_id, channel_id)
        .await?;

    let entries = follows
        .into_iter()
        .map(|follow| FollowEntry {
            username: follow.username,
            followed_since: follow.created_at,
            last_entry_date: follow.last_entry_date,
        })
        .collect();

    Ok(Json(entries))
}
