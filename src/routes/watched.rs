use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::query::{AggregationQuery, FilmWatchReport};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct WhoWatchedParams {
    pub title: String,
}

pub async fn who_watched(
    State(state): State<AppState>,
    Path((guild_id, channel_id)): Path<(i64, i64)>,
    Query(params): Query<WhoWatchedParams>,
) -> AppResult<Json<FilmWatchReport>> {
    let title = params.title.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("title must not be empty"));
    }

    let query = AggregationQuery::new(
        state.follows.clone(),
        state.watches.clone(),
        state.source.clone(),
    );
    let report = query.who_watched(guild_id, channel_id, title).await?;
    Ok(Json(report))
}
