use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod follows;
pub mod health;
pub mod watched;

/// Command surface the chat collaborator calls, scoped by path to the
/// (guild, channel) pair the command was invoked from.
pub fn create_router(state: AppState) -> Router<()> {
    let channel_routes = Router::new()
        .route(
            "/follows",
            get(follows::list_follows).post(follows::create_follow),
        )
        .route("/follows/:username", delete(follows::remove_follow))
        .route("/watched", get(watched::who_watched));

    Router::new()
        .nest(
            "/api/guilds/:guild_id/channels/:channel_id",
            channel_routes,
        )
        .route("/api/health", get(health::health_check))
        .route("/api/ready", post(health::mark_ready))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
