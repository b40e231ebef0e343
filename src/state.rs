use std::sync::Arc;

use crate::config::AppConfig;
use crate::notify::Notifier;
use crate::scheduler::ReadySignal;
use crate::source::FilmSource;
use crate::store::{FollowStore, WatchStore};

/// Injected handles for everything the request path and the engines touch;
/// no ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub follows: Arc<dyn FollowStore>,
    pub watches: Arc<dyn WatchStore>,
    pub source: Arc<dyn FilmSource>,
    pub notifier: Arc<dyn Notifier>,
    /// Flipped when the delivery collaborator reports in; the periodic
    /// loops wait on it before their first run.
    pub ready: ReadySignal,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        follows: Arc<dyn FollowStore>,
        watches: Arc<dyn WatchStore>,
        source: Arc<dyn FilmSource>,
        notifier: Arc<dyn Notifier>,
        ready: ReadySignal,
    ) -> Self {
        Self {
            config: Arc::new(config),
            follows,
            watches,
            source,
            notifier,
            ready,
        }
    }
}
