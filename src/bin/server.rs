use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use boxdbot::config::AppConfig;
use boxdbot::db;
use boxdbot::notify::WebhookNotifier;
use boxdbot::routes;
use boxdbot::source::HttpFilmSource;
use boxdbot::state::AppState;
use boxdbot::store::PgStore;
use boxdbot::{DiarySyncEngine, ReadySignal, Scheduler, WatchReconciler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        database_url = %config.redacted_database_url(),
        source_base_url = %config.source_base_url,
        diary_sync_interval_secs = config.diary_sync_interval.as_secs(),
        watch_reconcile_interval_secs = config.watch_reconcile_interval.as_secs(),
        "loaded configuration"
    );

    let pool = db::init_pool(&config.database_url, config.database_max_pool_size)?;
    db::run_migrations(&pool)?;

    let store = Arc::new(PgStore::new(pool));
    let source = Arc::new(HttpFilmSource::new(config.source_base_url.clone())?);
    let notifier = Arc::new(WebhookNotifier::new(config.delivery_webhook_url.clone())?);

    let ready = ReadySignal::new();
    let state = AppState::new(
        config.clone(),
        store.clone(),
        store.clone(),
        source.clone(),
        notifier.clone(),
        ready.clone(),
    );

    let sync_engine = Arc::new(DiarySyncEngine::new(
        store.clone(),
        source.clone(),
        notifier.clone(),
    ));
    let reconciler = Arc::new(WatchReconciler::new(store.clone(), store.clone(), source));

    let mut scheduler = Scheduler::new(ready);
    scheduler.spawn("diary-sync", config.diary_sync_interval, move || {
        let engine = sync_engine.clone();
        async move {
            engine.run_once().await?;
            Ok(())
        }
    });
    scheduler.spawn(
        "watch-reconcile",
        config.watch_reconcile_interval,
        move || {
            let reconciler = reconciler.clone();
            async move {
                reconciler.run_once().await?;
                Ok(())
            }
        },
    );

    let app = routes::create_router(state);
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
            scheduler.shutdown();
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
