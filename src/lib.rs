pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod query;
pub mod reconcile;
pub mod routes;
pub mod scheduler;
pub mod schema;
pub mod source;
pub mod state;
pub mod store;
pub mod sync;

pub use reconcile::WatchReconciler;
pub use scheduler::{ReadySignal, Scheduler};
pub use sync::DiarySyncEngine;
