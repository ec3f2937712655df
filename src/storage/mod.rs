//! Persisted state: subscriptions, playback positions, played episodes and
//! preferences, stored in SQLite.

mod playback;
mod preferences;
mod schema;
mod store;
mod subscriptions;
mod types;

pub use schema::Database;
pub use store::StateStore;
pub use types::StoreError;
