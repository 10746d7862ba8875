pub mod constants;
pub mod dating;
pub mod db;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
pub mod votes;

pub use utils::config::Config;
pub use db::connection::get_db_pool;
pub use state::AppState;
pub use store::{MemoryStore, RemoteStore};

// Re-export common types
pub use anyhow::Result;
