pub mod connection;
pub mod migrations;
pub mod kv;

pub use connection::{get_db_pool, DatabaseConfig};
pub use kv::PgStore;
