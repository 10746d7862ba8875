pub mod config;
pub mod logging;
pub mod time;

pub use config::Config;
pub use logging::{init_logging, init_logging_with};
pub use time::now_millis;
