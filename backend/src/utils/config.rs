use anyhow::Result;
use std::env;
use crate::constants::{DEFAULT_PUSH_API_URL, DEFAULT_SERVER_PORT, DEFAULT_SWEEP_INTERVAL_SECS};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub push_enabled: bool,
    pub push_api_url: String,
    pub push_access_token: Option<String>,
    pub sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            push_enabled: false,
            push_api_url: DEFAULT_PUSH_API_URL.to_string(),
            push_access_token: None,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present
        
        let push_enabled = match env::var("PUSH_ENABLED") {
            Ok(value) => parse_bool(&value)
                .ok_or_else(|| anyhow::anyhow!("PUSH_ENABLED must be true or false, got '{}'", value))?,
            Err(_) => false,
        };

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_SERVER_PORT.to_string())
                .parse()
                .unwrap_or(DEFAULT_SERVER_PORT),
            push_enabled,
            push_api_url: non_empty_var("PUSH_API_URL")
                .unwrap_or_else(|| DEFAULT_PUSH_API_URL.to_string()),
            push_access_token: non_empty_var("PUSH_ACCESS_TOKEN"),
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
