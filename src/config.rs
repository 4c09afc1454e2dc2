use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::{DEFAULT_API_URL, DEFAULT_TIMEOUT};
use crate::return_handler::DEFAULT_COUNTDOWN_SECS;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub access_token: Option<String>,
    pub timeout: Duration,
    pub session_dir: PathBuf,
    pub countdown_secs: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let timeout = env::var("API_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        let countdown_secs = env::var("REDIRECT_COUNTDOWN_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_COUNTDOWN_SECS);

        Self {
            api_url: env::var("API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            access_token: env::var("API_ACCESS_TOKEN").ok().filter(|t| !t.is_empty()),
            timeout,
            session_dir: env::var("SESSION_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            countdown_secs,
        }
    }
}
