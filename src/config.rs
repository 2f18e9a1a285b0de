//! Credentials and endpoints, read from the environment

use std::env;
use tracing::{debug, warn};

pub const DEFAULT_OPENAI_API_KEY: &str = "your open api key";
pub const DEFAULT_AMADEUS_CLIENT_ID: &str = "your amadeus client id";
pub const DEFAULT_AMADEUS_CLIENT_SECRET: &str = "your amadeus client secret";
pub const DEFAULT_AMADEUS_BASE_URL: &str = "https://test.api.amadeus.com";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Runtime settings for the external services.
///
/// Missing credentials fall back to placeholders instead of failing; the first call
/// that needs them fails with an authentication error.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub amadeus_client_id: String,
    pub amadeus_client_secret: String,
    pub amadeus_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: DEFAULT_OPENAI_API_KEY.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            amadeus_client_id: DEFAULT_AMADEUS_CLIENT_ID.to_string(),
            amadeus_client_secret: DEFAULT_AMADEUS_CLIENT_SECRET.to_string(),
            amadeus_base_url: DEFAULT_AMADEUS_BASE_URL.to_string(),
        }
    }
}

impl Settings {
    /// Load a `.env` file if one exists, then read settings from the process environment.
    pub fn from_env() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
            Err(_) => debug!("No .env file found, using process environment only"),
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let settings = Self {
            openai_api_key: read("OPENAI_API_KEY", DEFAULT_OPENAI_API_KEY),
            openai_base_url: read("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            openai_model: read("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            amadeus_client_id: read("AMADEUS_CLIENT_ID", DEFAULT_AMADEUS_CLIENT_ID),
            amadeus_client_secret: read("AMADEUS_CLIENT_SECRET", DEFAULT_AMADEUS_CLIENT_SECRET),
            amadeus_base_url: read("AMADEUS_BASE_URL", DEFAULT_AMADEUS_BASE_URL),
        };

        for name in settings.placeholder_credentials() {
            warn!(variable = name, "Credential not set, using placeholder; dependent calls will fail to authenticate");
        }

        settings
    }

    /// Names of the credential variables still holding their placeholder value.
    pub fn placeholder_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.openai_api_key == DEFAULT_OPENAI_API_KEY {
            missing.push("OPENAI_API_KEY");
        }
        if self.amadeus_client_id == DEFAULT_AMADEUS_CLIENT_ID {
            missing.push("AMADEUS_CLIENT_ID");
        }
        if self.amadeus_client_secret == DEFAULT_AMADEUS_CLIENT_SECRET {
            missing.push("AMADEUS_CLIENT_SECRET");
        }
        missing
    }
}
