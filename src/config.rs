//! Client configuration

use crate::backend::Operation;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Where the backend lives and how long each call may take
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Origin of the backend, without a trailing `/`
    pub base_url: String,
    pub upload_timeout: Duration,
    pub chat_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            upload_timeout: Operation::Upload.default_timeout(),
            chat_timeout: Operation::Chat.default_timeout(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unparsable values fall
    /// back to the defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|s| *s > 0)
                .map_or(fallback, Duration::from_secs)
        };

        Self {
            base_url: lookup("DOCCHAT_API_URL")
                .filter(|url| !url.trim().is_empty())
                .map_or(defaults.base_url, |url| normalize_base_url(&url)),
            upload_timeout: secs("DOCCHAT_UPLOAD_TIMEOUT_SECS", defaults.upload_timeout),
            chat_timeout: secs("DOCCHAT_CHAT_TIMEOUT_SECS", defaults.chat_timeout),
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.base_url = normalize_base_url(base_url.as_ref());
        self
    }

    #[allow(dead_code)] // Used in tests
    pub fn with_timeouts(mut self, upload: Duration, chat: Duration) -> Self {
        self.upload_timeout = upload;
        self.chat_timeout = chat;
        self
    }

    /// Bound applied to an outbound call
    pub fn timeout_for(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Upload => self.upload_timeout,
            Operation::Chat => self.chat_timeout,
            Operation::Health => operation.default_timeout(),
        }
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
