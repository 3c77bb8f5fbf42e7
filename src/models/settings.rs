//! User settings and credentials.
//!
//! Supplied once via `gitping login`, persisted under a single store key and
//! read at the start of every cycle.

use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AppError;

/// Public GitHub API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Default polling interval in minutes.
pub const DEFAULT_POLLING_INTERVAL_MINUTES: u64 = 1;

/// Longest accepted polling interval: one day.
pub const MAX_POLLING_INTERVAL_MINUTES: u64 = 24 * 60;

/// Default look-back window for the mentions search, in days.
pub const DEFAULT_MENTION_WINDOW_DAYS: u32 = 30;

/// What counts as "new" when comparing two snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangePolicy {
    /// New when the head commit (or mention id) was not in the previous snapshot.
    #[default]
    HeadCommit,

    /// New when `updated_at` is after the last time the user viewed the list.
    UpdatedSinceViewed,
}

impl std::fmt::Display for ChangePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HeadCommit => write!(f, "head_commit"),
            Self::UpdatedSinceViewed => write!(f, "updated_since_viewed"),
        }
    }
}

/// Persisted settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// GitHub login of the user we poll for.
    pub username: String,

    /// Personal access token, sent as a bearer token.
    pub token: String,

    /// Custom API base URL (GitHub Enterprise). `None` means api.github.com.
    #[serde(default)]
    pub api_base_url: Option<String>,

    #[serde(default = "default_interval")]
    pub polling_interval_minutes: u64,

    #[serde(default = "default_mention_window")]
    pub mention_window_days: u32,

    #[serde(default)]
    pub change_policy: ChangePolicy,
}

fn default_interval() -> u64 {
    DEFAULT_POLLING_INTERVAL_MINUTES
}

fn default_mention_window() -> u32 {
    DEFAULT_MENTION_WINDOW_DAYS
}

// Hand-written so the token never reaches a log line.
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("polling_interval_minutes", &self.polling_interval_minutes)
            .field("mention_window_days", &self.mention_window_days)
            .field("change_policy", &self.change_policy)
            .finish()
    }
}

impl Settings {
    /// Settings with defaults for everything but the credentials.
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
            api_base_url: None,
            polling_interval_minutes: DEFAULT_POLLING_INTERVAL_MINUTES,
            mention_window_days: DEFAULT_MENTION_WINDOW_DAYS,
            change_policy: ChangePolicy::default(),
        }
    }

    /// Reject settings a cycle cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.username.trim().is_empty() {
            return Err(AppError::authentication("GitHub username is not set"));
        }
        if self.token.trim().is_empty() {
            return Err(AppError::authentication("GitHub token is not set"));
        }
        polling_interval_from_minutes(self.polling_interval_minutes)?;
        Ok(())
    }

    /// Effective API base URL without a trailing slash.
    pub fn api_base_url(&self) -> String {
        self.api_base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }

    /// Web UI base derived from the API base.
    ///
    /// `https://api.github.com` maps to `https://github.com`; an Enterprise
    /// base such as `https://ghe.example.com/api/v3` maps to its host root.
    pub fn web_base_url(&self) -> String {
        web_base_for(&self.api_base_url())
    }

    /// Polling period, clamped into the accepted range.
    pub fn polling_interval(&self) -> Duration {
        let minutes = self
            .polling_interval_minutes
            .clamp(1, MAX_POLLING_INTERVAL_MINUTES);
        Duration::from_secs(minutes * 60)
    }

    pub fn mention_window(&self) -> ChronoDuration {
        ChronoDuration::days(i64::from(self.mention_window_days))
    }
}

/// Convert a user-supplied interval, rejecting zero and anything above
/// `MAX_POLLING_INTERVAL_MINUTES`.
pub fn polling_interval_from_minutes(minutes: u64) -> Result<Duration, AppError> {
    if !(1..=MAX_POLLING_INTERVAL_MINUTES).contains(&minutes) {
        return Err(AppError::invalid_input_field(
            format!(
                "Polling interval must be between 1 and {} minutes",
                MAX_POLLING_INTERVAL_MINUTES
            ),
            "polling_interval_minutes",
        ));
    }
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            AppError::invalid_input_field("Polling interval is too large", "polling_interval_minutes")
        })
}

fn web_base_for(api_base: &str) -> String {
    if let Some(rest) = api_base.strip_prefix("https://api.") {
        return format!("https://{}", rest);
    }
    if let Some(rest) = api_base.strip_prefix("http://api.") {
        return format!("http://{}", rest);
    }
    api_base
        .strip_suffix("/api/v3")
        .unwrap_or(api_base)
        .to_string()
}
