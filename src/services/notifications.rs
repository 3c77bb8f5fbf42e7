//! Badge and notification side effects.
//!
//! The cycle reports what the user should see through an `AlertSink`. The
//! CLI wires in `LogAlertSink`; tests use `RecordingAlertSink`.

use crate::models::Settings;
use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

/// Title shown on every new-items notification.
pub const NOTIFICATION_TITLE: &str = "GitPing | Notice";

/// Badge state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "count", rename_all = "snake_case")]
pub enum Badge {
    /// Number of new items.
    Count(usize),
    /// Nothing to show.
    Clear,
    /// Credentials need attention.
    Error,
}

impl Badge {
    /// Badge for a new-item total; zero clears it.
    pub fn for_total(total: usize) -> Self {
        if total == 0 {
            Self::Clear
        } else {
            Self::Count(total)
        }
    }

    pub fn text(&self) -> String {
        match self {
            Self::Count(n) => n.to_string(),
            Self::Clear => String::new(),
            Self::Error => "?".to_string(),
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

/// One-shot alert about new items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    /// Page the user lands on when acting on the alert.
    pub target_url: String,
}

impl Notification {
    pub fn for_new_items(total: usize, settings: &Settings) -> Self {
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            message: format!("You have {} new pull requests to review!", total),
            target_url: review_requested_url(settings),
        }
    }
}

/// The hosting platform's "review requested" listing for the user.
pub fn review_requested_url(settings: &Settings) -> String {
    let query = format!(
        "is:open is:pr review-requested:{} archived:false",
        settings.username
    );
    format!(
        "{}/pulls/review-requested?page=1&q={}",
        settings.web_base_url(),
        urlencoding::encode(&query).replace("%20", "+")
    )
}

/// Port for user-visible alert primitives.
pub trait AlertSink: Send + Sync {
    fn set_badge(&self, badge: Badge);

    fn notify(&self, notification: &Notification);
}

/// Writes alerts to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn set_badge(&self, badge: Badge) {
        match badge {
            Badge::Clear => log::debug!("Badge cleared"),
            other => log::info!("Badge: {}", other),
        }
    }

    fn notify(&self, notification: &Notification) {
        log::info!(
            "{}: {} ({})",
            notification.title,
            notification.message,
            notification.target_url
        );
    }
}

/// Keeps every alert in memory.
#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    badges: Mutex<Vec<Badge>>,
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn badges(&self) -> Vec<Badge> {
        self.badges
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }

    pub fn last_badge(&self) -> Option<Badge> {
        self.badges().last().copied()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }
}

impl AlertSink for RecordingAlertSink {
    fn set_badge(&self, badge: Badge) {
        if let Ok(mut badges) = self.badges.lock() {
            badges.push(badge);
        }
    }

    fn notify(&self, notification: &Notification) {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push(notification.clone());
        }
    }
}
