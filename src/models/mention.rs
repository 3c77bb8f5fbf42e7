//! Mention model (issue/PR search hit).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::GitHubUser;

/// State of a mentioned issue or pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionState {
    Open,
    Closed,
}

impl From<&str> for MentionState {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "closed" => Self::Closed,
            _ => Self::Open,
        }
    }
}

impl std::fmt::Display for MentionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Link to the pull request when the search hit is a PR rather than an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestLink {
    pub html_url: Option<String>,
}

/// An issue or pull request in which the user's handle appears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub id: i64,

    #[serde(default)]
    pub number: Option<i64>,

    pub title: String,

    #[serde(default)]
    pub user: Option<GitHubUser>,

    /// `open` or `closed`, kept as the raw string GitHub returned.
    pub state: String,

    /// API URL of the repository, e.g. `https://api.github.com/repos/acme/api`.
    pub repository_url: String,

    pub html_url: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub pull_request: Option<PullRequestLink>,
}

impl Mention {
    /// Identity used for change detection.
    pub fn change_key(&self) -> String {
        self.id.to_string()
    }

    /// Parse the state string into an enum.
    pub fn state_enum(&self) -> MentionState {
        MentionState::from(self.state.as_str())
    }

    pub fn is_open(&self) -> bool {
        self.state_enum() == MentionState::Open
    }

    /// `owner/name` taken from the last two segments of `repository_url`.
    pub fn repository_name(&self) -> String {
        let mut segments = self
            .repository_url
            .trim_end_matches('/')
            .rsplit('/')
            .take(2)
            .collect::<Vec<_>>();
        segments.reverse();
        segments.join("/")
    }

    /// Where clicking the mention should lead: the PR page when available.
    pub fn target_url(&self) -> &str {
        self.pull_request
            .as_ref()
            .and_then(|pr| pr.html_url.as_deref())
            .unwrap_or(&self.html_url)
    }

    pub fn author_login(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }
}
