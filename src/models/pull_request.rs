//! Pull request model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::{GitHubUser, Team};

/// Repository reference nested in `base`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    /// `owner/name`.
    pub full_name: String,
}

/// Base branch of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseRef {
    pub repo: RepoRef,
}

/// Head commit of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadRef {
    pub sha: String,
}

/// An open pull request as listed by `GET /repos/{owner}/{repo}/pulls`.
///
/// `requested_reviewers` and `requested_teams` are optional upstream; a
/// missing or `null` list is read as empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    /// GitHub PR ID (global).
    pub id: i64,

    /// Repository-scoped PR number.
    pub number: i64,

    pub title: String,

    /// Author. `None` for deleted ("ghost") accounts.
    #[serde(default)]
    pub user: Option<GitHubUser>,

    pub base: BaseRef,

    pub head: HeadRef,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// URL to the PR in the GitHub web UI.
    pub html_url: String,

    #[serde(default)]
    pub draft: bool,

    #[serde(default)]
    pub requested_reviewers: Option<Vec<GitHubUser>>,

    #[serde(default)]
    pub requested_teams: Option<Vec<Team>>,
}

impl PullRequest {
    /// Identity used for change detection: the head commit hash.
    pub fn change_key(&self) -> &str {
        &self.head.sha
    }

    /// `owner/name` of the base repository.
    pub fn repository_name(&self) -> &str {
        &self.base.repo.full_name
    }

    /// Author login, if the account still exists.
    pub fn author_login(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }

    /// Individually requested reviewers (empty when absent).
    pub fn requested_reviewers(&self) -> &[GitHubUser] {
        self.requested_reviewers.as_deref().unwrap_or_default()
    }

    /// Requested teams (empty when absent).
    pub fn requested_teams(&self) -> &[Team] {
        self.requested_teams.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "id": 1001,
            "number": 42,
            "title": "Add rate limiter",
            "user": { "login": "octocat", "id": 1 },
            "base": { "ref": "main", "repo": { "full_name": "acme/api", "private": true } },
            "head": { "ref": "feature", "sha": "abc123" },
            "created_at": "2024-01-15T10:30:00Z",
            "updated_at": "2024-01-16T08:00:00Z",
            "html_url": "https://github.com/acme/api/pull/42",
            "requested_reviewers": [{ "login": "alice", "id": 2 }],
            "requested_teams": [{ "id": 9, "slug": "core" }]
        })
    }

    #[test]
    fn test_deserialize_full_record() {
        let pr: PullRequest = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(pr.change_key(), "abc123");
        assert_eq!(pr.repository_name(), "acme/api");
        assert_eq!(pr.author_login(), Some("octocat"));
        assert_eq!(pr.requested_reviewers().len(), 1);
        assert_eq!(pr.requested_teams()[0].id, 9);
        assert!(!pr.draft);
    }

    #[test]
    fn test_missing_and_null_lists_read_as_empty() {
        let mut json = sample_json();
        let obj = json.as_object_mut().unwrap();
        obj.remove("requested_reviewers");
        obj.insert("requested_teams".into(), serde_json::Value::Null);
        obj.insert("user".into(), serde_json::Value::Null);

        let pr: PullRequest = serde_json::from_value(json).unwrap();
        assert!(pr.requested_reviewers().is_empty());
        assert!(pr.requested_teams().is_empty());
        assert_eq!(pr.author_login(), None);
    }

    #[test]
    fn test_missing_head_is_rejected() {
        let mut json = sample_json();
        json.as_object_mut().unwrap().remove("head");
        assert!(serde_json::from_value::<PullRequest>(json).is_err());
    }
}
