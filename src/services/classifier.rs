//! Relevance classification of pull requests and mentions.
//!
//! Pure functions: no I/O, no state. Each rule is applied independently, so
//! a pull request that satisfies several rules lands in several categories.

use crate::models::{Mention, PullRequest, Team};

/// Pull requests where `username` is an individually requested reviewer.
pub fn by_reviewer(prs: &[PullRequest], username: &str) -> Vec<PullRequest> {
    prs.iter()
        .filter(|pr| {
            pr.requested_reviewers()
                .iter()
                .any(|reviewer| reviewer.login == username)
        })
        .cloned()
        .collect()
}

/// Pull requests where any requested team is one of `teams`.
pub fn by_team(prs: &[PullRequest], teams: &[Team]) -> Vec<PullRequest> {
    if teams.is_empty() {
        return Vec::new();
    }
    prs.iter()
        .filter(|pr| {
            pr.requested_teams()
                .iter()
                .any(|requested| teams.iter().any(|team| team.id == requested.id))
        })
        .cloned()
        .collect()
}

/// Pull requests authored by `username`.
pub fn by_author(prs: &[PullRequest], username: &str) -> Vec<PullRequest> {
    prs.iter()
        .filter(|pr| pr.author_login() == Some(username))
        .cloned()
        .collect()
}

/// Mentions that are still open.
pub fn open_mentions(mentions: Vec<Mention>) -> Vec<Mention> {
    mentions.into_iter().filter(Mention::is_open).collect()
}
