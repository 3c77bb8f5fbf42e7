//! Aggregation of relevant pull requests across the org/repo hierarchy.
//!
//! One call to `Aggregator::aggregate` walks:
//! - the user's organizations, then every repository of each
//! - the repositories the user owns outside any organization
//! - the user's team memberships (once, before classification)
//! - a single mentions search
//!
//! All calls are issued one after another. The first failure aborts the
//! walk and the partially built snapshot is dropped.

use crate::error::AppError;
use crate::models::{PullRequest, Repository, Snapshot, Team};
use crate::services::classifier;
use crate::services::github_client::GitHubClient;
use chrono::{DateTime, Utc};

/// Options narrowing an aggregation.
#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    /// Only mentions updated at or after this time are searched for.
    ///
    /// Pull requests are always fetched in full; GitHub offers no
    /// incremental listing for them.
    pub since: Option<DateTime<Utc>>,
}

/// Counters collected during one aggregation, for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct AggregateStats {
    pub organizations: usize,
    pub repositories: usize,
    pub pull_requests_scanned: usize,
    pub teams: usize,
}

/// Walks GitHub and classifies what it finds into a `Snapshot`.
pub struct Aggregator<'a> {
    client: &'a GitHubClient,
}

impl<'a> Aggregator<'a> {
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Run a full aggregation for `username`.
    pub async fn aggregate(
        &self,
        username: &str,
        options: &AggregateOptions,
    ) -> Result<Snapshot, AppError> {
        let (snapshot, stats) = self.aggregate_with_stats(username, options).await?;
        log::info!(
            "Aggregated {} org(s), {} repo(s), {} open PR(s): personal={} team={} mine={} mentions={}",
            stats.organizations,
            stats.repositories,
            stats.pull_requests_scanned,
            snapshot.personal.len(),
            snapshot.team.len(),
            snapshot.mine.len(),
            snapshot.mentions.len()
        );
        Ok(snapshot)
    }

    /// Like `aggregate`, also returning traversal counters.
    async fn aggregate_with_stats(
        &self,
        username: &str,
        options: &AggregateOptions,
    ) -> Result<(Snapshot, AggregateStats), AppError> {
        let mut snapshot = Snapshot::default();
        let mut stats = AggregateStats::default();

        let organizations = self.client.list_organizations().await?;
        stats.organizations = organizations.len();

        let teams = self.client.list_teams().await?;
        stats.teams = teams.len();
        log::debug!(
            "{} belongs to {} org(s) and {} team(s)",
            username,
            organizations.len(),
            teams.len()
        );

        for org in &organizations {
            let repos = self.client.list_org_repositories(&org.login).await?;
            log::debug!("Org {}: {} repo(s)", org.login, repos.len());
            self.collect_repositories(&repos, username, &teams, &mut snapshot, &mut stats)
                .await?;
        }

        let owned = self.client.list_owned_repositories().await?;
        log::debug!("{} owns {} repo(s)", username, owned.len());
        self.collect_repositories(&owned, username, &teams, &mut snapshot, &mut stats)
            .await?;

        let mentions = self.client.search_mentions(username, options.since).await?;
        snapshot.mentions = classifier::open_mentions(mentions);

        Ok((snapshot, stats))
    }

    /// Fetch open PRs of each repository and classify them into `snapshot`.
    async fn collect_repositories(
        &self,
        repos: &[Repository],
        username: &str,
        teams: &[Team],
        snapshot: &mut Snapshot,
        stats: &mut AggregateStats,
    ) -> Result<(), AppError> {
        for repo in repos {
            let prs = self.client.list_open_pull_requests(&repo.full_name).await?;
            stats.repositories += 1;
            stats.pull_requests_scanned += prs.len();
            if !prs.is_empty() {
                log::debug!("{}: {} open PR(s)", repo.full_name, prs.len());
            }
            classify_into(snapshot, &prs, username, teams);
        }
        Ok(())
    }
}

/// Apply every pull request rule to one page of results.
fn classify_into(snapshot: &mut Snapshot, prs: &[PullRequest], username: &str, teams: &[Team]) {
    snapshot
        .personal
        .extend(classifier::by_reviewer(prs, username));
    snapshot.team.extend(classifier::by_team(prs, teams));
    snapshot.mine.extend(classifier::by_author(prs, username));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BaseRef, GitHubUser, HeadRef, RepoRef};
    use chrono::TimeZone;

    fn pr(id: i64, author: &str, reviewer: Option<&str>, team: Option<i64>) -> PullRequest {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        PullRequest {
            id,
            number: id,
            title: format!("PR {}", id),
            user: Some(GitHubUser {
                login: author.into(),
                id: None,
            }),
            base: BaseRef {
                repo: RepoRef {
                    full_name: "acme/api".into(),
                },
            },
            head: HeadRef {
                sha: format!("sha{}", id),
            },
            created_at: ts,
            updated_at: ts,
            html_url: String::new(),
            draft: false,
            requested_reviewers: reviewer.map(|login| {
                vec![GitHubUser {
                    login: login.into(),
                    id: None,
                }]
            }),
            requested_teams: team.map(|id| {
                vec![Team {
                    id,
                    slug: None,
                    name: None,
                }]
            }),
        }
    }

    #[test]
    fn test_classify_into_accumulates_across_calls() {
        let teams = vec![Team {
            id: 5,
            slug: None,
            name: None,
        }];
        let mut snapshot = Snapshot::default();

        classify_into(
            &mut snapshot,
            &[pr(1, "bob", Some("alice"), None)],
            "alice",
            &teams,
        );
        classify_into(
            &mut snapshot,
            &[pr(2, "alice", None, Some(5)), pr(3, "carol", None, None)],
            "alice",
            &teams,
        );

        assert_eq!(snapshot.personal.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(snapshot.team.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(snapshot.mine.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2]);
        assert!(snapshot.mentions.is_empty());
    }
}
