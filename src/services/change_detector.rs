//! Detection of entries that are new since the previous cycle.
//!
//! Two policies exist; exactly one is active per user (see `ChangePolicy`):
//! - `HeadCommit`: an entry is new when its key (head commit hash for pull
//!   requests, id for mentions) is absent from the same category of the
//!   previous snapshot. A push to an already-seen PR changes its head and
//!   flags it again; a title edit does not.
//! - `UpdatedSinceViewed`: an entry is new when its `updated_at` is strictly
//!   after the last time the user viewed the list. Any upstream edit
//!   re-flags the entry.

use crate::models::{Category, ChangePolicy, Snapshot};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Compute the per-category subset of `current` considered new.
///
/// The result keeps `current`'s ordering. Its `total()` drives the badge
/// count and whether a notification fires.
pub fn detect(
    previous: &Snapshot,
    current: &Snapshot,
    policy: ChangePolicy,
    last_viewed: Option<DateTime<Utc>>,
) -> Snapshot {
    match policy {
        ChangePolicy::HeadCommit => detect_by_key(previous, current),
        ChangePolicy::UpdatedSinceViewed => detect_by_time(current, last_viewed),
    }
}

/// Whether `current` must be written over `previous`.
///
/// Under `HeadCommit` only the change keys matter. Under `UpdatedSinceViewed`
/// any difference counts, so the stored entries carry the `updated_at` that
/// was alerted on.
pub fn should_replace(previous: &Snapshot, current: &Snapshot, policy: ChangePolicy) -> bool {
    match policy {
        ChangePolicy::HeadCommit => !previous.same_keys(current),
        ChangePolicy::UpdatedSinceViewed => previous != current,
    }
}

fn detect_by_key(previous: &Snapshot, current: &Snapshot) -> Snapshot {
    let seen = |category: Category| -> HashSet<String> {
        previous.change_keys(category).into_iter().collect()
    };

    let personal_seen = seen(Category::Personal);
    let team_seen = seen(Category::Team);
    let mine_seen = seen(Category::Mine);
    let mentions_seen = seen(Category::Mentions);

    Snapshot {
        personal: current
            .personal
            .iter()
            .filter(|pr| !personal_seen.contains(pr.change_key()))
            .cloned()
            .collect(),
        team: current
            .team
            .iter()
            .filter(|pr| !team_seen.contains(pr.change_key()))
            .cloned()
            .collect(),
        mine: current
            .mine
            .iter()
            .filter(|pr| !mine_seen.contains(pr.change_key()))
            .cloned()
            .collect(),
        mentions: current
            .mentions
            .iter()
            .filter(|m| !mentions_seen.contains(&m.change_key()))
            .cloned()
            .collect(),
    }
}

fn detect_by_time(current: &Snapshot, last_viewed: Option<DateTime<Utc>>) -> Snapshot {
    let Some(viewed) = last_viewed else {
        // Never viewed: everything is new.
        return current.clone();
    };

    Snapshot {
        personal: current
            .personal
            .iter()
            .filter(|pr| pr.updated_at > viewed)
            .cloned()
            .collect(),
        team: current
            .team
            .iter()
            .filter(|pr| pr.updated_at > viewed)
            .cloned()
            .collect(),
        mine: current
            .mine
            .iter()
            .filter(|pr| pr.updated_at > viewed)
            .cloned()
            .collect(),
        mentions: current
            .mentions
            .iter()
            .filter(|m| m.updated_at > viewed)
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BaseRef, HeadRef, Mention, PullRequest, RepoRef};
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn pr(sha: &str, updated_hour: u32) -> PullRequest {
        PullRequest {
            id: 1,
            number: 1,
            title: sha.to_uppercase(),
            user: None,
            base: BaseRef {
                repo: RepoRef {
                    full_name: "acme/api".into(),
                },
            },
            head: HeadRef { sha: sha.into() },
            created_at: at(0),
            updated_at: at(updated_hour),
            html_url: String::new(),
            draft: false,
            requested_reviewers: None,
            requested_teams: None,
        }
    }

    fn mention(id: i64, updated_hour: u32) -> Mention {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": "t",
            "state": "open",
            "repository_url": "https://api.github.com/repos/acme/api",
            "html_url": "https://github.com/acme/api/issues/1",
            "created_at": at(0),
            "updated_at": at(updated_hour)
        }))
        .unwrap()
    }

    fn shas(prs: &[PullRequest]) -> Vec<&str> {
        prs.iter().map(|pr| pr.change_key()).collect()
    }

    #[test]
    fn test_head_commit_diff() {
        let previous = Snapshot {
            personal: vec![pr("a", 1), pr("b", 1)],
            ..Default::default()
        };
        let current = Snapshot {
            personal: vec![pr("b", 1), pr("c", 1)],
            ..Default::default()
        };

        let new = detect(&previous, &current, ChangePolicy::HeadCommit, None);
        assert_eq!(shas(&new.personal), vec!["c"]);
        assert_eq!(new.total(), 1);
    }

    #[test]
    fn test_head_commit_is_idempotent() {
        let snapshot = Snapshot {
            personal: vec![pr("a", 1)],
            team: vec![pr("b", 1)],
            mine: vec![pr("c", 1)],
            mentions: vec![mention(9, 1)],
        };
        let new = detect(&snapshot, &snapshot.clone(), ChangePolicy::HeadCommit, None);
        assert!(new.is_empty());
    }

    #[test]
    fn test_head_commit_compares_within_category() {
        let previous = Snapshot {
            mine: vec![pr("a", 1)],
            ..Default::default()
        };
        let current = Snapshot {
            team: vec![pr("a", 1)],
            mine: vec![pr("a", 1)],
            ..Default::default()
        };

        let new = detect(&previous, &current, ChangePolicy::HeadCommit, None);
        assert_eq!(shas(&new.team), vec!["a"]);
        assert!(new.mine.is_empty());
    }

    #[test]
    fn test_head_commit_ignores_updates_to_seen_pr() {
        let previous = Snapshot {
            personal: vec![pr("a", 1)],
            ..Default::default()
        };
        let current = Snapshot {
            personal: vec![pr("a", 5)],
            ..Default::default()
        };
        assert!(detect(&previous, &current, ChangePolicy::HeadCommit, None).is_empty());
    }

    #[test]
    fn test_head_commit_mentions_by_id() {
        let previous = Snapshot {
            mentions: vec![mention(1, 1)],
            ..Default::default()
        };
        let current = Snapshot {
            mentions: vec![mention(1, 3), mention(2, 3)],
            ..Default::default()
        };
        let new = detect(&previous, &current, ChangePolicy::HeadCommit, None);
        assert_eq!(new.mentions.iter().map(|m| m.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_first_cycle_everything_is_new() {
        let current = Snapshot {
            personal: vec![pr("a", 1), pr("b", 2)],
            ..Default::default()
        };
        let new = detect(&Snapshot::default(), &current, ChangePolicy::HeadCommit, None);
        assert_eq!(new, current);
    }

    #[test]
    fn test_updated_since_viewed_is_strict() {
        let current = Snapshot {
            personal: vec![pr("a", 2), pr("b", 3), pr("c", 4)],
            mentions: vec![mention(1, 2), mention(2, 5)],
            ..Default::default()
        };

        let new = detect(
            &Snapshot::default(),
            &current,
            ChangePolicy::UpdatedSinceViewed,
            Some(at(3)),
        );
        assert_eq!(shas(&new.personal), vec!["c"]);
        assert_eq!(new.mentions.iter().map(|m| m.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_head_commit_keeps_snapshot_on_metadata_edit() {
        let previous = Snapshot {
            personal: vec![pr("a", 1)],
            ..Default::default()
        };
        let edited = Snapshot {
            personal: vec![pr("a", 5)],
            ..Default::default()
        };
        assert!(!should_replace(&previous, &edited, ChangePolicy::HeadCommit));

        let pushed = Snapshot {
            personal: vec![pr("b", 5)],
            ..Default::default()
        };
        assert!(should_replace(&previous, &pushed, ChangePolicy::HeadCommit));
    }

    #[test]
    fn test_updated_since_viewed_replaces_on_update() {
        let previous = Snapshot {
            personal: vec![pr("a", 1)],
            ..Default::default()
        };
        let updated = Snapshot {
            personal: vec![pr("a", 5)],
            ..Default::default()
        };
        let policy = ChangePolicy::UpdatedSinceViewed;

        assert!(should_replace(&previous, &updated, policy));
        assert!(!should_replace(&updated, &updated.clone(), policy));
    }

    #[test]
    fn test_updated_since_viewed_without_view_time() {
        let current = Snapshot {
            team: vec![pr("a", 2)],
            ..Default::default()
        };
        let new = detect(&current, &current, ChangePolicy::UpdatedSinceViewed, None);
        assert_eq!(new.total(), 1);
    }
}
