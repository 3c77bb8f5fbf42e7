//! Per-category result set of one aggregation cycle.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::mention::Mention;
use super::pull_request::PullRequest;

/// Relevance bucket a pull request or mention is sorted into.
///
/// Buckets are independent: one pull request may sit in several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// The user is a requested reviewer.
    Personal,

    /// One of the user's teams is a requested reviewer.
    Team,

    /// Authored by the user.
    Mine,

    /// The user's handle appears in an open issue or PR.
    Mentions,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 4] = [
        Category::Personal,
        Category::Team,
        Category::Mine,
        Category::Mentions,
    ];

    /// Key under which this category's list is persisted.
    pub fn storage_key(&self) -> &'static str {
        match self {
            Self::Personal => "personalPullRequests",
            Self::Team => "teamPullRequests",
            Self::Mine => "myPullRequests",
            Self::Mentions => "mentions",
        }
    }

    /// Human-readable tab label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Personal => "Review requested",
            Self::Team => "Team review requested",
            Self::Mine => "My pull requests",
            Self::Mentions => "Mentions",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Personal => write!(f, "personal"),
            Self::Team => write!(f, "team"),
            Self::Mine => write!(f, "mine"),
            Self::Mentions => write!(f, "mentions"),
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "personal" | "review" => Ok(Self::Personal),
            "team" => Ok(Self::Team),
            "mine" | "authored" => Ok(Self::Mine),
            "mentions" | "mention" => Ok(Self::Mentions),
            other => Err(format!(
                "unknown category '{}' (expected personal, team, mine or mentions)",
                other
            )),
        }
    }
}

/// Mapping from category to the ordered items observed in one cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub personal: Vec<PullRequest>,
    pub team: Vec<PullRequest>,
    pub mine: Vec<PullRequest>,
    pub mentions: Vec<Mention>,
}

impl Snapshot {
    /// Pull requests of a category. Mentions have none.
    pub fn pull_requests(&self, category: Category) -> &[PullRequest] {
        match category {
            Category::Personal => &self.personal,
            Category::Team => &self.team,
            Category::Mine => &self.mine,
            Category::Mentions => &[],
        }
    }

    /// Number of entries in a category.
    pub fn len(&self, category: Category) -> usize {
        match category {
            Category::Mentions => self.mentions.len(),
            other => self.pull_requests(other).len(),
        }
    }

    /// Entries across all categories (an item in two buckets counts twice).
    pub fn total(&self) -> usize {
        Category::ALL.iter().map(|c| self.len(*c)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Change keys of a category, in snapshot order.
    pub fn change_keys(&self, category: Category) -> Vec<String> {
        match category {
            Category::Mentions => self.mentions.iter().map(Mention::change_key).collect(),
            other => self
                .pull_requests(other)
                .iter()
                .map(|pr| pr.change_key().to_string())
                .collect(),
        }
    }

    /// Whether both snapshots hold the same keys in every category.
    ///
    /// Order is ignored; this decides whether a fresh snapshot replaces the
    /// stored one or is discarded.
    pub fn same_keys(&self, other: &Snapshot) -> bool {
        Category::ALL.iter().all(|category| {
            let mut ours = self.change_keys(*category);
            let mut theirs = other.change_keys(*category);
            ours.sort_unstable();
            theirs.sort_unstable();
            ours == theirs
        })
    }
}
