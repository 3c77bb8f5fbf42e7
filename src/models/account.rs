//! Organizations, repositories, teams and users.
//!
//! These are traversal keys only; nothing here outlives a single cycle.

use serde::{Deserialize, Serialize};

/// A GitHub user as embedded in other records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

/// Organization the authenticated user belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct Organization {
    pub login: String,
    pub id: Option<i64>,
}

/// Repository listed under an organization or owned by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,

    /// `owner/name`.
    pub full_name: String,
}

/// Team, either from the user's memberships or a PR's requested teams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
