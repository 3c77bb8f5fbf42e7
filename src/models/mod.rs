//! Data models for the application.
//!
//! Record shapes decoded from the GitHub REST API, plus the locally persisted
//! snapshot and settings. Optional upstream fields are made explicit here so
//! the rest of the crate never has to guess what a payload contains.

pub mod account;
pub mod mention;
pub mod pull_request;
pub mod settings;
pub mod snapshot;

// Re-exports for convenient access
pub use account::{GitHubUser, Organization, Repository, Team};
pub use mention::{Mention, MentionState};
pub use pull_request::{BaseRef, HeadRef, PullRequest, RepoRef};
pub use settings::{
    ChangePolicy, Settings, DEFAULT_API_BASE_URL, DEFAULT_MENTION_WINDOW_DAYS,
    DEFAULT_POLLING_INTERVAL_MINUTES,
};
pub use snapshot::{Category, Snapshot};
