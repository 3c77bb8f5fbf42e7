//! Business logic services.
//!
//! The polling core: talking to GitHub, classifying and diffing results,
//! persisting state and raising alerts. Nothing here prints or knows about
//! the command line.

pub mod aggregator;
pub mod change_detector;
pub mod classifier;
pub mod cycle;
pub mod github_client;
pub mod notifications;
pub mod polling;
pub mod store;

pub use aggregator::{AggregateOptions, Aggregator};
pub use cycle::{CycleOutcome, CycleRunner};
pub use github_client::{GitHubClient, GitHubClientConfig};
pub use notifications::{AlertSink, Badge, LogAlertSink, Notification, RecordingAlertSink};
pub use polling::PollingService;
pub use store::{KeyValueStore, MemoryStore, StateStore, StorageKey};
