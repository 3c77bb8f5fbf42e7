//! One polling cycle: fetch, classify, diff, persist, alert.
//!
//! A cycle never leaves the store half-updated. On success one write
//! replaces the snapshot (unless the change policy keeps it), stamps the
//! update time and clears the last error. On failure only the last error
//! and the badge change.

use crate::error::AppError;
use crate::models::{Category, Settings, Snapshot};
use crate::services::aggregator::{AggregateOptions, Aggregator};
use crate::services::change_detector;
use crate::services::github_client::{GitHubClient, GitHubClientConfig};
use crate::services::notifications::{AlertSink, Badge, Notification};
use crate::services::store::StateStore;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Result of a successful cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    /// Entries considered new, per category.
    pub new_items: Snapshot,

    /// Whether the stored snapshot was replaced.
    pub snapshot_replaced: bool,

    /// Size of each category in the fetched snapshot.
    pub totals: Vec<(Category, usize)>,

    /// Wall time of the cycle in milliseconds.
    pub duration_ms: u64,
}

impl CycleOutcome {
    pub fn new_total(&self) -> usize {
        self.new_items.total()
    }
}

/// Runs cycles against a store and an alert sink.
#[derive(Clone)]
pub struct CycleRunner {
    store: StateStore,
    alerts: Arc<dyn AlertSink>,
    timeout_secs: u64,
}

impl CycleRunner {
    pub fn new(store: StateStore, alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            store,
            alerts,
            timeout_secs: GitHubClientConfig::default().timeout_secs,
        }
    }

    /// Override the per-request HTTP timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run one cycle and apply its side effects.
    ///
    /// Errors are recorded as the last error before being returned.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, AppError> {
        let started = Instant::now();

        match self.execute(started).await {
            Ok((outcome, settings)) => {
                let total = outcome.new_total();
                self.alerts.set_badge(Badge::for_total(total));
                if total > 0 {
                    self.alerts
                        .notify(&Notification::for_new_items(total, &settings));
                }
                log::info!(
                    "Cycle finished in {}ms: {} new item(s), snapshot {}",
                    outcome.duration_ms,
                    total,
                    if outcome.snapshot_replaced {
                        "replaced"
                    } else {
                        "unchanged"
                    }
                );
                Ok(outcome)
            }
            Err(e) => {
                log::warn!("Cycle failed: {}", e);
                if let Err(store_err) = self.store.record_error(&e.to_string()).await {
                    log::error!("Failed to record last error: {}", store_err);
                }
                self.alerts.set_badge(if e.is_authentication() {
                    Badge::Error
                } else {
                    Badge::Clear
                });
                Err(e)
            }
        }
    }

    async fn execute(&self, started: Instant) -> Result<(CycleOutcome, Settings), AppError> {
        let settings = self
            .store
            .load_settings()
            .await?
            .ok_or_else(|| AppError::authentication("GitHub credentials are not configured"))?;
        settings.validate()?;

        let client = GitHubClient::new(GitHubClientConfig {
            base_url: settings.api_base_url(),
            token: settings.token.clone(),
            timeout_secs: self.timeout_secs,
        })?;

        let now = Utc::now();
        let options = AggregateOptions {
            since: Some(now - settings.mention_window()),
        };
        let current = Aggregator::new(&client)
            .aggregate(&settings.username, &options)
            .await?;

        let previous = self.store.load_snapshot().await?;
        let last_viewed = self.store.last_viewed().await?;
        let new_items =
            change_detector::detect(&previous, &current, settings.change_policy, last_viewed);

        let snapshot_replaced =
            change_detector::should_replace(&previous, &current, settings.change_policy);
        self.store
            .commit_cycle(snapshot_replaced.then_some(&current), now)
            .await?;

        let totals = Category::ALL
            .iter()
            .map(|category| (*category, current.len(*category)))
            .collect();

        Ok((
            CycleOutcome {
                new_items,
                snapshot_replaced,
                totals,
                duration_ms: started.elapsed().as_millis() as u64,
            },
            settings,
        ))
    }
}
