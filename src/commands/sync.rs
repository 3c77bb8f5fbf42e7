//! Polling commands: `check`, `watch` and `status`.

use crate::error::AppError;
use crate::models::settings::polling_interval_from_minutes;
use crate::models::Category;
use crate::services::cycle::CycleRunner;
use crate::services::polling::PollingService;
use crate::services::store::StateStore;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-category counts.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
}

/// Response for `check`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub new_total: usize,
    pub new_by_category: Vec<CategoryCount>,
    pub totals: Vec<CategoryCount>,
    pub snapshot_replaced: bool,
    pub duration_ms: u64,
}

/// Run one cycle now.
pub async fn check(runner: &CycleRunner) -> Result<CheckResponse, AppError> {
    let outcome = runner.run_cycle().await?;

    Ok(CheckResponse {
        new_total: outcome.new_total(),
        new_by_category: Category::ALL
            .iter()
            .map(|category| CategoryCount {
                category: *category,
                count: outcome.new_items.len(*category),
            })
            .collect(),
        totals: outcome
            .totals
            .iter()
            .map(|(category, count)| CategoryCount {
                category: *category,
                count: *count,
            })
            .collect(),
        snapshot_replaced: outcome.snapshot_replaced,
        duration_ms: outcome.duration_ms,
    })
}

/// Poll until Ctrl-C.
///
/// Without an override the loop follows the stored interval, so a later
/// `login --interval` takes effect after the next cycle.
pub async fn watch(runner: CycleRunner, interval_minutes: Option<u64>) -> Result<(), AppError> {
    let settings = runner
        .store()
        .load_settings()
        .await?
        .ok_or_else(|| AppError::authentication("GitHub credentials are not configured"))?;
    settings.validate()?;

    let mut polling = match interval_minutes {
        Some(minutes) => PollingService::new(runner, polling_interval_from_minutes(minutes)?),
        None => PollingService::new(runner, settings.polling_interval()).follow_stored_interval(),
    };
    polling.start()?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("Failed to listen for Ctrl-C: {}", e)))?;
    log::info!("Shutting down");

    polling.stop().await
}

/// Response for `status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub username: Option<String>,
    pub api_base_url: Option<String>,
    pub polling_interval_minutes: Option<u64>,
    pub last_update_time: Option<DateTime<Utc>>,
    pub last_viewed_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub counts: Vec<CategoryCount>,
}

/// Summarize stored state without touching the network.
pub async fn status(store: &StateStore) -> Result<StatusResponse, AppError> {
    let settings = store.load_settings().await?;
    let snapshot = store.load_snapshot().await?;

    Ok(StatusResponse {
        username: settings.as_ref().map(|s| s.username.clone()),
        api_base_url: settings.as_ref().map(|s| s.api_base_url()),
        polling_interval_minutes: settings.as_ref().map(|s| s.polling_interval_minutes),
        last_update_time: store.last_update_time().await?,
        last_viewed_time: store.last_viewed().await?,
        last_error: store.last_error().await?,
        counts: Category::ALL
            .iter()
            .map(|category| CategoryCount {
                category: *category,
                count: snapshot.len(*category),
            })
            .collect(),
    })
}
