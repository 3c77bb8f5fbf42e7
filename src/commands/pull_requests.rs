//! Commands over the stored snapshot: `list`, `mark-viewed` and
//! `review-url`.

use crate::error::AppError;
use crate::models::{Category, Snapshot};
use crate::services::notifications::review_requested_url;
use crate::services::store::StateStore;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One card in `list` output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntry {
    pub category: Category,
    pub repository: String,
    pub title: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub url: String,
    pub draft: bool,
    /// Updated after the last `mark-viewed`.
    pub unseen: bool,
}

/// Stored entries, most recently updated first within each category.
///
/// `category` narrows the output; `None` lists every category in display
/// order.
pub async fn list(
    store: &StateStore,
    category: Option<Category>,
) -> Result<Vec<ListEntry>, AppError> {
    let snapshot = store.load_snapshot().await?;
    let last_viewed = store.last_viewed().await?;

    let categories: Vec<Category> = match category {
        Some(c) => vec![c],
        None => Category::ALL.to_vec(),
    };

    Ok(categories
        .into_iter()
        .flat_map(|c| entries_for(&snapshot, c, last_viewed))
        .collect())
}

fn entries_for(
    snapshot: &Snapshot,
    category: Category,
    last_viewed: Option<DateTime<Utc>>,
) -> Vec<ListEntry> {
    let unseen = |updated_at: DateTime<Utc>| last_viewed.map_or(true, |viewed| updated_at > viewed);

    let mut entries: Vec<ListEntry> = match category {
        Category::Mentions => snapshot
            .mentions
            .iter()
            .map(|m| ListEntry {
                category,
                repository: m.repository_name(),
                title: m.title.clone(),
                author: m.author_login().map(str::to_string),
                created_at: m.created_at,
                updated_at: m.updated_at,
                url: m.target_url().to_string(),
                draft: false,
                unseen: unseen(m.updated_at),
            })
            .collect(),
        _ => snapshot
            .pull_requests(category)
            .iter()
            .map(|pr| ListEntry {
                category,
                repository: pr.repository_name().to_string(),
                title: pr.title.clone(),
                author: pr.author_login().map(str::to_string),
                created_at: pr.created_at,
                updated_at: pr.updated_at,
                url: pr.html_url.clone(),
                draft: pr.draft,
                unseen: unseen(pr.updated_at),
            })
            .collect(),
    };
    entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    entries
}

/// Record that the user has looked at the list.
pub async fn mark_viewed(store: &StateStore) -> Result<DateTime<Utc>, AppError> {
    let now = Utc::now();
    store.mark_viewed(now).await?;
    Ok(now)
}

/// The review-requested page for the stored user.
pub async fn review_url(store: &StateStore) -> Result<String, AppError> {
    let settings = store
        .load_settings()
        .await?
        .ok_or_else(|| AppError::authentication("GitHub credentials are not configured"))?;
    Ok(review_requested_url(&settings))
}
