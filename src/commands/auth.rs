//! Credential commands: `login` and `reset`.

use crate::error::AppError;
use crate::models::{ChangePolicy, GitHubUser, Settings};
use crate::services::github_client::{GitHubClient, GitHubClientConfig};
use crate::services::store::StateStore;
use serde::Serialize;

/// Input for `login`.
#[derive(Debug, Clone, Default)]
pub struct LoginInput {
    pub username: String,
    pub token: String,
    pub api_base_url: Option<String>,
    pub polling_interval_minutes: Option<u64>,
    pub mention_window_days: Option<u32>,
    pub change_policy: Option<ChangePolicy>,
    /// Skip the `/user` round trip.
    pub skip_verify: bool,
}

/// Response for `login`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub username: String,
    pub api_base_url: String,
    pub polling_interval_minutes: u64,
    pub change_policy: ChangePolicy,

    /// Login the token belongs to, when verified.
    pub verified_login: Option<String>,

    /// The token belongs to a different account than `username`.
    pub login_mismatch: bool,
}

/// Save credentials and polling preferences.
///
/// Options not given keep their stored value (or the default). Unless
/// `skip_verify` is set the token is checked against `/user` first and
/// nothing is saved when GitHub rejects it.
pub async fn login(store: &StateStore, input: LoginInput) -> Result<LoginResponse, AppError> {
    let mut settings = match store.load_settings().await? {
        Some(existing) => Settings {
            username: input.username.trim().to_string(),
            token: input.token.trim().to_string(),
            ..existing
        },
        None => Settings::new(input.username.trim(), input.token.trim()),
    };
    if let Some(url) = input.api_base_url {
        settings.api_base_url = Some(url.trim().to_string()).filter(|u| !u.is_empty());
    }
    if let Some(minutes) = input.polling_interval_minutes {
        settings.polling_interval_minutes = minutes;
    }
    if let Some(days) = input.mention_window_days {
        settings.mention_window_days = days;
    }
    if let Some(policy) = input.change_policy {
        settings.change_policy = policy;
    }
    settings.validate()?;

    let verified = if input.skip_verify {
        None
    } else {
        Some(verify_token(&settings).await?)
    };
    let login_mismatch = verified
        .as_ref()
        .is_some_and(|user| !user.login.eq_ignore_ascii_case(&settings.username));
    if login_mismatch {
        log::warn!(
            "Token belongs to {}, not {}",
            verified.as_ref().map(|u| u.login.as_str()).unwrap_or_default(),
            settings.username
        );
    }

    store.save_settings(&settings).await?;
    store.clear_error().await?;
    log::info!("Saved credentials for {}", settings.username);

    Ok(LoginResponse {
        username: settings.username.clone(),
        api_base_url: settings.api_base_url(),
        polling_interval_minutes: settings.polling_interval_minutes,
        change_policy: settings.change_policy,
        verified_login: verified.map(|u| u.login),
        login_mismatch,
    })
}

async fn verify_token(settings: &Settings) -> Result<GitHubUser, AppError> {
    let client = GitHubClient::new(GitHubClientConfig {
        base_url: settings.api_base_url(),
        token: settings.token.clone(),
        ..GitHubClientConfig::default()
    })?;
    client.current_user().await
}

/// Forget credentials, cached results and status.
pub async fn reset(store: &StateStore) -> Result<(), AppError> {
    store.reset().await?;
    log::info!("Stored state cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(username: &str, token: &str) -> LoginInput {
        LoginInput {
            username: username.into(),
            token: token.into(),
            skip_verify: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_login_without_verification_saves_settings() {
        let store = StateStore::in_memory();
        store.record_error("old failure").await.unwrap();

        let response = login(&store, input(" octocat ", "tok")).await.unwrap();
        assert_eq!(response.username, "octocat");
        assert_eq!(response.api_base_url, "https://api.github.com");
        assert!(response.verified_login.is_none());

        let saved = store.load_settings().await.unwrap().unwrap();
        assert_eq!(saved.token, "tok");
        assert!(store.last_error().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_keeps_existing_preferences() {
        let store = StateStore::in_memory();
        let mut first = input("a", "t1");
        first.polling_interval_minutes = Some(5);
        first.change_policy = Some(ChangePolicy::UpdatedSinceViewed);
        login(&store, first).await.unwrap();

        let response = login(&store, input("a", "t2")).await.unwrap();
        assert_eq!(response.polling_interval_minutes, 5);
        assert_eq!(response.change_policy, ChangePolicy::UpdatedSinceViewed);
    }

    #[tokio::test]
    async fn test_login_rejects_blank_credentials() {
        let store = StateStore::in_memory();
        let err = login(&store, input("", "tok")).await.unwrap_err();
        assert!(err.is_authentication());
        assert!(store.load_settings().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset() {
        let store = StateStore::in_memory();
        login(&store, input("a", "t")).await.unwrap();
        reset(&store).await.unwrap();
        assert!(store.load_settings().await.unwrap().is_none());
    }
}
