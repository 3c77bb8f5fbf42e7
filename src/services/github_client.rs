//! GitHub API client.
//!
//! Provides an HTTP client for the GitHub REST API with bearer-token
//! authentication and `Link`-header pagination.

use crate::error::AppError;
use crate::models::{
    GitHubUser, Mention, Organization, PullRequest, Repository, Team, DEFAULT_API_BASE_URL,
};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Page size requested from every list endpoint (GitHub's maximum).
pub const PER_PAGE: u32 = 100;

/// REST API version pinned in every request.
const API_VERSION: &str = "2022-11-28";

/// GitHub API client configuration.
#[derive(Clone)]
pub struct GitHubClientConfig {
    /// Base URL of the API (e.g., `https://api.github.com`).
    pub base_url: String,

    /// Personal access token for authentication.
    pub token: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GitHubClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for GitHubClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    config: GitHubClientConfig,
}

impl GitHubClient {
    /// Create a new GitHub client.
    pub fn new(config: GitHubClientConfig) -> Result<Self, AppError> {
        if config.token.trim().is_empty() {
            return Err(AppError::authentication("GitHub token is not set"));
        }

        let mut headers = header::HeaderMap::new();

        let mut auth_value = header::HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| AppError::authentication("Invalid token format"))?;
        auth_value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth_value);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static(API_VERSION),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("gitping/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Get the full URL for an API path.
    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Turn a non-successful response into an error.
    async fn error_from_response(response: Response, endpoint: &str) -> AppError {
        let status = response.status();
        let rate_limited = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "0");

        let body = response.text().await.unwrap_or_default();
        // GitHub returns errors as {"message": "...", "documentation_url": "..."}
        let body_message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message")?.as_str().map(String::from));

        if status == StatusCode::UNAUTHORIZED {
            return AppError::authentication(
                body_message.unwrap_or_else(|| "GitHub rejected the token".to_string()),
            );
        }

        let message = match (status, &body_message) {
            (StatusCode::FORBIDDEN, _) if rate_limited => "Rate limit exceeded".to_string(),
            (StatusCode::TOO_MANY_REQUESTS, _) => "Rate limit exceeded".to_string(),
            (_, Some(msg)) => msg.clone(),
            (StatusCode::FORBIDDEN, None) => "Access denied".to_string(),
            (StatusCode::NOT_FOUND, None) => "Resource not found".to_string(),
            _ => format!("Request failed ({}): {}", status.as_u16(), body),
        };

        AppError::github_api_full(message, status.as_u16(), endpoint)
    }

    /// Send a request and fail on any non-2xx status.
    async fn send(request: RequestBuilder, endpoint: &str) -> Result<Response, AppError> {
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from_response(response, endpoint).await)
        }
    }

    /// Fetch a single JSON object.
    async fn get_one<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, AppError> {
        let response = Self::send(self.client.get(self.api_url(endpoint)), endpoint).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::data_shape(format!("Failed to parse response: {}", e), endpoint))
    }

    /// Fetch every page of a list endpoint.
    ///
    /// Follows `rel="next"` links until none is left and returns the records
    /// in page order. A failure on any page aborts the whole fetch. Records
    /// that do not decode as `T` are skipped with a warning.
    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, AppError> {
        let mut all_data = Vec::new();
        let mut page = 1u32;

        let mut request = self
            .client
            .get(self.api_url(endpoint))
            .query(query)
            .query(&[("per_page", PER_PAGE.to_string())]);

        loop {
            let response = Self::send(request, endpoint).await?;
            let next = response
                .headers()
                .get(header::LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_next_link);

            let body: Value = response.json().await.map_err(|e| {
                AppError::data_shape(format!("Failed to parse response: {}", e), endpoint)
            })?;
            let records = decode_records::<T>(body, endpoint)?;
            log::debug!("{} page {}: {} record(s)", endpoint, page, records.len());
            all_data.extend(records);

            match next {
                Some(url) => {
                    // The bearer token must never leave the API host.
                    if !same_origin(self.base_url(), &url) {
                        return Err(AppError::data_shape(
                            format!("Pagination link points outside the API host: {}", url),
                            endpoint,
                        ));
                    }
                    page += 1;
                    // The next link already carries every query parameter.
                    request = self.client.get(url);
                }
                None => break,
            }
        }

        Ok(all_data)
    }

    /// Fetch the authenticated user.
    pub async fn current_user(&self) -> Result<GitHubUser, AppError> {
        self.get_one("/user").await
    }

    /// List organizations of the authenticated user.
    pub async fn list_organizations(&self) -> Result<Vec<Organization>, AppError> {
        self.get_all_pages("/user/orgs", &[]).await
    }

    /// List every repository of an organization.
    pub async fn list_org_repositories(&self, org: &str) -> Result<Vec<Repository>, AppError> {
        let endpoint = format!("/orgs/{}/repos", urlencoding::encode(org));
        self.get_all_pages(&endpoint, &[("type", "all".to_string())])
            .await
    }

    /// List repositories owned by the authenticated user.
    pub async fn list_owned_repositories(&self) -> Result<Vec<Repository>, AppError> {
        self.get_all_pages("/user/repos", &[("affiliation", "owner".to_string())])
            .await
    }

    /// List teams the authenticated user is a member of.
    pub async fn list_teams(&self) -> Result<Vec<Team>, AppError> {
        self.get_all_pages("/user/teams", &[]).await
    }

    /// List open pull requests of a repository given as `owner/name`.
    pub async fn list_open_pull_requests(
        &self,
        full_name: &str,
    ) -> Result<Vec<PullRequest>, AppError> {
        let encoded = full_name
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let endpoint = format!("/repos/{}/pulls", encoded);
        self.get_all_pages(&endpoint, &[("state", "open".to_string())])
            .await
    }

    /// Search open issues and pull requests mentioning `username`.
    ///
    /// `since` narrows the search to items updated at or after that time.
    pub async fn search_mentions(
        &self,
        username: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Mention>, AppError> {
        let query = mentions_query(username, since);
        self.get_all_pages(
            "/search/issues",
            &[
                ("q", query),
                ("sort", "updated".to_string()),
                ("order", "desc".to_string()),
            ],
        )
        .await
    }
}

/// Build the search query for open items mentioning `username`.
pub fn mentions_query(username: &str, since: Option<DateTime<Utc>>) -> String {
    let mut query = format!("mentions:{} is:open", username);
    if let Some(since) = since {
        query.push_str(&format!(
            " updated:>={}",
            since.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }
    query
}

/// Whether `url` has the scheme, host and port of `base`.
fn same_origin(base: &str, url: &str) -> bool {
    match (reqwest::Url::parse(base), reqwest::Url::parse(url)) {
        (Ok(base), Ok(url)) => base.origin() == url.origin(),
        _ => false,
    }
}

/// Extract the `rel="next"` URL from a `Link` header.
///
/// `<https://api.github.com/x?page=2>; rel="next", <...>; rel="last"`
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let url = target.strip_prefix('<')?.strip_suffix('>')?;
        let is_next = pieces.any(|param| {
            let param = param.trim();
            param
                .strip_prefix("rel=")
                .map(|rel| rel.trim_matches('"').split_whitespace().any(|r| r == "next"))
                .unwrap_or(false)
        });
        is_next.then(|| url.to_string())
    })
}

/// Decode one page body into records.
///
/// List endpoints return a bare array; search endpoints wrap it in `items`.
fn decode_records<T: DeserializeOwned>(body: Value, endpoint: &str) -> Result<Vec<T>, AppError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(AppError::data_shape(
                    "expected a JSON array or an object with an `items` array",
                    endpoint,
                ))
            }
        },
        _ => {
            return Err(AppError::data_shape(
                "expected a JSON array or an object with an `items` array",
                endpoint,
            ))
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<T>(item) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("Skipping malformed record from {}: {}", endpoint, e),
        }
    }
    Ok(records)
}
