//! GitHub REST API v3 profile lookups.

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

use super::{error_message_from_body, USER_AGENT};
use crate::error::ServiceError;

const SERVICE: &str = "GitHub";
const DEFAULT_BASE_URL: &str = "https://api.github.com";
/// Repositories included in a profile summary.
const RECENT_REPO_LIMIT: usize = 5;

/// GitHub login grammar (lowercase): alphanumerics and hyphens, at most 39
/// characters, not starting with a hyphen. One capture group.
pub(crate) const LOGIN: &str = r"([a-z0-9](?:[a-z0-9-]{0,38}))";

/// Whether `username` can be a GitHub login. Anything else would change the
/// request path, so it is rejected before any request is made.
pub fn is_valid_login(username: &str) -> bool {
    static WHOLE_LOGIN: OnceLock<Regex> = OnceLock::new();
    WHOLE_LOGIN
        .get_or_init(|| Regex::new(&format!("(?i)^{LOGIN}$")).expect("login pattern is valid"))
        .is_match(username)
}

/// Profile lookups used by the `get_github_user` tool and lookup mode.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn profile_summary(&self, username: &str) -> Result<ProfileSummary, ServiceError>;
}

/// Condensed public profile handed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub login: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub blog: Option<String>,
    pub public_repos: u64,
    pub followers: u64,
    pub following: u64,
    pub created_at: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub recent_repos: Vec<RepoSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoSummary {
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "stargazers_count", alias = "stars")]
    pub stars: u64,
}

#[derive(Deserialize)]
struct UserPayload {
    login: String,
    name: Option<String>,
    bio: Option<String>,
    company: Option<String>,
    location: Option<String>,
    blog: Option<String>,
    #[serde(default)]
    public_repos: u64,
    #[serde(default)]
    followers: u64,
    #[serde(default)]
    following: u64,
    created_at: Option<String>,
    html_url: String,
}

/// Token-authenticated GitHub client.
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL, timeout)
    }

    /// Point the client at GitHub Enterprise or a test server.
    pub fn with_base_url(token: impl Into<String>, base_url: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Connectivity probe: resolve the login that owns the token.
    pub async fn authenticated_login(&self) -> Result<String, ServiceError> {
        #[derive(Deserialize)]
        struct Me {
            login: String,
        }
        let me: Me = self.get_json("/user", &[], None).await?;
        Ok(me.login)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        username: Option<&str>,
    ) -> Result<T, ServiceError> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .query(query)
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(|source| ServiceError::Http {
                service: SERVICE,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let rate_exhausted = response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.trim() == "0");
            let reset = response
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(
                status,
                rate_exhausted,
                reset.as_deref(),
                &body,
                username,
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::InvalidResponse {
                service: SERVICE,
                message: e.to_string(),
            })
    }
}

fn classify_failure(
    status: StatusCode,
    rate_exhausted: bool,
    reset: Option<&str>,
    body: &str,
    username: Option<&str>,
) -> ServiceError {
    let message = error_message_from_body(body);
    if status == StatusCode::TOO_MANY_REQUESTS || (status == StatusCode::FORBIDDEN && rate_exhausted)
    {
        let when = reset
            .map(|epoch| format!(" (resets at unix time {epoch})"))
            .unwrap_or_default();
        return ServiceError::RateLimited(format!("GitHub API rate limit exceeded{when}"));
    }
    match (status, username) {
        (StatusCode::NOT_FOUND, Some(user)) => {
            ServiceError::NotFound(format!("GitHub user '{user}' not found"))
        }
        (StatusCode::UNAUTHORIZED, _) => ServiceError::Auth {
            service: SERVICE,
            message,
        },
        _ => ServiceError::Status {
            service: SERVICE,
            code: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl ProfileApi for GitHubClient {
    async fn profile_summary(&self, username: &str) -> Result<ProfileSummary, ServiceError> {
        if !is_valid_login(username) {
            return Err(ServiceError::NotFound(format!(
                "'{username}' is not a valid GitHub username"
            )));
        }
        let user: UserPayload = self
            .get_json(&format!("/users/{username}"), &[], Some(username))
            .await?;
        let per_page = RECENT_REPO_LIMIT.to_string();
        let recent_repos: Vec<RepoSummary> = self
            .get_json(
                &format!("/users/{username}/repos"),
                &[("sort", "updated"), ("per_page", per_page.as_str())],
                Some(username),
            )
            .await?;
        tracing::debug!(login = %user.login, repos = recent_repos.len(), "fetched GitHub profile");

        Ok(ProfileSummary {
            login: user.login,
            name: user.name,
            bio: user.bio,
            company: user.company,
            location: user.location,
            blog: user.blog.filter(|b| !b.is_empty()),
            public_repos: user.public_repos,
            followers: user.followers,
            following: user.following,
            created_at: user.created_at,
            html_url: user.html_url,
            recent_repos: recent_repos.into_iter().take(RECENT_REPO_LIMIT).collect(),
        })
    }
}
