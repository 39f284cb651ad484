//! GitHub API client implementation

use crate::config::GitHubConfig;
use crate::di::{FileStream, Release, Remote};
use crate::github::types::{ContentResponse, GitHubBranch, GitHubRepo, GitHubTag};
use crate::package::manifest::MANIFEST_FILE;
use async_trait::async_trait;
use component_core::{ComponentError, ComponentResult, VersionRange};
use futures_util::StreamExt;
use reqwest::{header, Client as HttpClient, StatusCode};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::debug;

/// Remote backed by GitHub repositories
pub struct GitHubRemote {
    http_client: HttpClient,
    api_url: String,
    raw_url: String,
    token: Option<String>,
    rate_limiter: Arc<RateLimiter>,
}

/// Rate limiter for GitHub API
struct RateLimiter {
    remaining: Mutex<u64>,
    reset_time: Mutex<SystemTime>,
}

impl GitHubRemote {
    /// Create a new GitHub remote
    pub fn new(config: &GitHubConfig) -> ComponentResult<Self> {
        let token = config.token.clone();

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("component-installer"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github.v3+json"),
        );

        if let Some(ref token) = token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("token {}", token))
                    .map_err(|e| ComponentError::Config(format!("Invalid GitHub token: {}", e)))?,
            );
        }

        let http_client = HttpClient::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ComponentError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let has_token = token.is_some();
        Ok(Self {
            http_client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            raw_url: config.raw_url.trim_end_matches('/').to_string(),
            token,
            rate_limiter: Arc::new(RateLimiter {
                remaining: Mutex::new(if has_token { 5000 } else { 60 }),
                reset_time: Mutex::new(SystemTime::now() + Duration::from_secs(3600)),
            }),
        })
    }

    /// Get every tag of a repository, following pagination. `None` if the
    /// repository doesn't exist.
    pub async fn get_tags(&self, repo: &str) -> ComponentResult<Option<Vec<GitHubTag>>> {
        let mut url = format!("{}/repos/{}/tags?per_page=100", self.api_url, repo_path(repo)?);
        let mut tags = Vec::new();

        loop {
            let response = self.api_request(&url).await?;
            if response.status() == StatusCode::NOT_FOUND && tags.is_empty() {
                return Ok(None);
            }
            if !response.status().is_success() {
                return Err(ComponentError::Remote(format!(
                    "GitHub API error: HTTP {}",
                    response.status()
                )));
            }

            let next = next_page(&response);
            let page: Vec<GitHubTag> = response.json().await.map_err(|e| {
                ComponentError::Remote(format!("Failed to parse GitHub API response: {}", e))
            })?;
            tags.extend(page);

            match next {
                Some(next) => url = next,
                None => return Ok(Some(tags)),
            }
        }
    }

    /// Get repository information. `None` if the repository doesn't exist.
    pub async fn get_repo(&self, repo: &str) -> ComponentResult<Option<GitHubRepo>> {
        let url = format!("{}/repos/{}", self.api_url, repo_path(repo)?);
        self.api_get_optional(&url).await
    }

    /// Check whether `branch` exists in `repo`
    pub async fn branch_exists(&self, repo: &str, branch: &str) -> ComponentResult<bool> {
        let url = format!(
            "{}/repos/{}/branches/{}",
            self.api_url,
            repo_path(repo)?,
            urlencoding::encode(branch)
        );
        let found: Option<GitHubBranch> = self.api_get_optional(&url).await?;
        Ok(found.is_some())
    }

    /// Get the base64 content of a file from a repository
    pub async fn get_file_content(
        &self,
        repo: &str,
        path: &str,
        ref_: &str,
    ) -> ComponentResult<String> {
        let url = format!(
            "{}/repos/{}/contents/{}?ref={}",
            self.api_url,
            repo_path(repo)?,
            encode_path(path),
            urlencoding::encode(ref_)
        );

        let response = self.api_request(&url).await?;
        if !response.status().is_success() {
            return Err(ComponentError::Remote(format!(
                "GitHub API error: HTTP {} for {}",
                response.status(),
                path
            )));
        }

        let content: ContentResponse = response.json().await.map_err(|e| {
            ComponentError::Remote(format!("Failed to parse content response: {}", e))
        })?;

        if content.encoding != "base64" {
            return Err(ComponentError::Remote(format!(
                "Unexpected encoding: {}",
                content.encoding
            )));
        }

        Ok(content.content)
    }

    /// Make an API request and handle rate limiting
    async fn api_request(&self, url: &str) -> ComponentResult<reqwest::Response> {
        self.check_rate_limit().await?;

        debug!(url, "GitHub API request");
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ComponentError::Remote(format!("GitHub API request failed: {}", e)))?;

        self.update_rate_limit(&response).await;
        Ok(response)
    }

    /// GET and parse JSON, mapping 404 to `None`
    async fn api_get_optional<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> ComponentResult<Option<T>> {
        let response = self.api_request(url).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ComponentError::Remote(format!(
                "GitHub API error: HTTP {}",
                response.status()
            )));
        }

        response.json().await.map(Some).map_err(|e| {
            ComponentError::Remote(format!("Failed to parse GitHub API response: {}", e))
        })
    }

    /// Check if we're within rate limits
    async fn check_rate_limit(&self) -> ComponentResult<()> {
        let remaining = *self.rate_limiter.remaining.lock().await;
        let reset_time = *self.rate_limiter.reset_time.lock().await;

        if remaining == 0 {
            let now = SystemTime::now();
            if now < reset_time {
                let wait_duration = reset_time.duration_since(now).unwrap_or(Duration::ZERO);
                return Err(ComponentError::Remote(format!(
                    "GitHub API rate limit exceeded. Reset in {} seconds. {}",
                    wait_duration.as_secs(),
                    if self.token.is_none() {
                        "Consider setting GITHUB_TOKEN to increase rate limit to 5000/hour."
                    } else {
                        ""
                    }
                )));
            }
        }

        Ok(())
    }

    /// Update rate limit from response headers
    async fn update_rate_limit(&self, response: &reqwest::Response) {
        if let Some(remaining) = header_u64(response, "x-ratelimit-remaining") {
            *self.rate_limiter.remaining.lock().await = remaining;
        }

        let reset = header_u64(response, "x-ratelimit-reset")
            .and_then(|secs| SystemTime::UNIX_EPOCH.checked_add(Duration::from_secs(secs)));
        if let Some(reset) = reset {
            *self.rate_limiter.reset_time.lock().await = reset;
        }
    }
}

#[async_trait]
impl Remote for GitHubRemote {
    async fn lookup(&self, name: &str, range: &str) -> ComponentResult<Option<Release>> {
        let range = VersionRange::parse(range);

        let Some(tags) = self.get_tags(name).await? else {
            return Ok(None);
        };

        if let Some(tag) = range.best_match(tags.iter().map(|t| t.name.as_str())) {
            return Ok(Some(Release::new(tag)));
        }

        // Untagged repositories install from their default branch
        if tags.is_empty() && range.is_any() {
            return Ok(self
                .get_repo(name)
                .await?
                .map(|repo| Release::new(repo.default_branch)));
        }

        match range {
            VersionRange::Ref(ref branch) => {
                if self.branch_exists(name, branch).await? {
                    Ok(Some(Release::new(branch.clone())))
                } else {
                    Ok(None)
                }
            }
            VersionRange::Semver(_) | VersionRange::AnyOf(_) => Ok(None),
        }
    }

    async fn fetch_manifest(&self, name: &str, release: &Release) -> ComponentResult<Vec<u8>> {
        let content = self
            .get_file_content(name, MANIFEST_FILE, &release.name)
            .await?;
        Ok(content.into_bytes())
    }

    async fn open_file_stream(
        &self,
        name: &str,
        release: &Release,
        path: &str,
    ) -> ComponentResult<FileStream> {
        let url = format!(
            "{}/{}/{}/{}",
            self.raw_url,
            repo_path(name)?,
            urlencoding::encode(&release.name),
            encode_path(path)
        );

        debug!(url = %url, "streaming file");
        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ComponentError::Remote(format!(
                "Failed to download {}: HTTP {}",
                path,
                response.status()
            )));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ComponentError::from))
            .boxed())
    }
}

/// Validate an `owner/repo` name and encode it for a URL path
fn repo_path(repo: &str) -> ComponentResult<String> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(format!(
                "{}/{}",
                urlencoding::encode(owner),
                urlencoding::encode(name)
            ))
        }
        _ => Err(ComponentError::Remote(format!(
            "Invalid package name '{}': expected owner/repo",
            repo
        ))),
    }
}

/// Percent-encode each segment of a relative file path
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// The `rel="next"` URL of a paginated response's `Link` header
fn next_page(response: &reqwest::Response) -> Option<String> {
    let link = response.headers().get(header::LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let mut fields = part.split(';');
        let url = fields.next()?.trim();
        let is_next = fields.any(|param| param.trim() == r#"rel="next""#);
        if is_next {
            url.strip_prefix('<')?.strip_suffix('>').map(str::to_string)
        } else {
            None
        }
    })
}

fn header_u64(response: &reqwest::Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}
