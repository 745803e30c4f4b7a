//! Change-request publication on GitHub, GitLab and Azure DevOps.
//!
//! [`ProviderBinding`] is parsed once from the repository URL and carries the
//! backend-specific coordinates. [`GitProvider`] dispatches the
//! [`HostingProvider`] capabilities over it through an [`HttpTransport`].
//!
//! Creating a change request is idempotent: when the backend answers that one
//! already exists for the branch pair, the existing request's URL is looked up
//! and returned instead of an error.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use thiserror::Error;
use url::Url;

const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";
const AZURE_BASE: &str = "https://dev.azure.com";
const AZURE_API_VERSION: &str = "7.0";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("could not detect git provider from URL: {0}")]
    UnknownProvider(String),
    #[error("could not parse {provider} repository URL: {url}")]
    InvalidUrl { provider: &'static str, url: String },
    #[error("HTTP request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{action} failed (HTTP {status}): {body}")]
    Status {
        action: &'static str,
        status: u16,
        body: String,
    },
    #[error("unexpected response from {provider}: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },
    #[error("{provider} reports a change request for {head} -> {base} already exists, but it could not be found")]
    ExistingNotFound {
        provider: &'static str,
        head: String,
        base: String,
    },
}

/// What a hosting backend can do for us.
pub trait HostingProvider {
    fn name(&self) -> &'static str;

    /// Open a change request from `head` into `base` and return its web URL.
    fn create_pull_request(
        &self,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<String, ProviderError>;

    fn add_comment(&self, request_id: &str, comment: &str) -> Result<(), ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    fn json(&self, provider: &'static str) -> Result<Value, ProviderError> {
        serde_json::from_str(&self.body).map_err(|e| ProviderError::Decode {
            provider,
            message: e.to_string(),
        })
    }
}

pub trait HttpTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ProviderError>;
}

pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("mutant-killer/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Transport {
                url: String::new(),
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ProviderError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder.send().map_err(|e| ProviderError::Transport {
            url: request.url.clone(),
            message: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| ProviderError::Transport {
            url: request.url.clone(),
            message: e.to_string(),
        })?;
        Ok(HttpResponse { status, body })
    }
}

/// Backend plus the coordinates parsed from the repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderBinding {
    GitHub {
        owner: String,
        repo: String,
    },
    GitLab {
        /// `scheme://host[:port]`, for gitlab.com and self-hosted instances.
        base_url: String,
        /// Group path, possibly nested (`group/subgroup`).
        namespace: String,
        repo: String,
    },
    AzureDevOps {
        organization: String,
        project: String,
        repo: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Host {
    GitHub,
    GitLab,
    Azure,
}

/// Split `https://host/a/b` or `git@host:a/b.git` into host and path segments.
fn split_url(repo_url: &str) -> Option<(String, Option<String>, Vec<String>)> {
    let trimmed = repo_url.trim();
    if let Ok(url) = Url::parse(trimmed) {
        if let Some(host) = url.host_str() {
            let origin = match url.port() {
                Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
                None => format!("{}://{}", url.scheme(), host),
            };
            let segments = url
                .path_segments()
                .map(|s| s.filter(|p| !p.is_empty()).map(str::to_string).collect())
                .unwrap_or_default();
            return Some((host.to_lowercase(), Some(origin), segments));
        }
    }
    // scp-like: [user@]host:path
    let (left, path) = trimmed.split_once(':')?;
    let host = left.rsplit('@').next()?;
    if host.is_empty() || path.starts_with("//") {
        return None;
    }
    let segments = path
        .split('/')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    Some((host.to_lowercase(), None, segments))
}

fn classify(host: &str) -> Option<Host> {
    if host.contains("github.com") {
        Some(Host::GitHub)
    } else if host.contains("gitlab") {
        Some(Host::GitLab)
    } else if host.contains("dev.azure.com") || host.contains("visualstudio.com") {
        Some(Host::Azure)
    } else {
        None
    }
}

fn strip_git_suffix(name: &str) -> String {
    name.strip_suffix(".git").unwrap_or(name).to_string()
}

impl ProviderBinding {
    pub fn from_url(repo_url: &str) -> Result<ProviderBinding, ProviderError> {
        let (host, origin, segments) = split_url(repo_url)
            .ok_or_else(|| ProviderError::UnknownProvider(repo_url.to_string()))?;
        let kind =
            classify(&host).ok_or_else(|| ProviderError::UnknownProvider(repo_url.to_string()))?;

        let invalid = |provider| ProviderError::InvalidUrl {
            provider,
            url: repo_url.to_string(),
        };

        match kind {
            Host::GitHub => match segments.as_slice() {
                [owner, repo, ..] => Ok(ProviderBinding::GitHub {
                    owner: owner.clone(),
                    repo: strip_git_suffix(repo),
                }),
                _ => Err(invalid("GitHub")),
            },
            Host::GitLab => match segments.split_last() {
                Some((repo, namespace)) if !namespace.is_empty() => Ok(ProviderBinding::GitLab {
                    base_url: origin.unwrap_or_else(|| format!("https://{host}")),
                    namespace: namespace.join("/"),
                    repo: strip_git_suffix(repo),
                }),
                _ => Err(invalid("GitLab")),
            },
            Host::Azure => {
                let git_idx = segments
                    .iter()
                    .position(|s| s == "_git")
                    .ok_or_else(|| invalid("Azure DevOps"))?;
                let repo = segments.get(git_idx + 1).ok_or_else(|| invalid("Azure DevOps"))?;
                let project = git_idx
                    .checked_sub(1)
                    .and_then(|i| segments.get(i))
                    .ok_or_else(|| invalid("Azure DevOps"))?;
                let organization = if host.ends_with("visualstudio.com") {
                    host.split('.').next().unwrap_or_default().to_string()
                } else {
                    segments.first().cloned().unwrap_or_default()
                };
                if organization.is_empty() || git_idx < 1 {
                    return Err(invalid("Azure DevOps"));
                }
                Ok(ProviderBinding::AzureDevOps {
                    organization,
                    project: project.clone(),
                    repo: strip_git_suffix(repo),
                })
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderBinding::GitHub { .. } => "GitHub",
            ProviderBinding::GitLab { .. } => "GitLab",
            ProviderBinding::AzureDevOps { .. } => "Azure DevOps",
        }
    }

    pub fn repo(&self) -> &str {
        match self {
            ProviderBinding::GitHub { repo, .. }
            | ProviderBinding::GitLab { repo, .. }
            | ProviderBinding::AzureDevOps { repo, .. } => repo,
        }
    }
}

/// Put `token` into an HTTPS clone URL the way each backend expects.
///
/// URLs that are not HTTPS or belong to no known backend are returned as-is.
pub fn inject_auth(repo_url: &str, token: &str) -> String {
    let Ok(mut url) = Url::parse(repo_url) else {
        return repo_url.to_string();
    };
    if url.scheme() != "https" {
        return repo_url.to_string();
    }
    let Some(kind) = url.host_str().map(str::to_lowercase).as_deref().and_then(classify) else {
        return repo_url.to_string();
    };
    let (user, password) = match kind {
        Host::GitHub => ("x-access-token", Some(token)),
        Host::GitLab => ("oauth2", Some(token)),
        Host::Azure => (token, None),
    };
    if url.set_username(user).is_err() || url.set_password(password).is_err() {
        return repo_url.to_string();
    }
    url.to_string()
}

fn with_query(base: &str, params: &[(&str, &str)]) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{base}?{query}")
}

fn encode_component(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// A [`HostingProvider`] bound to one repository.
pub struct GitProvider {
    binding: ProviderBinding,
    token: String,
    transport: Box<dyn HttpTransport>,
}

impl GitProvider {
    pub fn new(binding: ProviderBinding, token: impl Into<String>, transport: Box<dyn HttpTransport>) -> Self {
        GitProvider {
            binding,
            token: token.into(),
            transport,
        }
    }

    /// Bind to the backend named by `repo_url`, talking HTTP through reqwest.
    pub fn detect(repo_url: &str, token: &str) -> Result<GitProvider, ProviderError> {
        let binding = ProviderBinding::from_url(repo_url)?;
        Ok(Self::new(binding, token, Box::new(ReqwestTransport::new()?)))
    }

    pub fn binding(&self) -> &ProviderBinding {
        &self.binding
    }

    fn auth_headers(&self) -> Vec<(&'static str, String)> {
        match &self.binding {
            ProviderBinding::GitHub { .. } => vec![
                ("Authorization", format!("Bearer {}", self.token)),
                ("Accept", "application/vnd.github+json".to_string()),
                ("X-GitHub-Api-Version", GITHUB_API_VERSION.to_string()),
            ],
            ProviderBinding::GitLab { .. } => vec![("PRIVATE-TOKEN", self.token.clone())],
            ProviderBinding::AzureDevOps { .. } => {
                let encoded = BASE64.encode(format!(":{}", self.token));
                vec![("Authorization", format!("Basic {encoded}"))]
            }
        }
    }

    fn get(&self, url: String) -> Result<HttpResponse, ProviderError> {
        self.transport.send(&HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: self.auth_headers(),
            body: None,
        })
    }

    fn post(&self, url: String, body: Value) -> Result<HttpResponse, ProviderError> {
        self.transport.send(&HttpRequest {
            method: HttpMethod::Post,
            url,
            headers: self.auth_headers(),
            body: Some(body),
        })
    }

    fn gitlab_project_url(base_url: &str, namespace: &str, repo: &str) -> String {
        format!(
            "{}/api/v4/projects/{}",
            base_url.trim_end_matches('/'),
            encode_component(&format!("{namespace}/{repo}"))
        )
    }

    fn azure_repo_url(organization: &str, project: &str, repo: &str) -> String {
        format!("{AZURE_BASE}/{organization}/{project}/_apis/git/repositories/{repo}")
    }

    fn azure_web_url(organization: &str, project: &str, repo: &str, id: u64) -> String {
        format!("{AZURE_BASE}/{organization}/{project}/_git/{repo}/pullrequest/{id}")
    }

    fn is_conflict(&self, response: &HttpResponse) -> bool {
        match &self.binding {
            ProviderBinding::GitHub { .. } => {
                response.status == 422 && response.body.contains("already exists")
            }
            ProviderBinding::GitLab { .. } | ProviderBinding::AzureDevOps { .. } => {
                response.status == 409
            }
        }
    }

    fn string_field(&self, value: &Value, field: &str) -> Result<String, ProviderError> {
        value
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Decode {
                provider: self.name(),
                message: format!("missing `{field}` in response"),
            })
    }

    /// URL of the open change request for `head` -> `base`, if any.
    fn find_existing(&self, head: &str, base: &str) -> Result<Option<String>, ProviderError> {
        let response = match &self.binding {
            ProviderBinding::GitHub { owner, repo } => self.get(with_query(
                &format!("{GITHUB_API_BASE}/repos/{owner}/{repo}/pulls"),
                &[("head", &format!("{owner}:{head}")), ("base", base), ("state", "open")],
            ))?,
            ProviderBinding::GitLab { base_url, namespace, repo } => self.get(with_query(
                &format!("{}/merge_requests", Self::gitlab_project_url(base_url, namespace, repo)),
                &[("source_branch", head), ("target_branch", base), ("state", "opened")],
            ))?,
            ProviderBinding::AzureDevOps { organization, project, repo } => self.get(with_query(
                &format!("{}/pullrequests", Self::azure_repo_url(organization, project, repo)),
                &[
                    ("searchCriteria.sourceRefName", &format!("refs/heads/{head}")),
                    ("searchCriteria.targetRefName", &format!("refs/heads/{base}")),
                    ("searchCriteria.status", "active"),
                    ("api-version", AZURE_API_VERSION),
                ],
            ))?,
        };
        if response.status != 200 {
            tracing::warn!(provider = self.name(), status = response.status, "lookup of existing change request failed");
            return Ok(None);
        }

        let json = response.json(self.name())?;
        let url = match &self.binding {
            ProviderBinding::GitHub { .. } => json
                .get(0)
                .and_then(|pr| pr.get("html_url"))
                .and_then(Value::as_str)
                .map(str::to_string),
            ProviderBinding::GitLab { .. } => json
                .get(0)
                .and_then(|mr| mr.get("web_url"))
                .and_then(Value::as_str)
                .map(str::to_string),
            ProviderBinding::AzureDevOps { organization, project, repo } => json
                .get("value")
                .and_then(|v| v.get(0))
                .and_then(|pr| pr.get("pullRequestId"))
                .and_then(Value::as_u64)
                .map(|id| Self::azure_web_url(organization, project, repo, id)),
        };
        Ok(url)
    }
}

impl HostingProvider for GitProvider {
    fn name(&self) -> &'static str {
        self.binding.name()
    }

    fn create_pull_request(
        &self,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<String, ProviderError> {
        let response = match &self.binding {
            ProviderBinding::GitHub { owner, repo } => self.post(
                format!("{GITHUB_API_BASE}/repos/{owner}/{repo}/pulls"),
                json!({ "title": title, "body": body, "head": head, "base": base }),
            )?,
            ProviderBinding::GitLab { base_url, namespace, repo } => self.post(
                format!("{}/merge_requests", Self::gitlab_project_url(base_url, namespace, repo)),
                json!({
                    "source_branch": head,
                    "target_branch": base,
                    "title": title,
                    "description": body,
                    "remove_source_branch": true,
                }),
            )?,
            ProviderBinding::AzureDevOps { organization, project, repo } => self.post(
                with_query(
                    &format!("{}/pullrequests", Self::azure_repo_url(organization, project, repo)),
                    &[("api-version", AZURE_API_VERSION)],
                ),
                json!({
                    "sourceRefName": format!("refs/heads/{head}"),
                    "targetRefName": format!("refs/heads/{base}"),
                    "title": title,
                    "description": body,
                }),
            )?,
        };

        if response.status == 201 {
            let json = response.json(self.name())?;
            return match &self.binding {
                ProviderBinding::GitHub { .. } => self.string_field(&json, "html_url"),
                ProviderBinding::GitLab { .. } => self.string_field(&json, "web_url"),
                ProviderBinding::AzureDevOps { organization, project, repo } => json
                    .get("pullRequestId")
                    .and_then(Value::as_u64)
                    .map(|id| Self::azure_web_url(organization, project, repo, id))
                    .ok_or_else(|| ProviderError::Decode {
                        provider: self.name(),
                        message: "missing `pullRequestId` in response".to_string(),
                    }),
            };
        }

        if self.is_conflict(&response) {
            tracing::info!(provider = self.name(), head, base, "change request already exists, looking it up");
            return self
                .find_existing(head, base)?
                .ok_or_else(|| ProviderError::ExistingNotFound {
                    provider: self.name(),
                    head: head.to_string(),
                    base: base.to_string(),
                });
        }

        Err(ProviderError::Status {
            action: "create change request",
            status: response.status,
            body: response.body,
        })
    }

    fn add_comment(&self, request_id: &str, comment: &str) -> Result<(), ProviderError> {
        let response = match &self.binding {
            ProviderBinding::GitHub { owner, repo } => self.post(
                format!("{GITHUB_API_BASE}/repos/{owner}/{repo}/issues/{request_id}/comments"),
                json!({ "body": comment }),
            )?,
            ProviderBinding::GitLab { base_url, namespace, repo } => self.post(
                format!(
                    "{}/merge_requests/{request_id}/notes",
                    Self::gitlab_project_url(base_url, namespace, repo)
                ),
                json!({ "body": comment }),
            )?,
            ProviderBinding::AzureDevOps { organization, project, repo } => self.post(
                with_query(
                    &format!(
                        "{}/pullrequests/{request_id}/threads",
                        Self::azure_repo_url(organization, project, repo)
                    ),
                    &[("api-version", AZURE_API_VERSION)],
                ),
                json!({
                    "comments": [{ "content": comment, "commentType": 1 }],
                    "status": 1,
                }),
            )?,
        };
        if (200..300).contains(&response.status) {
            Ok(())
        } else {
            Err(ProviderError::Status {
                action: "add comment",
                status: response.status,
                body: response.body,
            })
        }
    }
}
