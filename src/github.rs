use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use octocrab::models::Repository;
use octocrab::Octocrab;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::discovery::{Account, AccountKind};
use crate::protection::{ProtectionRequest, PROTECTED_BRANCHES_PREVIEW};

const USER_AGENT: &str = concat!("pepper/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Escaped inside a single path segment; non-ASCII is always escaped
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Repository as seen by the protection pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    /// Owner login, empty when the listing carried no owner
    pub owner: String,

    /// Repository name
    pub name: String,

    /// `owner/name`
    pub full_name: String,

    /// Default branch, absent for empty repositories
    pub default_branch: Option<String>,
}

impl RepoRef {
    pub fn new(owner: &str, name: &str, default_branch: Option<&str>) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            full_name: format!("{}/{}", owner, name),
            default_branch: default_branch.map(str::to_string),
        }
    }
}

/// Branch with its protection flag
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Branch {
    pub name: String,

    #[serde(default)]
    pub protected: Option<bool>,
}

impl Branch {
    /// A missing flag counts as unprotected
    pub fn is_protected(&self) -> bool {
        self.protected.unwrap_or(false)
    }
}

/// One page of a repository listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoPage {
    pub repositories: Vec<RepoRef>,

    /// Page number of the `next` link, if any
    pub next_page: Option<u32>,

    /// Page number of the `last` link, if any
    pub last_page: Option<u32>,
}

/// The GitHub operations the protection pass relies on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Login of the account the token belongs to
    async fn authenticated_login(&self) -> Result<String>;

    /// Fetch one page of an account's repositories
    async fn list_repositories(&self, account: &Account, page: u32, per_page: u8)
        -> Result<RepoPage>;

    /// Fetch a branch. `Ok(None)` means the branch does not exist or the
    /// token may not see it.
    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<Option<Branch>>;

    /// Replace the protection of a branch
    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        request: &ProtectionRequest,
    ) -> Result<()>;
}

impl From<Repository> for RepoRef {
    fn from(repo: Repository) -> Self {
        let owner = repo.owner.map(|owner| owner.login).unwrap_or_default();
        let full_name = repo
            .full_name
            .unwrap_or_else(|| format!("{}/{}", owner, repo.name));

        Self {
            owner,
            name: repo.name,
            full_name,
            default_branch: repo.default_branch,
        }
    }
}

/// GitHub client wrapper
///
/// Reads go through octocrab. The protection update targets the preview
/// media type, so it is sent with a plain reqwest client instead.
pub struct GitHubClient {
    client: Octocrab,
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    /// Create a client for the configured API host
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_api_url(&config.token, &config.api_url)
    }

    /// Create a client against an explicit API base URL
    pub fn with_api_url(token: &str, api_url: &str) -> Result<Self> {
        let api_url = api_url.trim_end_matches('/').to_string();

        let client = Octocrab::builder()
            .base_uri(api_url.as_str())
            .with_context(|| format!("Invalid GitHub API URL: {}", api_url))?
            .personal_token(token.to_string())
            .build()
            .context("Failed to create GitHub client")?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        debug!("GitHub API base URL: {}", api_url);

        Ok(Self {
            client,
            http,
            api_url,
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn authenticated_login(&self) -> Result<String> {
        let user = self
            .client
            .current()
            .user()
            .await
            .map_err(api_error)
            .context("Failed to get current user information. Check your token.")?;

        info!("Authenticated as GitHub user: {}", user.login);
        Ok(user.login)
    }

    async fn list_repositories(
        &self,
        account: &Account,
        page: u32,
        per_page: u8,
    ) -> Result<RepoPage> {
        debug!("Fetching repositories for {} page {}", account.login, page);

        let listing = match account.kind {
            AccountKind::User => {
                self.client
                    .users(account.login.clone())
                    .repos()
                    .per_page(per_page)
                    .page(page)
                    .send()
                    .await
            }
            AccountKind::Organization => {
                self.client
                    .orgs(account.login.clone())
                    .list_repos()
                    .per_page(per_page)
                    .page(page)
                    .send()
                    .await
            }
        }
        .map_err(api_error)
        .with_context(|| format!("Failed to fetch repositories for {} page {}", account.login, page))?;

        // GitHub's `next` link always points at the following page
        let next_page = listing.next.is_some().then_some(page + 1);
        let last_page = listing.number_of_pages();

        Ok(RepoPage {
            repositories: listing.items.into_iter().map(RepoRef::from).collect(),
            next_page,
            last_page,
        })
    }

    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<Option<Branch>> {
        let route = branch_route(owner, repo, branch);

        let result: octocrab::Result<Branch> = self.client.get(&route, None::<&()>).await;
        match result {
            Ok(branch) => Ok(Some(branch)),
            Err(octocrab::Error::GitHub { source, .. })
                if matches!(source.status_code.as_u16(), 403 | 404) =>
            {
                debug!(
                    "No access to {}/{}:{} ({})",
                    owner, repo, branch, source.status_code
                );
                Ok(None)
            }
            Err(e) => Err(api_error(e))
                .with_context(|| format!("Failed to fetch branch {}/{}:{}", owner, repo, branch)),
        }
    }

    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        request: &ProtectionRequest,
    ) -> Result<()> {
        let url = format!("{}{}/protection", self.api_url, branch_route(owner, repo, branch));
        debug!("PUT {}", url);

        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, PROTECTED_BRANCHES_PREVIEW)
            .json(request)
            .send()
            .await
            .with_context(|| {
                format!("Failed to send protection update for {}/{}:{}", owner, repo, branch)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "GitHub rejected protection update for {}/{}:{} ({}): {}",
                owner,
                repo,
                branch,
                status,
                body
            ));
        }

        Ok(())
    }
}

/// Route of a branch, each name escaped as a single path segment
fn branch_route(owner: &str, repo: &str, branch: &str) -> String {
    format!(
        "/repos/{}/{}/branches/{}",
        utf8_percent_encode(owner, PATH_SEGMENT),
        utf8_percent_encode(repo, PATH_SEGMENT),
        utf8_percent_encode(branch, PATH_SEGMENT)
    )
}

/// One-line error for an octocrab failure, without the captured backtrace
fn api_error(error: octocrab::Error) -> anyhow::Error {
    match error {
        octocrab::Error::GitHub { source, .. } => {
            anyhow!("GitHub returned {}: {}", source.status_code, source.message)
        }
        other => {
            let message = other.to_string();
            anyhow!("{}", message.lines().next().unwrap_or_default().trim())
        }
    }
}
