use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Public GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Exception file looked up relative to the working directory
pub const DEFAULT_EXCEPTIONS_FILE: &str = "./exception-repos.json";

const ENTERPRISE_API_SUFFIX: &str = "/api/v3";

/// Invalid command line input, reported together with the usage text
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GitHub token cannot be empty.")]
    MissingToken,

    #[error("no organizations provided")]
    MissingOrganization,
}

/// Whose repositories are processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// The account the token belongs to
    AuthenticatedUser,
    /// A named organization
    Organization(String),
}

/// Raw startup options, as collected from the command line
#[derive(Debug, Clone)]
pub struct Options {
    pub token: Option<String>,
    pub enterprise_url: Option<String>,
    pub org: Option<String>,
    pub nouser: bool,
    pub dry_run: bool,
    pub exceptions_path: PathBuf,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            token: None,
            enterprise_url: None,
            org: None,
            nouser: false,
            dry_run: false,
            exceptions_path: PathBuf::from(DEFAULT_EXCEPTIONS_FILE),
        }
    }
}

/// Immutable run configuration, built once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// GitHub API token
    pub token: String,

    /// Base URL of the REST API, without a trailing slash
    pub api_url: String,

    /// Whose repositories are processed
    pub subject: Subject,

    /// Report intended changes without applying them
    pub dry_run: bool,

    /// Repositories that are never touched
    pub exceptions: ExceptionSet,
}

impl Config {
    /// Validate the options and load the exception file.
    ///
    /// Validation failures are returned as [`ConfigError`] so the caller can
    /// tell them apart from I/O and parse errors.
    pub fn from_options(options: Options) -> Result<Self> {
        let token = options
            .token
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let subject = if options.nouser {
            let org = options
                .org
                .filter(|org| !org.is_empty())
                .ok_or(ConfigError::MissingOrganization)?;
            Subject::Organization(org)
        } else {
            if let Some(org) = &options.org {
                tracing::debug!("Ignoring organization {} without --nouser", org);
            }
            Subject::AuthenticatedUser
        };

        let exceptions_path = expand_path(&options.exceptions_path)?;
        let exceptions = ExceptionSet::load(&exceptions_path)?;

        Ok(Self {
            token,
            api_url: resolve_api_url(options.enterprise_url.as_deref()),
            subject,
            dry_run: options.dry_run,
            exceptions,
        })
    }
}

/// Work out the REST API base URL, honouring a GitHub Enterprise host
pub fn resolve_api_url(enterprise_url: Option<&str>) -> String {
    match enterprise_url.map(|url| url.trim_end_matches('/')) {
        Some(url) if !url.is_empty() => format!("{}{}", url, ENTERPRISE_API_SUFFIX),
        _ => DEFAULT_API_URL.to_string(),
    }
}

/// Expand `~` and environment variables in a path
fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .with_context(|| format!("Failed to expand exception file path: {:?}", path))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// On-disk layout of the exception file
#[derive(Debug, Deserialize)]
struct ExceptionFile {
    #[serde(default)]
    exceptions: Vec<String>,
}

/// Fully-qualified `owner/name` repositories to leave alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionSet {
    repositories: HashSet<String>,
}

impl ExceptionSet {
    /// Load the exception set from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read exception file: {:?}", path))?;

        Self::from_json(&content)
            .with_context(|| format!("Failed to parse exception file: {:?}", path))
    }

    /// Parse the exception set from the contents of an exception file
    pub fn from_json(content: &str) -> Result<Self> {
        let file: ExceptionFile =
            serde_json::from_str(content).context("Exception file is not valid JSON")?;

        Ok(file.exceptions.into_iter().collect())
    }

    /// Whether `full_name` is excluded from processing
    pub fn contains(&self, full_name: &str) -> bool {
        self.repositories.contains(full_name)
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

impl FromIterator<String> for ExceptionSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            repositories: iter.into_iter().collect(),
        }
    }
}
