//! pepper - Default Branch Protection for GitHub Accounts
//!
//! pepper walks every repository owned by a GitHub user or organization and
//! makes sure the default branch is protected: administrators are subject to
//! the rules and pull requests need a review from a code owner.
//!
//! ## Core Features
//!
//! - **Paginated Discovery**: Repositories are listed one page at a time
//! - **Exception List**: Repositories named in a JSON file are never touched
//! - **Dry Run**: Report what would change without changing it
//! - **Enterprise Support**: Point at a GitHub Enterprise host with `--url`
//!
//! ## Modules
//!
//! - [`config`]: Startup configuration and the exception set
//! - [`github`]: GitHub API integration
//! - [`protection`]: Wire payload for the branch protection update
//! - [`discovery`]: Paginated repository enumeration
//! - [`reconcile`]: Per-repository protection decisions
//! - [`engine`]: The full pass over one account
//! - [`report`]: Per-repository progress lines
//! - [`shutdown`]: Signal handling

pub mod config;
pub mod discovery;
pub mod engine;
pub mod github;
pub mod protection;
pub mod reconcile;
pub mod report;
pub mod shutdown;

pub use config::{Config, ConfigError, ExceptionSet, Options, Subject};
pub use discovery::{Account, AccountKind, PageCursor, RepositoryEnumerator};
pub use engine::{ProtectionEngine, RunSummary};
pub use github::{Branch, GitHubApi, GitHubClient, RepoPage, RepoRef};
pub use protection::ProtectionRequest;
pub use reconcile::{Outcome, Reconciler, SkipReason};
pub use report::Report;
pub use shutdown::ShutdownSignal;
