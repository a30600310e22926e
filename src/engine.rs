//! Protection Engine - One pass over an account's repositories
//!
//! Pages are fetched in order and repositories are handled one at a time in
//! listing order. A failed page fetch ends the pass with an error; a failed
//! repository is recorded and the pass moves on.

use anyhow::Result;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::discovery::{Account, RepositoryEnumerator};
use crate::github::{GitHubApi, RepoRef};
use crate::reconcile::{Outcome, Reconciler};
use crate::report::Report;
use crate::shutdown::ShutdownSignal;

/// Results from a complete protection pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_fetched: usize,
    pub total_repositories: usize,
    /// Not owned by the account, listed in the exception file, or repeated
    pub filtered: usize,
    pub already_protected: usize,
    pub would_update: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// The pass stopped early because of a shutdown signal
    pub interrupted: bool,
    pub duration: Duration,
}

impl RunSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::AlreadyProtected => self.already_protected += 1,
            Outcome::WouldUpdate => self.would_update += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Skipped(_) => self.skipped += 1,
        }
    }
}

/// Drives the enumerator, the exception filter and the reconciler
pub struct ProtectionEngine<'a, G: GitHubApi + ?Sized> {
    api: &'a G,
    config: &'a Config,
    shutdown: ShutdownSignal,
    report: Report,
}

impl<'a, G: GitHubApi + ?Sized> ProtectionEngine<'a, G> {
    pub fn new(api: &'a G, config: &'a Config, shutdown: ShutdownSignal) -> Self {
        Self {
            api,
            config,
            shutdown,
            report: Report::stdout(),
        }
    }

    /// Send progress lines somewhere other than stdout
    pub fn with_report(mut self, report: Report) -> Self {
        self.report = report;
        self
    }

    /// Protect the default branch of every eligible repository of `account`
    pub async fn run(&self, account: &Account) -> Result<RunSummary> {
        let start_time = Instant::now();

        info!(
            "Starting protection pass for {} ({} exceptions{})",
            account.login,
            self.config.exceptions.len(),
            if self.config.dry_run { ", dry run" } else { "" }
        );

        let mut pages = RepositoryEnumerator::new(self.api, account);
        let reconciler = Reconciler::with_report(self.api, self.config.dry_run, self.report.clone());
        let mut seen = HashSet::new();
        let mut summary = RunSummary::default();

        'pages: loop {
            if self.shutdown.is_triggered() {
                summary.interrupted = true;
                break;
            }

            let Some(repositories) = pages.next_page().await? else {
                break;
            };
            summary.pages_fetched = pages.pages_fetched();

            for repo in repositories {
                if self.shutdown.is_triggered() {
                    summary.interrupted = true;
                    break 'pages;
                }

                summary.total_repositories += 1;

                if !self.is_eligible(account, &repo) || !seen.insert(repo.full_name.clone()) {
                    summary.filtered += 1;
                    continue;
                }

                self.report.line(format_args!("{}", repo.full_name));

                match reconciler.reconcile(&repo).await {
                    Ok(outcome) => summary.record(outcome),
                    Err(e) => {
                        warn!("{}: {:#}", repo.full_name, e);
                        self.report.line(format_args!("[FAIL] {}: {}", repo.full_name, e));
                        summary.failed += 1;
                    }
                }
            }
        }

        summary.duration = start_time.elapsed();

        info!(
            "Protection pass completed in {:.2}s: {} repositories, {} updated, {} failed",
            summary.duration.as_secs_f64(),
            summary.total_repositories,
            summary.updated,
            summary.failed
        );

        Ok(summary)
    }

    /// Owned by the account being enumerated and not listed as an exception
    fn is_eligible(&self, account: &Account, repo: &RepoRef) -> bool {
        if !account.owns(repo) {
            debug!("Skipping {}: not owned by {}", repo.full_name, account.login);
            return false;
        }

        if self.config.exceptions.contains(&repo.full_name) {
            debug!("Skipping {}: listed as an exception", repo.full_name);
            return false;
        }

        true
    }
}
