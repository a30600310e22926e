//! Per-repository protection decisions
//!
//! Each repository ends in exactly one [`Outcome`]. Failures other than a
//! missing or forbidden branch are returned as errors so the caller can
//! record them and move on to the next repository.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::github::{Branch, GitHubApi, RepoRef};
use crate::protection::ProtectionRequest;
use crate::report::Report;

/// Why a repository was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Empty repository, nothing to protect
    NoDefaultBranch,
    /// The branch does not exist or the token may not see it
    Inaccessible,
}

/// Terminal state of one repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    AlreadyProtected,
    /// Dry run: protection would have been enabled
    WouldUpdate,
    Updated,
    Skipped(SkipReason),
}

/// Brings a repository's default branch to the desired protection
pub struct Reconciler<'a, G: GitHubApi + ?Sized> {
    api: &'a G,
    dry_run: bool,
    report: Report,
}

impl<'a, G: GitHubApi + ?Sized> Reconciler<'a, G> {
    pub fn new(api: &'a G, dry_run: bool) -> Self {
        Self::with_report(api, dry_run, Report::stdout())
    }

    pub fn with_report(api: &'a G, dry_run: bool, report: Report) -> Self {
        Self {
            api,
            dry_run,
            report,
        }
    }

    /// Look up the default branch of `repo` and protect it if needed
    pub async fn reconcile(&self, repo: &RepoRef) -> Result<Outcome> {
        let Some(default_branch) = repo.default_branch.as_deref() else {
            debug!("{} has no default branch", repo.full_name);
            return Ok(Outcome::Skipped(SkipReason::NoDefaultBranch));
        };

        debug!("Checking {}:{}", repo.full_name, default_branch);

        let branch = self
            .api
            .get_branch(&repo.owner, &repo.name, default_branch)
            .await?;

        match branch {
            Some(branch) => self.protect(repo, &branch).await,
            None => {
                self.report.line(format_args!(
                    "[SKIP] {}:{} is not accessible",
                    repo.full_name, default_branch
                ));
                Ok(Outcome::Skipped(SkipReason::Inaccessible))
            }
        }
    }

    async fn protect(&self, repo: &RepoRef, branch: &Branch) -> Result<Outcome> {
        if branch.is_protected() {
            self.report.line(format_args!(
                "[OK] {}:{} is already protected",
                repo.full_name, branch.name
            ));
            return Ok(Outcome::AlreadyProtected);
        }

        if self.dry_run {
            self.report.line(format_args!(
                "[DRY-RUN] {}:{} would be changed to protected",
                repo.full_name, branch.name
            ));
            return Ok(Outcome::WouldUpdate);
        }

        self.report.line(format_args!(
            "[UPDATE] {}:{} will be changed to protected",
            repo.full_name, branch.name
        ));

        let request = ProtectionRequest::code_owner_review();
        self.api
            .update_branch_protection(&repo.owner, &repo.name, &branch.name, &request)
            .await
            .with_context(|| format!("Failed to protect {}:{}", repo.full_name, branch.name))?;

        self.report.line(format_args!(
            "[UPDATE] {}:{} has been changed to protected",
            repo.full_name, branch.name
        ));
        info!("Protected {}:{}", repo.full_name, branch.name);

        Ok(Outcome::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::MockGitHubApi;
    use anyhow::anyhow;
    use assert_matches::assert_matches;
    use mockall::predicate::eq;
    use std::sync::{Arc, Mutex};

    fn branch(protected: Option<bool>) -> Branch {
        Branch {
            name: "main".to_string(),
            protected,
        }
    }

    fn widgets() -> RepoRef {
        RepoRef::new("acme", "widgets", Some("main"))
    }

    fn api_with_branch(protected: Option<bool>) -> MockGitHubApi {
        let mut api = MockGitHubApi::new();
        api.expect_get_branch()
            .with(eq("acme"), eq("widgets"), eq("main"))
            .times(1)
            .returning(move |_, _, _| Ok(Some(branch(protected))));
        api
    }

    #[tokio::test]
    async fn test_already_protected_is_left_alone() {
        for dry_run in [false, true] {
            let mut api = api_with_branch(Some(true));
            api.expect_update_branch_protection().times(0);

            let outcome = Reconciler::new(&api, dry_run).reconcile(&widgets()).await.unwrap();
            assert_eq!(outcome, Outcome::AlreadyProtected);
        }
    }

    #[tokio::test]
    async fn test_dry_run_never_updates() {
        let mut api = api_with_branch(Some(false));
        api.expect_update_branch_protection().times(0);

        let buffer = Arc::new(Mutex::new(Vec::<u8>::new()));
        let reconciler = Reconciler::with_report(&api, true, Report::shared(buffer.clone()));

        let outcome = reconciler.reconcile(&widgets()).await.unwrap();
        assert_eq!(outcome, Outcome::WouldUpdate);

        let written = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "[DRY-RUN] acme/widgets:main would be changed to protected\n");
    }

    #[tokio::test]
    async fn test_unprotected_branch_is_updated_once() {
        let mut api = api_with_branch(None);
        api.expect_update_branch_protection()
            .with(
                eq("acme"),
                eq("widgets"),
                eq("main"),
                eq(ProtectionRequest::code_owner_review()),
            )
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let outcome = Reconciler::new(&api, false).reconcile(&widgets()).await.unwrap();
        assert_eq!(outcome, Outcome::Updated);
    }

    #[tokio::test]
    async fn test_update_request_settings() {
        let mut api = api_with_branch(Some(false));
        api.expect_update_branch_protection()
            .withf(|_, _, _, request| {
                let reviews = request.required_pull_request_reviews.as_ref();
                request.enforce_admins
                    && request.required_status_checks.is_none()
                    && request.restrictions.is_none()
                    && reviews.is_some_and(|r| r.require_code_owner_reviews && !r.dismiss_stale_reviews)
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        Reconciler::new(&api, false).reconcile(&widgets()).await.unwrap();
    }

    #[tokio::test]
    async fn test_inaccessible_branch_is_skipped() {
        let mut api = MockGitHubApi::new();
        api.expect_get_branch().times(1).returning(|_, _, _| Ok(None));
        api.expect_update_branch_protection().times(0);

        let outcome = Reconciler::new(&api, false).reconcile(&widgets()).await.unwrap();
        assert_eq!(outcome, Outcome::Skipped(SkipReason::Inaccessible));
    }

    #[tokio::test]
    async fn test_empty_repository_is_skipped() {
        let mut api = MockGitHubApi::new();
        api.expect_get_branch().times(0);

        let repo = RepoRef::new("acme", "empty", None);
        let outcome = Reconciler::new(&api, false).reconcile(&repo).await.unwrap();
        assert_eq!(outcome, Outcome::Skipped(SkipReason::NoDefaultBranch));
    }

    #[tokio::test]
    async fn test_branch_lookup_failure_is_returned() {
        let mut api = MockGitHubApi::new();
        api.expect_get_branch()
            .times(1)
            .returning(|_, _, _| Err(anyhow!("502 Bad Gateway")));
        api.expect_update_branch_protection().times(0);

        let result = Reconciler::new(&api, false).reconcile(&widgets()).await;
        assert_matches!(result, Err(_));
    }

    #[tokio::test]
    async fn test_update_failure_is_returned() {
        let mut api = api_with_branch(Some(false));
        api.expect_update_branch_protection()
            .times(1)
            .returning(|_, _, _, _| Err(anyhow!("422 Validation Failed")));

        let err = Reconciler::new(&api, false)
            .reconcile(&widgets())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("acme/widgets:main"));
    }
}
