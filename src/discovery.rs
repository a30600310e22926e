//! Paginated repository discovery
//!
//! Repositories are listed one page at a time. The enumerator keeps the page
//! cursor between calls and stops once the service reports that the current
//! page is the last one.

use anyhow::Result;
use tracing::debug;

use crate::config::Subject;
use crate::github::{GitHubApi, RepoPage, RepoRef};

/// Repositories requested per page
pub const PAGE_SIZE: u8 = 20;

/// Kind of account whose repositories are listed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    User,
    Organization,
}

/// The account being enumerated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub kind: AccountKind,
    pub login: String,
}

impl Account {
    pub fn user(login: &str) -> Self {
        Self {
            kind: AccountKind::User,
            login: login.to_string(),
        }
    }

    pub fn organization(login: &str) -> Self {
        Self {
            kind: AccountKind::Organization,
            login: login.to_string(),
        }
    }

    /// Turn the configured subject into a concrete account, asking GitHub
    /// who the token belongs to when needed
    pub async fn resolve<G>(api: &G, subject: &Subject) -> Result<Self>
    where
        G: GitHubApi + ?Sized,
    {
        match subject {
            Subject::AuthenticatedUser => Ok(Self::user(&api.authenticated_login().await?)),
            Subject::Organization(org) => Ok(Self::organization(org)),
        }
    }

    /// Whether this account owns `repo`
    pub fn owns(&self, repo: &RepoRef) -> bool {
        repo.owner == self.login
    }
}

/// Position in a paginated listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// 1-based page number
    pub page: u32,
    pub per_page: u8,
}

impl PageCursor {
    pub fn first() -> Self {
        Self {
            page: 1,
            per_page: PAGE_SIZE,
        }
    }

    /// Cursor for the page after `fetched`, or `None` when `fetched` was the
    /// last page
    pub fn advance(self, fetched: &RepoPage) -> Option<Self> {
        if fetched.last_page == Some(self.page) {
            return None;
        }

        fetched.next_page.map(|page| Self { page, ..self })
    }
}

/// Walks an account's repositories page by page
pub struct RepositoryEnumerator<'a, G: GitHubApi + ?Sized> {
    api: &'a G,
    account: &'a Account,
    cursor: Option<PageCursor>,
    pages_fetched: usize,
}

impl<'a, G: GitHubApi + ?Sized> RepositoryEnumerator<'a, G> {
    pub fn new(api: &'a G, account: &'a Account) -> Self {
        Self {
            api,
            account,
            cursor: Some(PageCursor::first()),
            pages_fetched: 0,
        }
    }

    /// Fetch the next page. Returns `Ok(None)` once the listing is exhausted.
    ///
    /// A failed fetch ends the enumeration; later calls return `Ok(None)`.
    pub async fn next_page(&mut self) -> Result<Option<Vec<RepoRef>>> {
        let Some(cursor) = self.cursor.take() else {
            return Ok(None);
        };

        debug!(
            "Listing repositories for {} (page {}, {} per page)",
            self.account.login, cursor.page, cursor.per_page
        );

        let page = self
            .api
            .list_repositories(self.account, cursor.page, cursor.per_page)
            .await?;
        self.pages_fetched += 1;
        self.cursor = cursor.advance(&page);

        Ok(Some(page.repositories))
    }

    /// Number of pages fetched so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}
