//! Request payload for the branch protection update endpoint
//!
//! `PUT /repos/{owner}/{repo}/branches/{branch}/protection` treats a missing
//! `dismissal_restrictions` key differently from an empty one: a missing key
//! leaves any existing restriction in place, an empty object clears it. The
//! review settings therefore always carry the key, even when no restriction
//! is wanted.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Media type of the protected branches preview API
pub const PROTECTED_BRANCHES_PREVIEW: &str = "application/vnd.github.loki-preview+json";

/// Desired protection for one branch
///
/// The endpoint requires every top-level key, so `None` is sent as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectionRequest {
    pub required_status_checks: Option<RequiredStatusChecks>,
    pub required_pull_request_reviews: Option<PullRequestReviewsEnforcement>,
    pub enforce_admins: bool,
    pub restrictions: Option<BranchRestrictions>,
}

impl ProtectionRequest {
    /// Protection applied to every default branch: admins included, a code
    /// owner has to review, no status checks and no push restrictions.
    pub fn code_owner_review() -> Self {
        Self {
            required_status_checks: None,
            required_pull_request_reviews: Some(PullRequestReviewsEnforcement {
                dismissal_restrictions: None,
                dismiss_stale_reviews: false,
                require_code_owner_reviews: true,
            }),
            enforce_admins: true,
            restrictions: None,
        }
    }
}

/// Status checks that must pass before merging
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequiredStatusChecks {
    pub strict: bool,
    pub contexts: Vec<String>,
}

/// Pull request review settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestReviewsEnforcement {
    /// Who may dismiss reviews. `None` is sent as `{}`, never omitted.
    #[serde(serialize_with = "serialize_dismissal_restrictions")]
    pub dismissal_restrictions: Option<DismissalRestrictions>,

    /// Dismiss approvals when new commits are pushed
    pub dismiss_stale_reviews: bool,

    /// Require an approving review from a code owner
    pub require_code_owner_reviews: bool,
}

/// Users and teams allowed to dismiss reviews
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DismissalRestrictions {
    pub users: Vec<String>,
    pub teams: Vec<String>,
}

/// Users and teams allowed to push
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BranchRestrictions {
    pub users: Vec<String>,
    pub teams: Vec<String>,
}

fn serialize_dismissal_restrictions<S>(
    restrictions: &Option<DismissalRestrictions>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match restrictions {
        Some(restrictions) => restrictions.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}
