//! Per-request authorization decisions.
//!
//! The decision only checks that a credential was resolved when an action
//! declares requirements. Matching a credential against a particular scheme
//! is left to the [`IdentityResolver`](crate::identity::IdentityResolver).

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};
use crate::identity::Identity;

/// Auth requirements declared on an action.
///
/// An action without a declared policy behaves as [`ActionAuthPolicy::Disabled`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActionAuthPolicy {
    /// No credential is needed (`auth: false`).
    #[default]
    Disabled,
    /// Any resolved identity satisfies the policy, e.g. `["Basic", "Bearer"]`.
    Required(BTreeSet<String>),
}

impl ActionAuthPolicy {
    pub fn required<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Required(schemes.into_iter().map(Into::into).collect())
    }

    /// The declared roles/schemes. Empty when auth is disabled.
    pub fn requirements(&self) -> impl Iterator<Item = &str> {
        let set = match self {
            Self::Disabled => None,
            Self::Required(set) => Some(set),
        };
        set.into_iter().flatten().map(String::as_str)
    }

    pub fn is_required(&self) -> bool {
        self.requirements().next().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NoCredential,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::NoCredential => f.write_str("unauthorized: no credential"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Allow,
    Deny(DenyReason),
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthDecision::Allow)
    }

    /// Converts a denial into [`Error::AuthDenied`], which renders as a 401 `NO_RIGHTS`.
    pub fn into_result(self) -> Result<()> {
        match self {
            AuthDecision::Allow => Ok(()),
            AuthDecision::Deny(reason) => Err(Error::AuthDenied(reason.to_string())),
        }
    }
}

/// Decides whether a caller may invoke an action.
///
/// `None` for `policy` means the action declared nothing and is treated as disabled.
pub fn authorize(policy: Option<&ActionAuthPolicy>, identity: Option<&Identity>) -> AuthDecision {
    let required = policy.is_some_and(ActionAuthPolicy::is_required);
    match (required, identity) {
        (false, _) => AuthDecision::Allow,
        (true, Some(_)) => AuthDecision::Allow,
        (true, None) => AuthDecision::Deny(DenyReason::NoCredential),
    }
}
