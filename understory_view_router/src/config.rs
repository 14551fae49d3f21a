// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Router configuration.

use alloc::borrow::Cow;
use alloc::string::String;

use understory_view_tree::Field;

use crate::error::{MatchError, NavigationError};

/// Which fallback signal a failed navigation raises.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Not-found and activation errors raise `notfound`, rejected guards raise
    /// `unauthorized`, trie inconsistencies raise `appfailure`.
    #[default]
    Distinct,
    /// Every failure raises `unauthorized`.
    Collapse,
}

impl FailurePolicy {
    /// Name of the navigation field signalled for `err`.
    pub fn signal_for(self, err: &NavigationError) -> &'static str {
        match self {
            Self::Collapse => UNAUTHORIZED,
            Self::Distinct => match err {
                NavigationError::Match(MatchError::NotFound(_))
                | NavigationError::Activation(_) => NOT_FOUND,
                NavigationError::Match(MatchError::Unauthorized { .. }) => UNAUTHORIZED,
                NavigationError::Match(MatchError::FrameworkFailure(_)) => APP_FAILURE,
            },
        }
    }
}

pub(crate) const NOT_FOUND: &str = "notfound";
pub(crate) const UNAUTHORIZED: &str = "unauthorized";
pub(crate) const APP_FAILURE: &str = "appfailure";
pub(crate) const ROUTE_CHANGE_REQUEST: &str = "routechangerequest";
pub(crate) const CURRENT_ROUTE: &str = "currentroute";

pub(crate) fn navigation(name: &'static str) -> Field {
    Field::navigation(Cow::Borrowed(name))
}

/// Router options.
///
/// ```
/// use understory_view_router::{FailurePolicy, RouterConfig};
///
/// let config = RouterConfig::new("https://example.com/app/")
///     .leave_trailing_slash(true)
///     .failure_policy(FailurePolicy::Collapse);
/// assert_eq!(config.base_url(), "https://example.com/app/");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouterConfig {
    base_url: String,
    leave_trailing_slash: bool,
    failure_policy: FailurePolicy,
}

impl RouterConfig {
    /// Configuration for an app served under `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Keep a trailing `/` on incoming routes instead of trimming it.
    pub fn leave_trailing_slash(mut self, leave: bool) -> Self {
        self.leave_trailing_slash = leave;
        self
    }

    /// Choose how failures map to fallback signals.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Base URL as configured.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns `true` if trailing slashes are kept.
    pub fn keeps_trailing_slash(&self) -> bool {
        self.leave_trailing_slash
    }

    /// Active failure policy.
    pub fn policy(&self) -> FailurePolicy {
        self.failure_policy
    }
}
