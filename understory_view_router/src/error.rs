// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy for matching, navigation and router setup.

use alloc::string::String;

use understory_view_tree::{TreeError, ViewError};

/// Why a route did not match the trie.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    /// No trie branch or view matches, or the route has the wrong shape.
    #[error("no view matches route `{0}`")]
    NotFound(String),
    /// The element's guard rejected the resolved view.
    #[error("view `{view}` of element `{element}` is not authorized")]
    Unauthorized {
        /// Id of the owning element.
        element: String,
        /// Resolved view name.
        view: String,
    },
    /// The trie lacks a branch its own shape requires.
    #[error("router trie is inconsistent: {0}")]
    FrameworkFailure(String),
}

/// Why a navigation failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    /// The route did not match.
    #[error(transparent)]
    Match(#[from] MatchError),
    /// A matched view refused to activate.
    #[error("view activation failed: {0}")]
    Activation(#[from] ViewError),
}

/// Failure of router setup or serving.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// A link's target never reported a mount before serving started.
    #[error("link `{0}` was never activated")]
    InactiveLink(String),
    /// A tree operation failed.
    #[error(transparent)]
    Tree(#[from] TreeError),
}
