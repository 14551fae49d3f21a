// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for structural operations and view activation.

use alloc::string::String;

use crate::view::View;

/// Failure of a structural tree operation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// The key does not belong to this tree.
    #[error("unknown element")]
    UnknownElement,
    /// Element ids are unique within a tree.
    #[error("element id `{0}` is already in use")]
    DuplicateId(String),
    /// The child is an ancestor of (or equal to) the requested parent.
    #[error("an element cannot be attached beneath its own descendant")]
    Cycle,
    /// The element is not an active child of the given parent.
    #[error("element is not a child of the given parent")]
    NotAChild,
    /// An element owns at most one parameterized view.
    #[error("element already owns parameterized view `{0}`")]
    DuplicateParameterizedView(String),
    /// The named view is the one currently rendered.
    #[error("view `{0}` is currently active")]
    ViewActive(String),
}

/// Failure of [`Tree::activate_view`](crate::Tree::activate_view) or of a
/// view's parameterization function.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    /// The key does not belong to this tree.
    #[error("unknown element")]
    UnknownElement,
    /// Neither a concrete nor a parameterized view matches.
    #[error("view `{view}` does not exist on element `{element}`")]
    NotFound {
        /// Id of the element the view was requested on.
        element: String,
        /// Requested view name.
        view: String,
    },
    /// A parameterized view name consists of the sentinel alone.
    #[error("parameterized view name needs at least one character after the sentinel")]
    EmptyParameterName,
    /// The parameterization function refused the value.
    #[error("value `{value}` rejected by parameterized view `{view}`")]
    Rejected {
        /// Name of the parameterized view.
        view: String,
        /// Raw value that was refused.
        value: String,
    },
}

impl ViewError {
    /// Convenience constructor for parameterization functions.
    pub fn rejected(view: &View, value: &str) -> Self {
        Self::Rejected {
            view: view.name().into(),
            value: value.into(),
        }
    }
}
