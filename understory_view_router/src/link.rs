// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Links toward a view of an element.

use alloc::string::String;

use understory_view_tree::{ElementKey, Field, Tree, Value};

/// Handle to a navigable (element, view) destination.
///
/// A link owns a raw element in the tree that becomes *activated* once the
/// target element reports a mount. [`Router::listen_and_serve`] refuses to
/// start while any link is still inactive.
///
/// [`Router::listen_and_serve`]: crate::Router::listen_and_serve
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub(crate) raw: ElementKey,
    pub(crate) target: ElementKey,
    pub(crate) view: String,
}

impl Link {
    /// Element standing for the link in the tree. Its id is `<target id>/<view>`.
    pub fn raw(&self) -> ElementKey {
        self.raw
    }

    /// Element whose view the link activates.
    pub fn target(&self) -> ElementKey {
        self.target
    }

    /// View the link activates.
    pub fn view(&self) -> &str {
        &self.view
    }

    /// Returns `true` once the target reported a mount.
    pub fn is_activated(&self, tree: &Tree) -> bool {
        tree.get(self.raw, &activated()) == Some(&Value::Bool(true))
    }

    /// In-app route that renders the destination.
    pub fn uri(&self, tree: &Tree) -> String {
        tree.route_to_view(self.target, &self.view)
    }
}

pub(crate) fn activated() -> Field {
    Field::event("activated")
}
