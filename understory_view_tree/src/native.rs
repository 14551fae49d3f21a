// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hooks for mirroring the abstract tree into a concrete rendering surface.

use crate::types::{ElementKey, Field, Value};

/// Receives structural and property changes as they happen in a [`Tree`](crate::Tree).
///
/// Every hook has a no-op default, so a binding implements only what its
/// surface needs. Install one with [`Tree::set_binding`](crate::Tree::set_binding).
pub trait NativeBinding {
    /// `child` became the active child of `parent` at `index`.
    fn insert_child(&mut self, _parent: ElementKey, _child: ElementKey, _index: usize) {}

    /// `child` stopped being an active child of `parent`.
    fn remove_child(&mut self, _parent: ElementKey, _child: ElementKey) {}

    /// A field that is mirrored to the surface changed.
    fn set_property(&mut self, _element: ElementKey, _field: &Field, _value: &Value) {}

    /// Start forwarding native events of `kind` targeted at `element`.
    fn listen(&mut self, _element: ElementKey, _kind: &str) {}
}
