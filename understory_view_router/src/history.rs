// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Back/forward navigation history.

use alloc::string::String;
use alloc::vec::Vec;

/// Stack of visited routes with a cursor on the current entry.
///
/// Pushing after going back discards the forward entries, as browsers do.
/// Moving past either end is a no-op returning `None`.
///
/// ```
/// use understory_view_router::NavHistory;
///
/// let mut h = NavHistory::new();
/// h.push("/a");
/// h.push("/b");
/// assert_eq!(h.back(), Some("/a"));
/// assert_eq!(h.forward(), Some("/b"));
/// assert_eq!(h.forward(), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavHistory {
    stack: Vec<String>,
    cursor: usize,
}

impl NavHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new current route, dropping any forward entries.
    pub fn push(&mut self, route: impl Into<String>) {
        if !self.stack.is_empty() {
            self.stack.truncate(self.cursor + 1);
        }
        self.stack.push(route.into());
        self.cursor = self.stack.len() - 1;
    }

    /// Step back and return the new current route.
    pub fn back(&mut self) -> Option<&str> {
        if !self.back_allowed() {
            return None;
        }
        self.cursor -= 1;
        self.current()
    }

    /// Step forward and return the new current route.
    pub fn forward(&mut self) -> Option<&str> {
        if !self.forward_allowed() {
            return None;
        }
        self.cursor += 1;
        self.current()
    }

    /// Returns `true` if [`NavHistory::back`] would move.
    pub fn back_allowed(&self) -> bool {
        self.cursor > 0
    }

    /// Returns `true` if [`NavHistory::forward`] would move.
    pub fn forward_allowed(&self) -> bool {
        self.cursor + 1 < self.stack.len()
    }

    /// Route under the cursor.
    pub fn current(&self) -> Option<&str> {
        self.stack.get(self.cursor).map(String::as_str)
    }

    /// Cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.stack
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns `true` if nothing was pushed yet.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
