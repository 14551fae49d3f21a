// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Views and view-access paths.
//!
//! A [`View`] is a named, ordered list of member elements. An element that owns
//! views renders exactly one of them as its children; the others are kept,
//! detached from the rendered path, until activated.
//!
//! A view whose name starts with [`PARAM_SENTINEL`](crate::PARAM_SENTINEL) is
//! parameterized: its concrete member list is produced at activation time from
//! a raw route segment.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use smallvec::SmallVec;

use crate::error::ViewError;
use crate::types::{ElementKey, PARAM_SENTINEL, is_parameter_name};

/// Validates a raw parameter value and produces the concrete view to render.
pub type Parameterize = Rc<dyn Fn(&str, &View) -> Result<View, ViewError>>;

/// A named, ordered set of member elements.
#[derive(Clone)]
pub struct View {
    pub(crate) name: String,
    pub(crate) members: Vec<ElementKey>,
    parameterize: Option<Parameterize>,
}

impl core::fmt::Debug for View {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name)
            .field("members", &self.members)
            .field("parameterized", &self.parameterize.is_some())
            .finish()
    }
}

impl View {
    /// Create a plain view.
    pub fn new(name: impl Into<String>, members: impl IntoIterator<Item = ElementKey>) -> Self {
        Self {
            name: name.into(),
            members: members.into_iter().collect(),
            parameterize: None,
        }
    }

    /// Create a parameterized view.
    ///
    /// The sentinel is prepended to `name` when missing. `parameterize` receives
    /// the raw value and this view (whose members act as a template) and should
    /// validate the value, returning [`ViewError::Rejected`] when it does not
    /// belong to the accepted set.
    pub fn parameterized(
        name: &str,
        parameterize: impl Fn(&str, &Self) -> Result<Self, ViewError> + 'static,
        members: impl IntoIterator<Item = ElementKey>,
    ) -> Self {
        let name = if is_parameter_name(name) {
            String::from(name)
        } else {
            let mut n = String::with_capacity(name.len() + 1);
            n.push(PARAM_SENTINEL);
            n.push_str(name);
            n
        };
        Self {
            name,
            members: members.into_iter().collect(),
            parameterize: Some(Rc::new(parameterize)),
        }
    }

    /// Name of the view. Parameterized views keep their sentinel.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member elements in render order.
    pub fn members(&self) -> &[ElementKey] {
        &self.members
    }

    /// Returns `true` if the name carries the parameter sentinel.
    pub fn is_parameterized(&self) -> bool {
        is_parameter_name(&self.name)
    }

    /// Resolve a raw parameter value into the concrete view to render.
    ///
    /// Without a parameterization function the template members are used as is.
    pub fn apply_parameter(&self, value: &str) -> Result<Self, ViewError> {
        match &self.parameterize {
            Some(f) => f(value, self),
            None => Ok(Self::new(value, self.members.iter().copied())),
        }
    }
}

/// One step of a view-access path: an owning element and the view that leads
/// further down.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewNode {
    /// Element owning the view.
    pub owner: ElementKey,
    /// Name of the view (the parameter name for parameterized views).
    pub view: String,
}

/// Ordered chain of (owner, view) pairs from the routing root down to an element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewAccessPath(pub(crate) SmallVec<[ViewNode; 4]>);

impl ViewAccessPath {
    /// Nodes from the outermost owner to the innermost.
    pub fn nodes(&self) -> &[ViewNode] {
        &self.0
    }

    /// The outermost node; its owner is the routing root.
    pub fn first(&self) -> Option<&ViewNode> {
        self.0.first()
    }

    /// The innermost node, i.e. the view directly enclosing the element.
    pub fn last(&self) -> Option<&ViewNode> {
        self.0.last()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the path has no nodes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, node: ViewNode) {
        self.0.push(node);
    }
}
