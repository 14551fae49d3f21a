// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Route trie over view-owning elements.
//!
//! Every view-owning element reachable from the routing root has one node.
//! A node branches first by view name, then by the id of the view-owning
//! element registered in that view. The two levels are needed because the
//! same view slot can hold different owners over time.
//!
//! Branches and edges keep insertion order, so matching is deterministic.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::{debug, trace};
use understory_view_tree::{ElementKey, Field, Tree, Value, ViewError, is_parameter_name};

use crate::error::MatchError;
use crate::route::tokenize;

#[derive(Clone, Debug)]
struct Branch {
    view: String,
    edges: SmallVec<[(String, usize); 2]>,
}

#[derive(Clone, Debug)]
struct RouteNode {
    element: ElementKey,
    branches: SmallVec<[Branch; 2]>,
}

impl RouteNode {
    fn branch(&self, view: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.view == view)
    }
}

/// One step of an [`ActivationPlan`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Activation {
    /// Element whose view changes.
    pub element: ElementKey,
    /// Name passed to [`Tree::activate_view`]; the raw value for parameters.
    pub view: String,
}

/// View activations produced by a match, ordered root to leaf.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivationPlan {
    steps: Vec<Activation>,
}

impl ActivationPlan {
    /// Steps in execution order.
    pub fn steps(&self) -> &[Activation] {
        &self.steps
    }

    /// Returns `true` for the plan of the empty route.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Activate every step in order, stopping at the first failure.
    pub fn run(&self, tree: &mut Tree) -> Result<(), ViewError> {
        for step in &self.steps {
            tree.activate_view(step.element, &step.view)?;
        }
        Ok(())
    }
}

/// Trie of routable view owners rooted at the routing root.
#[derive(Clone, Debug)]
pub struct RouteTrie {
    nodes: Vec<RouteNode>,
    by_element: HashMap<ElementKey, usize>,
}

impl RouteTrie {
    /// Create a trie rooted at `root`.
    pub fn new(root: ElementKey) -> Self {
        let mut by_element = HashMap::new();
        by_element.insert(root, 0);
        Self {
            nodes: alloc::vec![RouteNode {
                element: root,
                branches: SmallVec::new(),
            }],
            by_element,
        }
    }

    /// The routing root.
    pub fn root(&self) -> ElementKey {
        self.nodes[0].element
    }

    /// Number of elements known to the trie, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if only the root is known.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Returns `true` if `element` has a node.
    pub fn contains(&self, element: ElementKey) -> bool {
        self.by_element.contains_key(&element)
    }

    /// Ids registered under `element` in the view `view`, in insertion order.
    pub fn children(&self, element: ElementKey, view: &str) -> Vec<&str> {
        self.by_element
            .get(&element)
            .and_then(|&n| self.nodes[n].branch(view))
            .map(|b| b.edges.iter().map(|(id, _)| id.as_str()).collect())
            .unwrap_or_default()
    }

    fn node_for(&mut self, element: ElementKey) -> usize {
        if let Some(&n) = self.by_element.get(&element) {
            return n;
        }
        let n = self.nodes.len();
        self.nodes.push(RouteNode {
            element,
            branches: SmallVec::new(),
        });
        self.by_element.insert(element, n);
        n
    }

    fn link(&mut self, parent: usize, view: &str, id: &str, child: usize) -> bool {
        let node = &mut self.nodes[parent];
        let pos = match node.branches.iter().position(|b| b.view == view) {
            Some(pos) => pos,
            None => {
                node.branches.push(Branch {
                    view: view.to_string(),
                    edges: SmallVec::new(),
                });
                node.branches.len() - 1
            }
        };
        let branch = &mut node.branches[pos];
        if branch.edges.iter().any(|(e, _)| e == id) {
            return false;
        }
        branch.edges.push((id.to_string(), child));
        true
    }

    /// Register a view-owning element along its view-access path.
    ///
    /// Elements whose path does not start at the routing root, and elements
    /// without views, are ignored. Returns `true` if the trie changed;
    /// inserting the same element twice is a no-op.
    pub fn insert(&mut self, tree: &Tree, element: ElementKey) -> bool {
        if element == self.root() || !tree.owns_views(element) {
            return false;
        }
        let Some(vap) = tree.view_access_path(element) else {
            return false;
        };
        let Some(first) = vap.first() else {
            return false;
        };
        if first.owner != self.root() {
            trace!(
                element = tree.id_of(element).unwrap_or_default(),
                "ignoring view owner outside the routing root"
            );
            return false;
        }
        let mut changed = false;
        let nodes = vap.nodes();
        let mut successors = nodes
            .iter()
            .skip(1)
            .map(|n| n.owner)
            .chain(core::iter::once(element));
        for step in nodes {
            let Some(next) = successors.next() else {
                break;
            };
            let parent = self.node_for(step.owner);
            let child = self.node_for(next);
            let id = tree.id_of(next).unwrap_or_default();
            if self.link(parent, &step.view, id, child) {
                debug!(
                    parent = tree.id_of(step.owner).unwrap_or_default(),
                    view = %step.view,
                    child = id,
                    "route trie edge added"
                );
                changed = true;
            }
        }
        changed
    }

    /// Resolve a route into activations.
    ///
    /// Parameter values are bound on their owners as
    /// `navigation/<parameter name>` while matching.
    pub fn match_route(&self, tree: &mut Tree, route: &str) -> Result<ActivationPlan, MatchError> {
        let tokens = tokenize(route);
        let mut plan = ActivationPlan::default();
        let Some((&first, rest)) = tokens.split_first() else {
            return Ok(plan);
        };
        if rest.len() % 2 != 0 {
            return Err(MatchError::NotFound(route.into()));
        }

        let mut node = 0;
        let mut view = self.resolve(tree, node, first, route)?;
        plan.steps.push(Activation {
            element: self.nodes[node].element,
            view: first.into(),
        });
        for pair in rest.chunks_exact(2) {
            let (id, segment) = (pair[0], pair[1]);
            let Some(branch) = self.nodes[node].branch(&view) else {
                return Err(if is_parameter_name(&view) {
                    MatchError::FrameworkFailure(alloc::format!(
                        "no branch for parameterized view `{view}`"
                    ))
                } else {
                    MatchError::NotFound(route.into())
                });
            };
            let Some(&(_, child)) = branch.edges.iter().find(|(e, _)| e == id) else {
                return Err(MatchError::NotFound(route.into()));
            };
            node = child;
            view = self.resolve(tree, node, segment, route)?;
            plan.steps.push(Activation {
                element: self.nodes[node].element,
                view: segment.into(),
            });
        }
        Ok(plan)
    }

    /// Resolve `token` to the view name used for branching on `node`.
    fn resolve(
        &self,
        tree: &mut Tree,
        node: usize,
        token: &str,
        route: &str,
    ) -> Result<String, MatchError> {
        let rn = &self.nodes[node];
        let element = rn.element;
        let unauthorized = |tree: &Tree, view: &str| MatchError::Unauthorized {
            element: tree.id_of(element).unwrap_or_default().into(),
            view: view.into(),
        };
        if token.is_empty() {
            return Err(MatchError::NotFound(route.into()));
        }
        let is_static = rn.branch(token).is_some()
            || tree.view(element, token).is_some_and(|v| !v.is_parameterized())
            || tree.active_view(element) == Some(token);
        if is_static {
            if !tree.is_view_authorized(element, token) {
                return Err(unauthorized(tree, token));
            }
            trace!(view = token, "static segment");
            return Ok(token.into());
        }
        let Some(param) = tree.has_parameterized_view(element).map(String::from) else {
            return Err(MatchError::NotFound(route.into()));
        };
        if !tree.is_view_authorized(element, &param) {
            return Err(unauthorized(tree, &param));
        }
        trace!(parameter = %param, value = token, "parameter segment");
        tree.set(element, Field::navigation(param.clone()), Value::Str(token.into()));
        Ok(param)
    }
}
