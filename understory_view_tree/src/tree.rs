// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: structure, views, data store.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use tracing::{debug, trace};

use crate::error::{TreeError, ViewError};
use crate::event::Listener;
use crate::native::NativeBinding;
use crate::signal::{Observers, SubscriptionId, Topic};
use crate::types::{
    ElementFlags, ElementKey, Field, Mutation, Outcome, PARAM_SENTINEL, Value, is_parameter_name,
};
use crate::view::{View, ViewAccessPath, ViewNode};

/// Handler notified when a watched field changes.
pub type Watcher = Box<dyn FnMut(&mut Tree, &Mutation) -> Outcome>;

/// Authorization predicate over view names.
pub type ViewGuard = Rc<dyn Fn(&str) -> bool>;

/// Where an attached element lands relative to its parent.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Slot {
    /// Rendered child; part of the ancestor path.
    Active,
    /// Member of the named inactive view; routable but not rendered.
    Inactive(String),
}

struct Element {
    id: String,
    name: String,
    flags: ElementFlags,
    /// Document root this element was last attached under.
    root: Option<ElementKey>,
    /// Topmost element of the connected subtree.
    subtree_root: ElementKey,
    parent: Option<ElementKey>,
    /// Rendered ancestors, outermost first.
    path: Vec<ElementKey>,
    children: Vec<ElementKey>,
    /// Inactive views. `Some` once the element has registered any view.
    views: Option<Vec<View>>,
    active_view: Option<String>,
    view_access_path: Option<ViewAccessPath>,
    guard: Option<ViewGuard>,
    data: HashMap<Field, Value>,
}

impl Element {
    fn new(id: String, name: String, flags: ElementFlags, key: ElementKey) -> Self {
        let root = flags.contains(ElementFlags::DOCUMENT_ROOT).then_some(key);
        Self {
            id,
            name,
            flags,
            root,
            subtree_root: key,
            parent: None,
            path: Vec::new(),
            children: Vec::new(),
            views: None,
            active_view: None,
            view_access_path: None,
            guard: None,
            data: HashMap::new(),
        }
    }

    fn alternates(&self) -> &[View] {
        self.views.as_deref().unwrap_or(&[])
    }
}

/// Arena of UI elements organized by views.
///
/// Elements are created with [`Tree::create`] and linked with the child
/// operations. An element that owns views renders exactly one of them (its
/// [active view](Tree::active_view)) as its children; the remaining views keep
/// their members attached as inactive, so every element stays routable.
///
/// ## Example
///
/// ```rust
/// use understory_view_tree::{Tree, View};
///
/// let mut tree = Tree::new();
/// let doc = tree.create_document("app").unwrap();
/// let home = tree.create("home-page", "div").unwrap();
/// let about = tree.create("about-page", "div").unwrap();
/// tree.add_view(doc, View::new("home", [home])).unwrap();
/// tree.add_view(doc, View::new("about", [about])).unwrap();
///
/// tree.activate_view(doc, "home").unwrap();
/// assert_eq!(tree.children_of(doc), &[home]);
/// assert_eq!(tree.route(about), "/about");
/// ```
pub struct Tree {
    elements: Vec<Element>,
    ids: HashMap<String, ElementKey>,
    watchers: Observers<Watcher>,
    pub(crate) listeners: Observers<Listener>,
    structural: Vec<ElementKey>,
    pub(crate) binding: Option<Box<dyn NativeBinding>>,
}

impl core::fmt::Debug for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tree")
            .field("elements", &self.elements.len())
            .field("pending_structural_changes", &self.structural.len())
            .field("has_binding", &self.binding.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            ids: HashMap::new(),
            watchers: Observers::new(),
            listeners: Observers::new(),
            structural: Vec::new(),
            binding: None,
        }
    }

    /// Create a detached element. `name` is the tag the native surface renders.
    pub fn create(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<ElementKey, TreeError> {
        self.insert_element(id.into(), name.into(), ElementFlags::empty())
    }

    /// Create a document root. Subtrees connected to it are never detached.
    pub fn create_document(&mut self, id: impl Into<String>) -> Result<ElementKey, TreeError> {
        self.insert_element(id.into(), "document".into(), ElementFlags::DOCUMENT_ROOT)
    }

    fn insert_element(
        &mut self,
        id: String,
        name: String,
        flags: ElementFlags,
    ) -> Result<ElementKey, TreeError> {
        if self.ids.contains_key(&id) {
            return Err(TreeError::DuplicateId(id));
        }
        #[allow(
            clippy::cast_possible_truncation,
            reason = "ElementKey uses 32-bit indices."
        )]
        let key = ElementKey(self.elements.len() as u32);
        self.elements.push(Element::new(id.clone(), name, flags, key));
        self.ids.insert(id, key);
        Ok(key)
    }

    /// Install the native binding notified of structural and property changes.
    pub fn set_binding(&mut self, binding: Box<dyn NativeBinding>) {
        self.binding = Some(binding);
    }

    fn element(&self, key: ElementKey) -> Option<&Element> {
        self.elements.get(key.idx())
    }

    fn el(&self, key: ElementKey) -> &Element {
        self.elements.get(key.idx()).expect("dangling ElementKey")
    }

    fn el_mut(&mut self, key: ElementKey) -> &mut Element {
        self.elements.get_mut(key.idx()).expect("dangling ElementKey")
    }

    /// Returns `true` if `key` belongs to this tree.
    pub fn contains(&self, key: ElementKey) -> bool {
        key.idx() < self.elements.len()
    }

    /// Key of the element with the given id.
    pub fn lookup(&self, id: &str) -> Option<ElementKey> {
        self.ids.get(id).copied()
    }

    /// Id of an element.
    pub fn id_of(&self, key: ElementKey) -> Option<&str> {
        self.element(key).map(|e| e.id.as_str())
    }

    /// Tag name of an element.
    pub fn name_of(&self, key: ElementKey) -> Option<&str> {
        self.element(key).map(|e| e.name.as_str())
    }

    /// Flags of an element.
    pub fn flags(&self, key: ElementKey) -> Option<ElementFlags> {
        self.element(key).map(|e| e.flags)
    }

    /// Rendered parent of an element.
    pub fn parent_of(&self, key: ElementKey) -> Option<ElementKey> {
        self.element(key).and_then(|e| e.parent)
    }

    /// Rendered children of an element, in order.
    pub fn children_of(&self, key: ElementKey) -> &[ElementKey] {
        self.element(key).map_or(&[], |e| e.children.as_slice())
    }

    /// Rendered ancestors of an element, outermost first.
    pub fn path_of(&self, key: ElementKey) -> &[ElementKey] {
        self.element(key).map_or(&[], |e| e.path.as_slice())
    }

    /// Topmost element of the subtree `key` is connected to.
    pub fn subtree_root(&self, key: ElementKey) -> Option<ElementKey> {
        self.element(key).map(|e| e.subtree_root)
    }

    /// Document root `key` was last attached under.
    pub fn document_of(&self, key: ElementKey) -> Option<ElementKey> {
        self.element(key).and_then(|e| e.root)
    }

    /// Chain of (owner, view) pairs from the routing root down to `key`.
    pub fn view_access_path(&self, key: ElementKey) -> Option<&ViewAccessPath> {
        self.element(key).and_then(|e| e.view_access_path.as_ref())
    }

    /// Returns `true` if the subtree holding `key` is disconnected from its document.
    pub fn is_detached(&self, key: ElementKey) -> bool {
        let Some(e) = self.element(key) else {
            return true;
        };
        let top = self.el(e.subtree_root);
        top.parent.is_none() && Some(e.subtree_root) != e.root
    }

    fn is_ancestor_or_self(&self, ancestor: ElementKey, of: ElementKey) -> bool {
        let mut cur = Some(of);
        while let Some(k) = cur {
            if k == ancestor {
                return true;
            }
            cur = self.el(k).parent;
        }
        false
    }

    // --- attach / detach ---

    fn attach(&mut self, parent: ElementKey, child: ElementKey, slot: Slot) {
        let p = self.el(parent);
        let root = p.root;
        let subtree_root = p.subtree_root;
        let through = match &slot {
            Slot::Active if p.views.is_some() => p.active_view.clone(),
            Slot::Active => None,
            Slot::Inactive(view) => Some(view.clone()),
        };
        let mut vap = p.view_access_path.clone().unwrap_or_default();
        if let Some(view) = through {
            vap.push(ViewNode {
                owner: parent,
                view,
            });
        }
        let path = match slot {
            Slot::Active => {
                let mut path = p.path.clone();
                path.push(parent);
                Some(path)
            }
            Slot::Inactive(_) => None,
        };

        let c = self.el_mut(child);
        c.root = root;
        c.subtree_root = subtree_root;
        c.view_access_path = (!vap.is_empty()).then_some(vap);
        match path {
            Some(path) => {
                c.parent = Some(parent);
                c.path = path;
            }
            None => {
                c.parent = None;
                c.path.clear();
            }
        }
        if c.views.is_some() {
            self.structural.push(child);
        }
        self.attach_descendants(child);
    }

    fn attach_descendants(&mut self, key: ElementKey) {
        let e = self.el(key);
        let children = e.children.clone();
        let members: Vec<(String, Vec<ElementKey>)> = e
            .alternates()
            .iter()
            .map(|v| (v.name.clone(), v.members.clone()))
            .collect();
        for &child in &children {
            self.attach(key, child, Slot::Active);
        }
        // An active parameterized view keeps its template, whose members are
        // also the rendered children.
        for (view, keys) in members {
            for m in keys.into_iter().filter(|m| !children.contains(m)) {
                self.attach(key, m, Slot::Inactive(view.clone()));
            }
        }
    }

    /// Disconnect `key` from its parent, keeping its own subtree consistent.
    ///
    /// No-op for elements without a rendered parent. The parent's child list
    /// is left to the caller.
    fn detach(&mut self, key: ElementKey) {
        if self.el(key).parent.is_none() {
            return;
        }
        self.isolate(key);
    }

    fn isolate(&mut self, key: ElementKey) {
        let e = self.el_mut(key);
        e.parent = None;
        e.subtree_root = key;
        e.path.clear();
        // A detached view owner becomes the first owner of its members' paths.
        e.view_access_path = None;
        self.attach_descendants(key);
    }

    /// Remove `key` from its rendered parent's children and detach it.
    fn unlink(&mut self, key: ElementKey) {
        let Some(parent) = self.el(key).parent else {
            return;
        };
        self.el_mut(parent).children.retain(|&c| c != key);
        if let Some(b) = self.binding.as_mut() {
            b.remove_child(parent, key);
        }
        self.detach(key);
    }

    fn link_child(
        &mut self,
        parent: ElementKey,
        child: ElementKey,
        index: Option<usize>,
    ) -> Result<(), TreeError> {
        if !self.contains(parent) || !self.contains(child) {
            return Err(TreeError::UnknownElement);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(TreeError::Cycle);
        }
        self.unlink(child);
        self.attach(parent, child, Slot::Active);
        let children = &mut self.el_mut(parent).children;
        let index = index.map_or(children.len(), |i| i.min(children.len()));
        children.insert(index, child);
        if let Some(b) = self.binding.as_mut() {
            b.insert_child(parent, child, index);
        }
        Ok(())
    }

    // --- child operations ---

    /// Append `child` to the rendered children of `parent`.
    ///
    /// A child that already has a parent is moved.
    pub fn append_child(&mut self, parent: ElementKey, child: ElementKey) -> Result<(), TreeError> {
        self.link_child(parent, child, None)
    }

    /// Insert `child` before the first rendered child of `parent`.
    pub fn prepend_child(
        &mut self,
        parent: ElementKey,
        child: ElementKey,
    ) -> Result<(), TreeError> {
        self.link_child(parent, child, Some(0))
    }

    /// Insert `child` at `index` among the rendered children of `parent`.
    /// Indices past the end append.
    pub fn insert_child(
        &mut self,
        parent: ElementKey,
        child: ElementKey,
        index: usize,
    ) -> Result<(), TreeError> {
        self.link_child(parent, child, Some(index))
    }

    /// Put `new` in the place of `old` and detach `old`.
    pub fn replace_child(
        &mut self,
        parent: ElementKey,
        old: ElementKey,
        new: ElementKey,
    ) -> Result<(), TreeError> {
        if !self.contains(parent) || !self.contains(old) || !self.contains(new) {
            return Err(TreeError::UnknownElement);
        }
        if old == new {
            return Ok(());
        }
        let index = self
            .el(parent)
            .children
            .iter()
            .position(|&c| c == old)
            .ok_or(TreeError::NotAChild)?;
        if self.is_ancestor_or_self(new, parent) {
            return Err(TreeError::Cycle);
        }
        self.unlink(old);
        self.link_child(parent, new, Some(index))
    }

    /// Detach `child` from `parent`.
    pub fn remove_child(&mut self, parent: ElementKey, child: ElementKey) -> Result<(), TreeError> {
        if !self.contains(parent) || !self.contains(child) {
            return Err(TreeError::UnknownElement);
        }
        if self.el(child).parent != Some(parent) {
            return Err(TreeError::NotAChild);
        }
        self.unlink(child);
        Ok(())
    }

    /// Detach every rendered child of `parent`.
    pub fn remove_children(&mut self, parent: ElementKey) {
        let Some(e) = self.element(parent) else {
            return;
        };
        for child in e.children.clone() {
            self.unlink(child);
        }
    }

    // --- views ---

    /// Register `view` as an inactive view of `key`.
    ///
    /// An inactive view with the same name is replaced. Members are detached
    /// from any previous parent and attached as inactive members.
    pub fn add_view(&mut self, key: ElementKey, view: View) -> Result<(), TreeError> {
        if !self.contains(key) || !view.members.iter().all(|&m| self.contains(m)) {
            return Err(TreeError::UnknownElement);
        }
        let e = self.el(key);
        if e.active_view.as_deref() == Some(view.name()) {
            return Err(TreeError::ViewActive(view.name.clone()));
        }
        if view.is_parameterized()
            && let Some(other) = e
                .alternates()
                .iter()
                .find(|v| v.is_parameterized() && v.name() != view.name())
        {
            return Err(TreeError::DuplicateParameterizedView(other.name.clone()));
        }
        if e.alternates().iter().any(|v| v.name() == view.name()) {
            self.delete_view(key, view.name());
        }

        let first = self.el(key).views.is_none();
        let name = view.name.clone();
        let members = view.members.clone();
        self.el_mut(key).views.get_or_insert_with(Vec::new).push(view);
        for m in members {
            self.unlink(m);
            self.attach(key, m, Slot::Inactive(name.clone()));
        }
        if first {
            self.structural.push(key);
        }
        debug!(element = %self.el(key).id, view = %name, "view registered");
        Ok(())
    }

    /// Remove an inactive view, detaching its members. Returns the view.
    pub fn delete_view(&mut self, key: ElementKey, name: &str) -> Option<View> {
        let views = self.elements.get_mut(key.idx())?.views.as_mut()?;
        let pos = views.iter().position(|v| v.name() == name)?;
        let view = views.remove(pos);
        for &m in &view.members {
            self.isolate(m);
        }
        Some(view)
    }

    /// An inactive view of `key` by name.
    pub fn view(&self, key: ElementKey, name: &str) -> Option<&View> {
        self.views(key).iter().find(|v| v.name() == name)
    }

    /// Inactive views of `key`, in registration order.
    pub fn views(&self, key: ElementKey) -> &[View] {
        self.element(key).map_or(&[], Element::alternates)
    }

    /// Returns `true` once `key` has registered any view.
    pub fn owns_views(&self, key: ElementKey) -> bool {
        self.element(key).is_some_and(|e| e.views.is_some())
    }

    /// Name of the rendered view. For a bound parameter this is the parameter name.
    pub fn active_view(&self, key: ElementKey) -> Option<&str> {
        self.element(key).and_then(|e| e.active_view.as_deref())
    }

    /// Name of the parameterized view of `key`, if it has one.
    pub fn has_parameterized_view(&self, key: ElementKey) -> Option<&str> {
        self.views(key)
            .iter()
            .find(|v| v.is_parameterized())
            .map(View::name)
    }

    /// Install the predicate consulted by [`Tree::is_view_authorized`].
    pub fn set_view_guard(&mut self, key: ElementKey, guard: impl Fn(&str) -> bool + 'static) {
        if let Some(e) = self.elements.get_mut(key.idx()) {
            e.guard = Some(Rc::new(guard));
        }
    }

    /// Remove the authorization predicate of `key`.
    pub fn clear_view_guard(&mut self, key: ElementKey) {
        if let Some(e) = self.elements.get_mut(key.idx()) {
            e.guard = None;
        }
    }

    /// Returns `true` if `key` may render the view `name`. Elements without a
    /// guard authorize every view.
    pub fn is_view_authorized(&self, key: ElementKey, name: &str) -> bool {
        match self.element(key) {
            Some(e) => e.guard.as_ref().is_none_or(|g| g(name)),
            None => false,
        }
    }

    /// Render the view `name` on `key`.
    ///
    /// A concrete inactive view is swapped in directly. Otherwise the
    /// element's parameterized view is resolved with `name` as its raw value
    /// and the parameter name is recorded as the active view.
    pub fn activate_view(&mut self, key: ElementKey, name: &str) -> Result<(), ViewError> {
        let Some(e) = self.element(key) else {
            return Err(ViewError::UnknownElement);
        };
        let concrete = e
            .alternates()
            .iter()
            .position(|v| !v.is_parameterized() && v.name() == name);
        if let Some(pos) = concrete {
            let Some(views) = self.el_mut(key).views.as_mut() else {
                unreachable!("position was found among this element's views");
            };
            let view = views.remove(pos);
            self.swap_active(key, view.members, view.name, name);
            return Ok(());
        }
        if e.active_view.as_deref() == Some(name) && !is_parameter_name(name) {
            return Ok(());
        }
        let Some(param) = e.alternates().iter().find(|v| v.is_parameterized()) else {
            return Err(ViewError::NotFound {
                element: e.id.clone(),
                view: name.into(),
            });
        };
        if param.name().len() == PARAM_SENTINEL.len_utf8() {
            return Err(ViewError::EmptyParameterName);
        }
        let resolved = param.apply_parameter(name)?;
        let param_name = param.name.clone();
        self.swap_active(key, resolved.members, param_name, name);
        Ok(())
    }

    fn swap_active(
        &mut self,
        key: ElementKey,
        incoming: Vec<ElementKey>,
        active: String,
        label: &str,
    ) {
        let e = self.el_mut(key);
        let outgoing = e.active_view.take();
        let children = core::mem::take(&mut e.children);
        for &c in &children {
            if let Some(b) = self.binding.as_mut() {
                b.remove_child(key, c);
            }
            self.detach(c);
        }
        match outgoing {
            Some(old) if !is_parameter_name(&old) => {
                for &c in &children {
                    self.attach(key, c, Slot::Inactive(old.clone()));
                }
                self.el_mut(key)
                    .views
                    .get_or_insert_with(Vec::new)
                    .push(View::new(old, children));
            }
            Some(old) => {
                // The binding is discarded; template members return to the parameterized view.
                let template = self
                    .el(key)
                    .alternates()
                    .iter()
                    .find(|v| v.name() == old)
                    .map(|v| v.members.clone())
                    .unwrap_or_default();
                for c in children.into_iter().filter(|c| template.contains(c)) {
                    self.attach(key, c, Slot::Inactive(old.clone()));
                }
            }
            None => {}
        }

        debug!(element = %self.el(key).id, view = %active, "view activated");
        self.el_mut(key).active_view = Some(active);
        for m in incoming {
            self.unlink(m);
            self.attach(key, m, Slot::Active);
            let children = &mut self.el_mut(key).children;
            children.push(m);
            let index = children.len() - 1;
            if let Some(b) = self.binding.as_mut() {
                b.insert_child(key, m, index);
            }
        }
        self.set_synced(key, Field::ui("activeview"), Value::Str(label.into()));
    }

    // --- routes ---

    fn segment<'a>(&'a self, node: &'a ViewNode) -> &'a str {
        if is_parameter_name(&node.view)
            && let Some(Value::Str(bound)) = self
                .el(node.owner)
                .data
                .get(&Field::navigation(node.view.clone()))
        {
            return bound;
        }
        &node.view
    }

    /// Route that renders `key`.
    ///
    /// Empty for detached elements and `/` for elements outside any view.
    /// Parameterized segments render the bound value when one exists.
    pub fn route(&self, key: ElementKey) -> String {
        if !self.contains(key) || self.is_detached(key) {
            return String::new();
        }
        let Some(vap) = self.el(key).view_access_path.as_ref() else {
            return String::from("/");
        };
        let mut route = String::new();
        for (i, node) in vap.nodes().iter().enumerate() {
            route.push('/');
            if i > 0 {
                route.push_str(&self.el(node.owner).id);
                route.push('/');
            }
            route.push_str(self.segment(node));
        }
        route
    }

    /// Route that renders the view `view` of `key`.
    pub fn route_to_view(&self, key: ElementKey, view: &str) -> String {
        if !self.contains(key) || self.is_detached(key) {
            return String::new();
        }
        let mut route = String::new();
        if self.el(key).view_access_path.is_some() {
            route.push_str(&self.route(key));
            route.push('/');
            route.push_str(&self.el(key).id);
        }
        route.push('/');
        route.push_str(view);
        route
    }

    // --- data store ---

    /// Current value of `field` on `key`.
    pub fn get(&self, key: ElementKey, field: &Field) -> Option<&Value> {
        self.element(key).and_then(|e| e.data.get(field))
    }

    /// Store `value` and notify watchers of `(key, field)` synchronously.
    ///
    /// Writes to a field whose watchers are currently running are queued and
    /// delivered after the outermost delivery completes.
    pub fn set(&mut self, key: ElementKey, field: Field, value: Value) {
        let Some(e) = self.elements.get_mut(key.idx()) else {
            return;
        };
        e.data.insert(field.clone(), value.clone());
        self.notify(Mutation {
            source: key,
            field,
            value,
        });
    }

    /// [`Tree::set`], also forwarding the value to the native binding.
    pub fn set_synced(&mut self, key: ElementKey, field: Field, value: Value) {
        if !self.contains(key) {
            return;
        }
        if let Some(b) = self.binding.as_mut() {
            b.set_property(key, &field, &value);
        }
        self.set(key, field, value);
    }

    /// Remove a stored value without notifying.
    pub fn clear(&mut self, key: ElementKey, field: &Field) -> Option<Value> {
        self.elements.get_mut(key.idx())?.data.remove(field)
    }

    /// Run `handler` on every change of `field` on `source`, on behalf of `watcher`.
    pub fn watch(
        &mut self,
        watcher: ElementKey,
        source: ElementKey,
        field: Field,
        handler: impl FnMut(&mut Self, &Mutation) -> Outcome + 'static,
    ) -> SubscriptionId {
        self.watchers
            .subscribe(Topic::new(source, field), Some(watcher), Box::new(handler))
    }

    /// Remove every handler `watcher` registered on `(source, field)`.
    pub fn unwatch(&mut self, watcher: ElementKey, source: ElementKey, field: Field) {
        self.watchers
            .unsubscribe_owner(&Topic::new(source, field), watcher);
    }

    /// Remove one watch subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.watchers.unsubscribe(id)
    }

    fn notify(&mut self, mutation: Mutation) {
        let topic = Topic::new(mutation.source, mutation.field.clone());
        if self.watchers.is_busy(&topic) {
            trace!(field = %mutation.field.name, "deferring mutation for busy topic");
            self.watchers.defer(mutation);
            return;
        }
        if self.watchers.is_empty(&topic) {
            return;
        }
        self.watchers.enter();
        let mut taken = self.watchers.begin(&topic);
        for watcher in &mut taken {
            if self.watchers.is_cancelled(&topic, watcher) {
                continue;
            }
            if (watcher.handler)(self, &mutation) == Outcome::Stop {
                break;
            }
        }
        self.watchers.end(topic, taken);
        if self.watchers.exit() {
            while let Some(next) = self.watchers.pop_deferred() {
                self.notify(next);
            }
        }
    }

    /// Record the host's mount signal for `key`.
    pub fn mount(&mut self, key: ElementKey) {
        self.set(key, Field::event("mounted"), Value::Bool(true));
    }

    /// Returns `true` once [`Tree::mount`] ran for `key`.
    pub fn is_mounted(&self, key: ElementKey) -> bool {
        self.get(key, &Field::event("mounted")) == Some(&Value::Bool(true))
    }

    /// View-owning elements registered or re-attached since the last call,
    /// oldest first.
    pub fn take_structural_changes(&mut self) -> Vec<ElementKey> {
        core::mem::take(&mut self.structural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    fn nav_app() -> (Tree, ElementKey, ElementKey, ElementKey) {
        let mut tree = Tree::new();
        let doc = tree.create_document("app").unwrap();
        let home = tree.create("home-page", "div").unwrap();
        let about = tree.create("about-page", "div").unwrap();
        tree.add_view(doc, View::new("home", [home])).unwrap();
        tree.add_view(doc, View::new("about", [about])).unwrap();
        (tree, doc, home, about)
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut tree = Tree::new();
        tree.create("a", "div").unwrap();
        assert_eq!(
            tree.create("a", "span"),
            Err(TreeError::DuplicateId("a".into()))
        );
    }

    #[test]
    fn fresh_elements_are_detached_and_unroutable() {
        let mut tree = Tree::new();
        let doc = tree.create_document("app").unwrap();
        let loose = tree.create("loose", "div").unwrap();
        assert!(!tree.is_detached(doc), "document roots are never detached");
        assert!(tree.is_detached(loose));
        assert_eq!(tree.route(loose), "");
        assert_eq!(tree.route(doc), "/");
    }

    #[test]
    fn inactive_members_are_routable_but_not_rendered() {
        let (tree, doc, home, about) = nav_app();
        assert!(tree.children_of(doc).is_empty());
        assert_eq!(tree.parent_of(home), None);
        assert!(!tree.is_detached(home), "inactive members stay connected");
        assert_eq!(tree.route(home), "/home");
        assert_eq!(tree.route(about), "/about");
    }

    #[test]
    fn activation_swaps_children_and_refiles_outgoing_view() {
        let (mut tree, doc, home, about) = nav_app();
        tree.activate_view(doc, "home").unwrap();
        assert_eq!(tree.children_of(doc), &[home]);
        assert_eq!(tree.active_view(doc), Some("home"));
        assert!(tree.view(doc, "home").is_none(), "active view leaves the alternates");
        assert_eq!(tree.path_of(home), &[doc]);

        tree.activate_view(doc, "about").unwrap();
        assert_eq!(tree.children_of(doc), &[about]);
        assert_eq!(tree.view(doc, "home").unwrap().members(), &[home]);
        assert_eq!(tree.parent_of(home), None);
        assert_eq!(tree.route(home), "/home");
        assert_eq!(
            tree.get(doc, &Field::ui("activeview")),
            Some(&Value::from("about"))
        );
    }

    #[test]
    fn reactivating_active_view_is_noop() {
        let (mut tree, doc, home, _) = nav_app();
        tree.activate_view(doc, "home").unwrap();
        tree.activate_view(doc, "home").unwrap();
        assert_eq!(tree.children_of(doc), &[home]);
    }

    #[test]
    fn unknown_view_is_not_found() {
        let (mut tree, doc, _, _) = nav_app();
        assert_eq!(
            tree.activate_view(doc, "missing"),
            Err(ViewError::NotFound {
                element: "app".into(),
                view: "missing".into()
            })
        );
    }

    #[test]
    fn adding_view_named_like_active_view_is_rejected() {
        let (mut tree, doc, _, _) = nav_app();
        tree.activate_view(doc, "home").unwrap();
        let other = tree.create("other", "div").unwrap();
        assert_eq!(
            tree.add_view(doc, View::new("home", [other])),
            Err(TreeError::ViewActive("home".into()))
        );
    }

    #[test]
    fn only_one_parameterized_view_per_element() {
        let mut tree = Tree::new();
        let doc = tree.create_document("app").unwrap();
        tree.add_view(
            doc,
            View::parameterized("id", |v, t| Ok(View::new(v, t.members().to_vec())), []),
        )
        .unwrap();
        let err = tree
            .add_view(doc, View::parameterized("slug", |v, _| Ok(View::new(v, [])), []))
            .unwrap_err();
        assert_eq!(err, TreeError::DuplicateParameterizedView(":id".into()));
        assert_eq!(tree.has_parameterized_view(doc), Some(":id"));
    }

    #[test]
    fn parameterized_activation_records_parameter_name() {
        let mut tree = Tree::new();
        let doc = tree.create_document("app").unwrap();
        let page = tree.create("user-page", "div").unwrap();
        tree.add_view(
            doc,
            View::parameterized(
                "id",
                |value, template| {
                    if value.parse::<u32>().is_ok() {
                        Ok(View::new(value, template.members().to_vec()))
                    } else {
                        Err(ViewError::rejected(template, value))
                    }
                },
                [page],
            ),
        )
        .unwrap();

        tree.activate_view(doc, "42").unwrap();
        assert_eq!(tree.active_view(doc), Some(":id"));
        assert_eq!(tree.children_of(doc), &[page]);
        assert_eq!(
            tree.get(doc, &Field::ui("activeview")),
            Some(&Value::from("42"))
        );

        // Changing the value keeps the element parameterized.
        tree.activate_view(doc, "7").unwrap();
        assert_eq!(tree.active_view(doc), Some(":id"));
        assert_eq!(tree.views(doc).len(), 1, "parameter bindings are not refiled");

        assert_eq!(
            tree.activate_view(doc, "abc"),
            Err(ViewError::Rejected {
                view: ":id".into(),
                value: "abc".into()
            })
        );
    }

    #[test]
    fn parameter_members_stay_rendered_when_an_ancestor_switches_back() {
        let mut tree = Tree::new();
        let doc = tree.create_document("app").unwrap();
        let shell = tree.create("shell", "div").unwrap();
        let other = tree.create("other", "div").unwrap();
        let page = tree.create("page", "div").unwrap();
        tree.add_view(doc, View::new("main", [shell])).unwrap();
        tree.add_view(doc, View::new("alt", [other])).unwrap();
        tree.add_view(
            shell,
            View::parameterized("id", |v, t| Ok(View::new(v, t.members().to_vec())), [page]),
        )
        .unwrap();

        tree.activate_view(doc, "main").unwrap();
        tree.activate_view(shell, "42").unwrap();
        assert_eq!(tree.path_of(page), &[doc, shell]);

        tree.activate_view(doc, "alt").unwrap();
        assert_eq!(tree.parent_of(page), Some(shell), "still rendered inside its owner");
        tree.activate_view(doc, "main").unwrap();
        assert_eq!(tree.path_of(page), &[doc, shell]);
        assert_eq!(tree.parent_of(page), Some(shell));
        assert_eq!(tree.children_of(shell), &[page]);
        assert_eq!(tree.route(page), "/main/shell/:id");
    }

    #[test]
    fn sentinel_only_parameter_name_fails() {
        let mut tree = Tree::new();
        let doc = tree.create_document("app").unwrap();
        tree.add_view(doc, View::new(":", [])).unwrap();
        assert_eq!(tree.activate_view(doc, "x"), Err(ViewError::EmptyParameterName));
    }

    #[test]
    fn nested_routes_include_owner_ids_and_bound_parameters() {
        let mut tree = Tree::new();
        let doc = tree.create_document("app").unwrap();
        let users = tree.create("users", "div").unwrap();
        let profile = tree.create("profile", "div").unwrap();
        tree.add_view(doc, View::new("users", [users])).unwrap();
        tree.add_view(
            users,
            View::parameterized("id", |v, t| Ok(View::new(v, t.members().to_vec())), [profile]),
        )
        .unwrap();

        assert_eq!(tree.route(profile), "/users/users/:id");
        tree.set(users, Field::navigation(":id"), Value::from("42"));
        assert_eq!(tree.route(profile), "/users/users/42");
        assert_eq!(tree.route_to_view(users, "edit"), "/users/users/edit");
        assert_eq!(tree.route_to_view(doc, "users"), "/users");
    }

    #[test]
    fn detach_and_reattach_recomputes_route() {
        let mut tree = Tree::new();
        let doc = tree.create_document("app").unwrap();
        let a = tree.create("a", "div").unwrap();
        let b = tree.create("b", "div").unwrap();
        let leaf = tree.create("leaf", "div").unwrap();
        tree.add_view(doc, View::new("a", [a])).unwrap();
        tree.add_view(doc, View::new("b", [b])).unwrap();
        tree.append_child(a, leaf).unwrap();
        assert_eq!(tree.route(leaf), "/a");

        tree.remove_child(a, leaf).unwrap();
        assert!(tree.is_detached(leaf));
        assert_eq!(tree.route(leaf), "");

        tree.append_child(b, leaf).unwrap();
        assert_eq!(tree.route(leaf), "/b");
        assert_eq!(tree.view_access_path(leaf).unwrap().len(), 1);
    }

    #[test]
    fn detached_view_owner_keeps_its_own_node() {
        let mut tree = Tree::new();
        let doc = tree.create_document("app").unwrap();
        let shell = tree.create("shell", "div").unwrap();
        let panel = tree.create("panel", "div").unwrap();
        let inner = tree.create("inner", "div").unwrap();
        tree.add_view(doc, View::new("main", [shell])).unwrap();
        tree.activate_view(doc, "main").unwrap();
        tree.append_child(shell, panel).unwrap();
        tree.add_view(panel, View::new("tab", [inner])).unwrap();
        assert_eq!(tree.view_access_path(panel).unwrap().len(), 1);
        assert_eq!(tree.view_access_path(inner).unwrap().len(), 2);

        tree.remove_child(shell, panel).unwrap();
        assert!(tree.view_access_path(panel).is_none(), "detached owner starts its own paths");
        let vap = tree.view_access_path(inner).unwrap();
        assert_eq!(vap.len(), 1);
        assert_eq!(vap.first().unwrap().owner, panel);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut tree = Tree::new();
        let a = tree.create("a", "div").unwrap();
        let b = tree.create("b", "div").unwrap();
        tree.append_child(a, b).unwrap();
        assert_eq!(tree.append_child(b, a), Err(TreeError::Cycle));
        assert_eq!(tree.append_child(a, a), Err(TreeError::Cycle));
    }

    #[test]
    fn child_operations_keep_order() {
        let mut tree = Tree::new();
        let p = tree.create("p", "div").unwrap();
        let a = tree.create("a", "div").unwrap();
        let b = tree.create("b", "div").unwrap();
        let c = tree.create("c", "div").unwrap();
        let d = tree.create("d", "div").unwrap();
        tree.append_child(p, a).unwrap();
        tree.prepend_child(p, b).unwrap();
        tree.insert_child(p, c, 1).unwrap();
        assert_eq!(tree.children_of(p), &[b, c, a]);
        tree.replace_child(p, c, d).unwrap();
        assert_eq!(tree.children_of(p), &[b, d, a]);
        assert_eq!(tree.parent_of(c), None);
        assert_eq!(tree.remove_child(p, c), Err(TreeError::NotAChild));
        tree.remove_children(p);
        assert!(tree.children_of(p).is_empty());
    }

    #[test]
    fn moving_a_child_detaches_it_from_previous_parent() {
        let mut tree = Tree::new();
        let p = tree.create("p", "div").unwrap();
        let q = tree.create("q", "div").unwrap();
        let a = tree.create("a", "div").unwrap();
        tree.append_child(p, a).unwrap();
        tree.append_child(q, a).unwrap();
        assert!(tree.children_of(p).is_empty());
        assert_eq!(tree.parent_of(a), Some(q));
    }

    #[test]
    fn structural_changes_report_view_owners() {
        let mut tree = Tree::new();
        let doc = tree.create_document("app").unwrap();
        let owner = tree.create("owner", "div").unwrap();
        let page = tree.create("page", "div").unwrap();
        tree.add_view(owner, View::new("x", [page])).unwrap();
        assert_eq!(tree.take_structural_changes(), vec![owner]);
        tree.add_view(doc, View::new("main", [owner])).unwrap();
        assert_eq!(tree.take_structural_changes(), vec![owner, doc]);
        assert!(tree.take_structural_changes().is_empty());
    }

    #[test]
    fn delete_view_detaches_members() {
        let (mut tree, doc, home, _) = nav_app();
        let view = tree.delete_view(doc, "home").unwrap();
        assert_eq!(view.members(), &[home]);
        assert!(tree.is_detached(home));
        assert!(tree.delete_view(doc, "home").is_none());
    }

    #[test]
    fn guard_controls_authorization() {
        let (mut tree, doc, _, _) = nav_app();
        assert!(tree.is_view_authorized(doc, "about"), "no guard authorizes everything");
        tree.set_view_guard(doc, |name| name != "about");
        assert!(!tree.is_view_authorized(doc, "about"));
        assert!(tree.is_view_authorized(doc, "home"));
        tree.clear_view_guard(doc);
        assert!(tree.is_view_authorized(doc, "about"));
    }

    #[test]
    fn watchers_run_in_subscription_order_and_stop() {
        let mut tree = Tree::new();
        let a = tree.create("a", "div").unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (i, outcome) in [(1, Outcome::Continue), (2, Outcome::Stop), (3, Outcome::Continue)] {
            let log = log.clone();
            tree.watch(a, a, Field::data("x"), move |_, m| {
                log.borrow_mut().push((i, m.value.clone()));
                outcome
            });
        }
        tree.set(a, Field::data("x"), Value::Int(5));
        assert_eq!(*log.borrow(), vec![(1, Value::Int(5)), (2, Value::Int(5))]);
    }

    #[test]
    fn reentrant_writes_are_delivered_after_current_delivery() {
        let mut tree = Tree::new();
        let a = tree.create("a", "div").unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let log = log.clone();
            tree.watch(a, a, Field::data("n"), move |tree, m| {
                let Value::Int(n) = m.value else {
                    return Outcome::Continue;
                };
                log.borrow_mut().push(("first", n));
                if n < 3 {
                    tree.set(m.source, Field::data("n"), Value::Int(n + 1));
                }
                Outcome::Continue
            });
        }
        {
            let log = log.clone();
            tree.watch(a, a, Field::data("n"), move |_, m| {
                if let Value::Int(n) = m.value {
                    log.borrow_mut().push(("second", n));
                }
                Outcome::Continue
            });
        }
        tree.set(a, Field::data("n"), Value::Int(1));
        assert_eq!(
            *log.borrow(),
            vec![
                ("first", 1),
                ("second", 1),
                ("first", 2),
                ("second", 2),
                ("first", 3),
                ("second", 3)
            ]
        );
        assert_eq!(tree.get(a, &Field::data("n")), Some(&Value::Int(3)));
    }

    #[test]
    fn unwatch_removes_watchers_of_owner() {
        let mut tree = Tree::new();
        let a = tree.create("a", "div").unwrap();
        let b = tree.create("b", "div").unwrap();
        let hits = Rc::new(RefCell::new(0));
        for owner in [a, b] {
            let hits = hits.clone();
            tree.watch(owner, a, Field::data("x"), move |_, _| {
                *hits.borrow_mut() += 1;
                Outcome::Continue
            });
        }
        tree.unwatch(a, a, Field::data("x"));
        tree.set(a, Field::data("x"), Value::Bool(true));
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn mount_sets_event_field() {
        let mut tree = Tree::new();
        let a = tree.create("a", "div").unwrap();
        assert!(!tree.is_mounted(a));
        tree.mount(a);
        assert!(tree.is_mounted(a));
    }

    #[test]
    fn binding_sees_structure_and_active_view() {
        struct Recorder(Rc<RefCell<Vec<String>>>);
        impl NativeBinding for Recorder {
            fn insert_child(&mut self, _: ElementKey, child: ElementKey, index: usize) {
                self.0.borrow_mut().push(alloc::format!("insert {} at {index}", child.0));
            }
            fn remove_child(&mut self, _: ElementKey, child: ElementKey) {
                self.0.borrow_mut().push(alloc::format!("remove {}", child.0));
            }
            fn set_property(&mut self, _: ElementKey, field: &Field, value: &Value) {
                self.0
                    .borrow_mut()
                    .push(alloc::format!("{}={:?}", field.name, value.as_str()));
            }
        }

        let (mut tree, doc, home, about) = nav_app();
        let log = Rc::new(RefCell::new(Vec::new()));
        tree.set_binding(Box::new(Recorder(log.clone())));
        tree.activate_view(doc, "home").unwrap();
        tree.activate_view(doc, "about").unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                alloc::format!("insert {} at 0", home.0),
                String::from("activeview=Some(\"home\")"),
                alloc::format!("remove {}", home.0),
                alloc::format!("insert {} at 0", about.0),
                String::from("activeview=Some(\"about\")"),
            ]
        );
    }
}
