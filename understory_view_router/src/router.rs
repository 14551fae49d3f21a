// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The router: owns the tree, keeps the trie in sync and reacts to navigation
//! signals.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use tracing::{debug, error, warn};
use understory_view_tree::{
    Dispatch, ElementKey, Event, Field, Mutation, Observers, Outcome, SubscriptionId, Topic, Tree,
    TreeError, Value, View,
};

use crate::config::{
    APP_FAILURE, CURRENT_ROUTE, NOT_FOUND, ROUTE_CHANGE_REQUEST, RouterConfig, UNAUTHORIZED,
    navigation,
};
use crate::error::{MatchError, NavigationError, RouterError};
use crate::history::NavHistory;
use crate::link::{Link, activated};
use crate::route::{base_path, normalize};
use crate::trie::{ActivationPlan, RouteTrie};

/// Kind of the native event carrying a new route.
pub const ROUTE_CHANGE_EVENT: &str = "routechange";

/// Handler of a router-level navigation signal.
pub type SignalHandler = Box<dyn FnMut(&mut Router, &Mutation) -> Outcome>;

/// Turns route strings into view activations over an owned [`Tree`].
///
/// Navigation is signal driven: [`Router::go_to`] records the route in
/// history and raises `navigation/routechangerequest` on the root. Once the
/// router [serves](Router::listen_and_serve), it reacts to that signal by
/// matching the route and running the resulting activations. Failures raise
/// `navigation/notfound`, `navigation/unauthorized` or
/// `navigation/appfailure` (see [`FailurePolicy`](crate::FailurePolicy)),
/// which the `on_*` fallbacks turn into a navigation toward their own view.
///
/// ## Example
///
/// ```rust
/// use understory_view_router::Router;
/// use understory_view_tree::{Tree, View};
///
/// let mut tree = Tree::new();
/// let doc = tree.create_document("app").unwrap();
/// let home = tree.create("home-page", "div").unwrap();
/// let lost = tree.create("lost-page", "div").unwrap();
/// tree.add_view(doc, View::new("home", [home])).unwrap();
///
/// let mut router = Router::new("https://example.com/", tree, doc);
/// router.on_notfound(View::new("notfound", [lost])).unwrap();
/// router.listen_and_serve().unwrap();
///
/// router.go_to("/home");
/// assert_eq!(router.current_route(), Some("/home"));
/// router.go_to("/nowhere");
/// assert_eq!(router.current_route(), Some("/notfound"));
/// ```
pub struct Router {
    tree: Tree,
    root: ElementKey,
    config: RouterConfig,
    base: String,
    trie: RouteTrie,
    history: NavHistory,
    links: Vec<Link>,
    link_index: HashMap<(ElementKey, String), usize>,
    signals: Observers<SignalHandler>,
    serving: bool,
    // Set while a fallback navigation is in flight.
    recovering: bool,
}

impl core::fmt::Debug for Router {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Router")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("base", &self.base)
            .field("trie", &self.trie.len())
            .field("history", &self.history)
            .field("links", &self.links.len())
            .field("serving", &self.serving)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Create a router for an app served under `base_url`, routing from `root`.
    ///
    /// `root` should be a document root (see [`Tree::create_document`]); routes
    /// of elements in detached subtrees are empty.
    pub fn new(base_url: &str, tree: Tree, root: ElementKey) -> Self {
        Self::with_config(RouterConfig::new(base_url), tree, root)
    }

    /// Create a router with explicit configuration.
    pub fn with_config(config: RouterConfig, mut tree: Tree, root: ElementKey) -> Self {
        let base = base_path(config.base_url());
        tree.set(
            root,
            Field::internals("baseurl"),
            Value::Str(config.base_url().into()),
        );
        let mut history = NavHistory::new();
        history.push("/");
        let mut router = Self {
            tree,
            root,
            config,
            base,
            trie: RouteTrie::new(root),
            history,
            links: Vec::new(),
            link_index: HashMap::new(),
            signals: Observers::new(),
            serving: false,
            recovering: false,
        };
        router.sync();
        router
    }

    /// The routed tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Mutable access to the routed tree.
    ///
    /// Structural changes made here are picked up before the next match.
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// Give the tree back.
    pub fn into_tree(self) -> Tree {
        self.tree
    }

    /// Routing root.
    pub fn root(&self) -> ElementKey {
        self.root
    }

    /// Configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Path component of the base URL, without trailing `/`.
    pub fn base_path(&self) -> &str {
        &self.base
    }

    /// Navigation history.
    pub fn history(&self) -> &NavHistory {
        &self.history
    }

    /// Route trie.
    pub fn trie(&self) -> &RouteTrie {
        &self.trie
    }

    /// Last route that was fully activated.
    pub fn current_route(&self) -> Option<&str> {
        self.tree
            .get(self.root, &navigation(CURRENT_ROUTE))
            .and_then(Value::as_str)
    }

    /// Returns `true` after [`Router::listen_and_serve`].
    pub fn is_serving(&self) -> bool {
        self.serving
    }

    /// Insert pending view owners into the trie. Returns how many changed it.
    pub fn sync(&mut self) -> usize {
        let mut changed = 0;
        for key in self.tree.take_structural_changes() {
            if self.trie.insert(&self.tree, key) {
                changed += 1;
            }
        }
        changed
    }

    fn normalized(&self, route: &str) -> String {
        normalize(route, &self.base, self.config.keeps_trailing_slash())
    }

    /// Match `route` without activating anything.
    ///
    /// Parameter values are still bound on their owners.
    pub fn match_route(&mut self, route: &str) -> Result<ActivationPlan, MatchError> {
        let route = self.normalized(route);
        self.sync();
        self.trie.match_route(&mut self.tree, &route)
    }

    /// Match and activate `route` directly, bypassing history and signals.
    pub fn navigate(&mut self, route: &str) -> Result<(), NavigationError> {
        let route = self.normalized(route);
        self.sync();
        let plan = self.trie.match_route(&mut self.tree, &route)?;
        plan.run(&mut self.tree)?;
        self.sync();
        debug!(route = %route, "navigated");
        self.tree.set(self.root, navigation(CURRENT_ROUTE), Value::Str(route));
        Ok(())
    }

    /// Navigate to `route`, recording it in history.
    pub fn go_to(&mut self, route: &str) {
        self.history.push(route);
        self.request(route);
    }

    /// Navigate to the previous history entry, if any.
    pub fn go_back(&mut self) {
        if let Some(route) = self.history.back().map(String::from) {
            self.request(&route);
        }
    }

    /// Navigate to the next history entry, if any.
    pub fn go_forward(&mut self) {
        if let Some(route) = self.history.forward().map(String::from) {
            self.request(&route);
        }
    }

    /// Follow `link`.
    pub fn follow(&mut self, link: &Link) {
        let route = link.uri(&self.tree);
        self.go_to(&route);
    }

    /// Absolute path of `link`, base path included.
    pub fn href(&self, link: &Link) -> String {
        let mut href = self.base.clone();
        href.push_str(&link.uri(&self.tree));
        href
    }

    fn request(&mut self, route: &str) {
        self.signal(ROUTE_CHANGE_REQUEST, Value::Str(route.into()));
    }

    /// Store `value` in `navigation/<name>` on the root and notify handlers.
    fn signal(&mut self, name: &'static str, value: Value) {
        self.tree.set(self.root, navigation(name), value.clone());
        self.notify(Mutation {
            source: self.root,
            field: navigation(name),
            value,
        });
    }

    fn notify(&mut self, mutation: Mutation) {
        let topic = Topic::new(mutation.source, mutation.field.clone());
        if self.signals.is_busy(&topic) {
            self.signals.defer(mutation);
            return;
        }
        self.signals.enter();
        let mut taken = self.signals.begin(&topic);
        let mut outcome = Outcome::Continue;
        for entry in &mut taken {
            if self.signals.is_cancelled(&topic, entry) {
                continue;
            }
            if (entry.handler)(self, &mutation) == Outcome::Stop {
                outcome = Outcome::Stop;
                break;
            }
        }
        self.signals.end(topic, taken);
        if outcome == Outcome::Continue
            && self.serving
            && mutation.field == navigation(ROUTE_CHANGE_REQUEST)
        {
            self.react(&mutation.value);
        }
        if self.signals.exit() {
            while let Some(next) = self.signals.pop_deferred() {
                self.notify(next);
            }
        }
    }

    fn react(&mut self, value: &Value) {
        let Some(route) = value.as_str() else {
            error!(?value, "route change request without a route");
            self.signal(APP_FAILURE, Value::Str("malformed route change request".into()));
            return;
        };
        match self.navigate(route) {
            Ok(()) => self.recovering = false,
            Err(err) if self.recovering => {
                self.recovering = false;
                error!(route, %err, "fallback navigation failed");
            }
            Err(err) => {
                let signal = self.config.policy().signal_for(&err);
                warn!(route, %err, signal, "navigation failed");
                self.signal(signal, Value::Str(route.into()));
            }
        }
    }

    fn subscribe(
        &mut self,
        name: &'static str,
        handler: impl FnMut(&mut Self, &Mutation) -> Outcome + 'static,
    ) -> SubscriptionId {
        self.signals.subscribe(
            Topic::new(self.root, navigation(name)),
            None,
            Box::new(handler),
        )
    }

    /// Run `handler` on every route change request, before the router reacts.
    /// Returning [`Outcome::Stop`] cancels the request.
    pub fn on_route_change_request(
        &mut self,
        handler: impl FnMut(&mut Self, &Mutation) -> Outcome + 'static,
    ) -> SubscriptionId {
        self.subscribe(ROUTE_CHANGE_REQUEST, handler)
    }

    /// Remove a handler added with [`Router::on_route_change_request`].
    pub fn remove_handler(&mut self, id: SubscriptionId) -> bool {
        self.signals.unsubscribe(id)
    }

    /// Show `view` on the root when a route does not match.
    pub fn on_notfound(&mut self, view: View) -> Result<(), RouterError> {
        self.fallback(NOT_FOUND, view)
    }

    /// Show `view` on the root when a guard rejects a route.
    pub fn on_unauthorized(&mut self, view: View) -> Result<(), RouterError> {
        self.fallback(UNAUTHORIZED, view)
    }

    /// Show `view` on the root when routing fails internally.
    pub fn on_appfailure(&mut self, view: View) -> Result<(), RouterError> {
        self.fallback(APP_FAILURE, view)
    }

    fn fallback(&mut self, signal: &'static str, view: View) -> Result<(), RouterError> {
        let name = String::from(view.name());
        self.tree.add_view(self.root, view)?;
        self.sync();
        self.subscribe(signal, move |router, _| {
            let route = router.tree.route_to_view(router.root, &name);
            router.recovering = true;
            router.go_to(&route);
            // A hook may have cancelled the request before `react` ran.
            router.recovering = false;
            Outcome::Continue
        });
        Ok(())
    }

    /// Link toward `view` of `target`. Links are memoized per (target, view).
    pub fn new_link(&mut self, target: ElementKey, view: &str) -> Result<Link, RouterError> {
        if let Some(&i) = self.link_index.get(&(target, String::from(view))) {
            return Ok(self.links[i].clone());
        }
        let target_id = self
            .tree
            .id_of(target)
            .map(String::from)
            .ok_or(TreeError::UnknownElement)?;
        let raw = self.tree.create(alloc::format!("{target_id}/{view}"), "link")?;
        self.tree.watch(raw, target, Field::event("mounted"), move |tree, m| {
            if m.value == Value::Bool(true) {
                tree.set(raw, activated(), Value::Bool(true));
            }
            Outcome::Continue
        });
        if self.tree.is_mounted(target) {
            self.tree.set(raw, activated(), Value::Bool(true));
        }
        let link = Link {
            raw,
            target,
            view: view.into(),
        };
        self.link_index.insert((target, view.into()), self.links.len());
        self.links.push(link.clone());
        Ok(link)
    }

    /// Every link created so far, in creation order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Start reacting to route change requests.
    ///
    /// Fails if a link's target never reported a mount, which means the link
    /// points at an element that is not rendered anywhere.
    pub fn listen_and_serve(&mut self) -> Result<(), RouterError> {
        if let Some(link) = self.links.iter().find(|l| !l.is_activated(&self.tree)) {
            let id = self.tree.id_of(link.raw).unwrap_or_default();
            return Err(RouterError::InactiveLink(id.into()));
        }
        if !self.serving {
            self.tree.listen_native(self.root, ROUTE_CHANGE_EVENT);
            self.serving = true;
            debug!(base = %self.base, "router serving");
        }
        Ok(())
    }

    /// A native route change event for `route`.
    pub fn route_change_event(route: &str) -> Event {
        Event::new(ROUTE_CHANGE_EVENT, false, Value::Str(route.into()))
    }

    /// Deliver a native route change event.
    ///
    /// The event is dispatched at the root first; unless a listener stops it,
    /// its route is requested without touching history. Returns where
    /// dispatch stopped.
    pub fn dispatch_route_change(&mut self, mut event: Event) -> Option<Dispatch> {
        if let Some(stop) = self.tree.dispatch_event(self.root, &mut event) {
            return Some(stop);
        }
        match event.payload {
            Value::Str(route) => self.request(&route),
            other => {
                error!(payload = ?other, "route change event without a route");
                self.signal(APP_FAILURE, Value::Str("malformed route change event".into()));
            }
        }
        None
    }
}
