// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small app routed with `understory_view_router`.
//!
//! This demo shows how to:
//! - declare views (plain and parameterized) on a view tree,
//! - install fallbacks and links, then start serving,
//! - drive navigation through `go_to`, history and native route change events,
//! - mirror structure into a surface through a `NativeBinding`.
//!
//! Run:
//! - `cargo run -p understory_view_demos`

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use understory_view_router::{Router, RouterConfig};
use understory_view_tree::{ElementKey, Field, NativeBinding, Outcome, Tree, Value, View, ViewError};

/// Prints every structural change using element ids.
struct PrintBinding {
    names: Rc<RefCell<HashMap<ElementKey, String>>>,
}

impl PrintBinding {
    fn name(&self, key: ElementKey) -> String {
        self.names
            .borrow()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| format!("{key:?}"))
    }
}

impl NativeBinding for PrintBinding {
    fn insert_child(&mut self, parent: ElementKey, child: ElementKey, index: usize) {
        println!("  surface: insert {} into {} at {index}", self.name(child), self.name(parent));
    }

    fn remove_child(&mut self, parent: ElementKey, child: ElementKey) {
        println!("  surface: remove {} from {}", self.name(child), self.name(parent));
    }

    fn set_property(&mut self, element: ElementKey, field: &Field, value: &Value) {
        println!("  surface: {}.{} = {value:?}", self.name(element), field.name);
    }

    fn listen(&mut self, element: ElementKey, kind: &str) {
        println!("  surface: forwarding `{kind}` events to {}", self.name(element));
    }
}

fn main() {
    let mut tree = Tree::new();
    let names = Rc::new(RefCell::new(HashMap::new()));
    let create = |tree: &mut Tree, id: &str, tag: &str| {
        let key = tree.create(id, tag).unwrap();
        names.borrow_mut().insert(key, id.to_string());
        key
    };

    let doc = tree.create_document("app").unwrap();
    names.borrow_mut().insert(doc, "app".into());
    let home = create(&mut tree, "home", "main");
    let users = create(&mut tree, "users", "section");
    let list = create(&mut tree, "user-list", "ul");
    let profile = create(&mut tree, "profile", "article");
    let lost = create(&mut tree, "lost", "main");

    tree.add_view(doc, View::new("home", [home])).unwrap();
    tree.add_view(doc, View::new("people", [users])).unwrap();
    tree.add_view(users, View::new("all", [list])).unwrap();
    tree.add_view(
        users,
        View::parameterized(
            "id",
            |value, template| {
                if value.chars().all(|c| c.is_ascii_digit()) {
                    Ok(View::new(value, template.members().to_vec()))
                } else {
                    Err(ViewError::rejected(template, value))
                }
            },
            [profile],
        ),
    )
    .unwrap();
    tree.set_binding(Box::new(PrintBinding {
        names: names.clone(),
    }));

    let mut router = Router::with_config(RouterConfig::new("https://example.com/demo/"), tree, doc);
    router.on_notfound(View::new("notfound", [lost])).unwrap();

    let everyone = router.new_link(users, "all").unwrap();
    router.tree_mut().mount(users);
    println!("link {} -> {}", everyone.view(), router.href(&everyone));

    router.on_route_change_request(|router, m| {
        println!("request {:?} (current {:?})", m.value, router.current_route());
        Outcome::Continue
    });
    router.listen_and_serve().unwrap();

    for route in ["/demo/home", "/people/users/all", "/people/users/7", "/people/users/x"] {
        println!("go_to {route}");
        router.go_to(route);
        println!("  now at {:?}", router.current_route());
    }

    println!("back");
    router.go_back();
    println!("  now at {:?}", router.current_route());

    println!("native route change");
    router.dispatch_route_change(Router::route_change_event("/home"));
    println!("  now at {:?}", router.current_route());

    println!("follow link");
    router.follow(&everyone);
    println!("  now at {:?}", router.current_route());

    println!("history: {:?}", router.history().entries());
}
