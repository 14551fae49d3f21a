// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory View Tree: an element tree organized by exclusive, routable views.
//!
//! ## Overview
//!
//! Elements live in an arena ([`Tree`]) and are addressed by [`ElementKey`] and
//! by a unique string id. An element may own [`View`]s: named, ordered lists
//! of member elements of which exactly one is rendered (the *active* view) at
//! a time. Members of inactive views stay attached to the tree, so every
//! element knows its [`ViewAccessPath`] (the chain of owner/view pairs leading
//! to it) and can derive its route with [`Tree::route`].
//!
//! A view whose name starts with [`PARAM_SENTINEL`] is parameterized. Its
//! concrete membership is produced at activation time from a raw value, which
//! is how dynamic route segments such as `/users/42` are rendered.
//!
//! ## Data and signals
//!
//! Every element carries a small store of [`Value`]s addressed by [`Field`].
//! [`Tree::set`] notifies watchers synchronously, in subscription order, and a
//! watcher may end delivery by returning [`Outcome::Stop`]. Writes issued while
//! the same field is being delivered are queued and replayed afterwards, so
//! delivery order is always deterministic.
//!
//! Structural changes that matter for routing (an element registering views
//! or being re-attached) are queued and drained with
//! [`Tree::take_structural_changes`].
//!
//! ## Events
//!
//! [`Tree::dispatch_event`] runs a capture → target → bubble sequence over the
//! rendered ancestor path. See the [`event`] module.
//!
//! ## Native surfaces
//!
//! A [`NativeBinding`] mirrors structure and UI properties into a concrete
//! rendering surface. Every hook defaults to a no-op.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod error;
pub mod event;
mod native;
mod signal;
mod tree;
mod types;
mod view;

pub use error::{TreeError, ViewError};
pub use event::{Dispatch, Event, Listener, ListenerFn, ListenerOptions, Phase};
pub use native::NativeBinding;
pub use signal::{Observer, Observers, SubscriptionId, Topic};
pub use tree::{Tree, ViewGuard, Watcher};
pub use types::{
    ElementFlags, ElementKey, Field, Mutation, Namespace, Outcome, PARAM_SENTINEL, Value,
    is_parameter_name,
};
pub use view::{Parameterize, View, ViewAccessPath, ViewNode};
