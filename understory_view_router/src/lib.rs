// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory View Router: route strings to view activations.
//!
//! ## Overview
//!
//! The router sits on top of an [`understory_view_tree::Tree`]. Every element
//! that owns views and is reachable from the routing root through views is
//! registered in a [`RouteTrie`]. A route such as `/users/users-page/42`
//! reads as: activate `users` on the root, then on element `users-page`
//! activate `42` (resolved through its parameterized view `:id`).
//!
//! Route grammar: `"/" ("" | view ("/" elementId "/" view)*)`. A configured
//! base path is stripped first, and trailing `/` are trimmed unless
//! [`RouterConfig::leave_trailing_slash`] is set. See [`route`] for the exact
//! tokenization.
//!
//! ## Navigation
//!
//! - [`Router::go_to`], [`Router::go_back`] and [`Router::go_forward`] raise a
//!   route change request and keep [`NavHistory`] up to date.
//! - [`Router::listen_and_serve`] makes the router react to those requests.
//! - [`Router::on_notfound`], [`Router::on_unauthorized`] and
//!   [`Router::on_appfailure`] install fallback views.
//! - [`Router::navigate`] and [`Router::match_route`] bypass signals entirely.
//! - [`Router::new_link`] creates memoized [`Link`]s that must be mounted
//!   before serving.
//!
//! Matching reports [`MatchError::NotFound`], [`MatchError::Unauthorized`] or
//! [`MatchError::FrameworkFailure`]; running the activations may additionally
//! fail with a view error. [`FailurePolicy`] decides which fallback each
//! failure raises.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod config;
mod error;
mod history;
mod link;
pub mod route;
mod router;
mod trie;

pub use config::{FailurePolicy, RouterConfig};
pub use error::{MatchError, NavigationError, RouterError};
pub use history::NavHistory;
pub use link::Link;
pub use router::{ROUTE_CHANGE_EVENT, Router, SignalHandler};
pub use trie::{Activation, ActivationPlan, RouteTrie};
