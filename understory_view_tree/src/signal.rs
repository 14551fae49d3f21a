// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Subscription bookkeeping shared by data watchers, event listeners and the
//! router's navigation signals.
//!
//! Handlers receive `&mut` access to their owner while they run, so a topic's
//! subscriber list is taken out of the table for the duration of a delivery
//! ([`Observers::begin`]) and put back afterwards ([`Observers::end`]). While a
//! topic is taken it is *busy*; owners queue mutations addressed to a busy
//! topic with [`Observers::defer`] and replay them once the outermost delivery
//! has returned.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};

use crate::types::{ElementKey, Field, Mutation};

/// Identifier of a subscription, unique per [`Observers`] table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// A (source element, field) pair that handlers subscribe to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Topic {
    /// Element whose field is observed.
    pub source: ElementKey,
    /// Observed field.
    pub field: Field,
}

impl Topic {
    /// Create a topic.
    pub fn new(source: ElementKey, field: Field) -> Self {
        Self { source, field }
    }
}

/// One registered handler.
#[derive(Debug)]
pub struct Observer<H> {
    /// Subscription id.
    pub id: SubscriptionId,
    /// Element on whose behalf the handler was registered, if any.
    pub owner: Option<ElementKey>,
    /// The handler.
    pub handler: H,
}

#[derive(Debug)]
struct Entries<H> {
    list: Vec<Observer<H>>,
    busy: bool,
    // Ids of the list currently taken out for delivery and not cancelled.
    taken: HashSet<SubscriptionId>,
}

impl<H> Default for Entries<H> {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            busy: false,
            taken: HashSet::new(),
        }
    }
}

/// Table of handlers keyed by [`Topic`], delivered in subscription order.
#[derive(Debug)]
pub struct Observers<H> {
    next_id: u64,
    topics: HashMap<Topic, Entries<H>>,
    // Unsubscribed while their list was taken out for delivery.
    cancelled: HashSet<SubscriptionId>,
    cancelled_owners: HashMap<Topic, Vec<ElementKey>>,
    deferred: VecDeque<Mutation>,
    depth: u32,
}

impl<H> Default for Observers<H> {
    fn default() -> Self {
        Self {
            next_id: 0,
            topics: HashMap::new(),
            cancelled: HashSet::new(),
            cancelled_owners: HashMap::new(),
            deferred: VecDeque::new(),
            depth: 0,
        }
    }
}

impl<H> Observers<H> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` on `topic`. It runs after every handler registered before it.
    pub fn subscribe(
        &mut self,
        topic: Topic,
        owner: Option<ElementKey>,
        handler: H,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.topics
            .entry(topic)
            .or_default()
            .list
            .push(Observer { id, owner, handler });
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    ///
    /// A handler may unsubscribe itself or a sibling during delivery; the
    /// removal takes effect immediately for the remainder of that delivery.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for entries in self.topics.values_mut() {
            if let Some(pos) = entries.list.iter().position(|o| o.id == id) {
                entries.list.remove(pos);
                return true;
            }
            if entries.taken.remove(&id) {
                // Settled in `end`.
                self.cancelled.insert(id);
                return true;
            }
        }
        false
    }

    /// Remove every subscription `owner` holds on `topic`.
    ///
    /// Subscriptions taken out by an ongoing delivery are skipped for the rest
    /// of it and dropped when it ends.
    pub fn unsubscribe_owner(&mut self, topic: &Topic, owner: ElementKey) {
        let Some(entries) = self.topics.get_mut(topic) else {
            return;
        };
        entries.list.retain(|o| o.owner != Some(owner));
        if entries.busy {
            self.cancelled_owners
                .entry(topic.clone())
                .or_default()
                .push(owner);
        }
    }

    /// Returns `true` if `observer`, taken out for delivery on `topic`, was
    /// unsubscribed in the meantime.
    pub fn is_cancelled(&self, topic: &Topic, observer: &Observer<H>) -> bool {
        if self.cancelled.contains(&observer.id) {
            return true;
        }
        match (observer.owner, self.cancelled_owners.get(topic)) {
            (Some(owner), Some(owners)) => owners.contains(&owner),
            _ => false,
        }
    }

    /// Returns `true` while a delivery for `topic` is in progress.
    pub fn is_busy(&self, topic: &Topic) -> bool {
        self.topics.get(topic).is_some_and(|e| e.busy)
    }

    /// Number of live subscriptions on `topic`, excluding a taken list.
    pub fn len(&self, topic: &Topic) -> usize {
        self.topics.get(topic).map_or(0, |e| e.list.len())
    }

    /// Returns `true` if no live subscriptions exist on `topic`.
    pub fn is_empty(&self, topic: &Topic) -> bool {
        self.len(topic) == 0
    }

    /// Take the handlers of `topic` out for delivery and mark it busy.
    pub fn begin(&mut self, topic: &Topic) -> Vec<Observer<H>> {
        match self.topics.get_mut(topic) {
            Some(entries) => {
                entries.busy = true;
                entries.taken = entries.list.iter().map(|o| o.id).collect();
                core::mem::take(&mut entries.list)
            }
            None => {
                self.topics.insert(
                    topic.clone(),
                    Entries {
                        busy: true,
                        ..Entries::default()
                    },
                );
                Vec::new()
            }
        }
    }

    /// Return handlers taken by [`Observers::begin`].
    ///
    /// Handlers subscribed during delivery keep their place after the returned
    /// ones; cancelled handlers are dropped.
    pub fn end(&mut self, topic: Topic, mut taken: Vec<Observer<H>>) {
        let owners = self.cancelled_owners.remove(&topic).unwrap_or_default();
        let cancelled = &mut self.cancelled;
        taken.retain(|o| {
            let dropped_owner = o.owner.is_some_and(|owner| owners.contains(&owner));
            !cancelled.remove(&o.id) && !dropped_owner
        });
        let entries = self.topics.entry(topic).or_default();
        taken.append(&mut entries.list);
        entries.list = taken;
        entries.busy = false;
        entries.taken.clear();
    }

    /// Queue a mutation addressed to a busy topic.
    pub fn defer(&mut self, mutation: Mutation) {
        self.deferred.push_back(mutation);
    }

    /// Enter a delivery.
    pub fn enter(&mut self) {
        self.depth += 1;
    }

    /// Leave a delivery. Returns `true` when the outermost delivery has returned.
    pub fn exit(&mut self) -> bool {
        self.depth = self.depth.saturating_sub(1);
        self.depth == 0
    }

    /// Next queued mutation, oldest first.
    pub fn pop_deferred(&mut self) -> Option<Mutation> {
        self.deferred.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn topic(name: &'static str) -> Topic {
        Topic::new(ElementKey(0), Field::data(name))
    }

    #[test]
    fn subscription_order_is_preserved_across_delivery() {
        let mut obs: Observers<u32> = Observers::new();
        obs.subscribe(topic("a"), None, 1);
        obs.subscribe(topic("a"), None, 2);

        let taken = obs.begin(&topic("a"));
        assert!(obs.is_busy(&topic("a")), "topic is busy while taken");
        // Subscribed during delivery.
        obs.subscribe(topic("a"), None, 3);
        obs.end(topic("a"), taken);

        let order: Vec<u32> = obs
            .begin(&topic("a"))
            .into_iter()
            .map(|o| o.handler)
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn unsubscribe_during_delivery_drops_handler() {
        let mut obs: Observers<u32> = Observers::new();
        let first = obs.subscribe(topic("a"), None, 1);
        obs.subscribe(topic("a"), None, 2);

        let taken = obs.begin(&topic("a"));
        assert!(obs.unsubscribe(first), "taken handler can be cancelled");
        assert!(
            obs.is_cancelled(&topic("a"), &taken[0]),
            "cancellation is visible mid-delivery"
        );
        assert!(!obs.is_cancelled(&topic("a"), &taken[1]));
        assert!(!obs.unsubscribe(first), "a second removal finds nothing");
        obs.end(topic("a"), taken);

        assert_eq!(obs.len(&topic("a")), 1);
        assert!(obs.cancelled.is_empty(), "cancellations are settled by `end`");
    }

    #[test]
    fn unknown_ids_are_not_cancelled_while_busy() {
        let mut obs: Observers<u32> = Observers::new();
        let gone = obs.subscribe(topic("a"), None, 1);
        assert!(obs.unsubscribe(gone));
        obs.subscribe(topic("b"), None, 2);

        let taken = obs.begin(&topic("b"));
        assert!(!obs.unsubscribe(gone), "already removed before delivery");
        assert!(obs.cancelled.is_empty());
        obs.end(topic("b"), taken);
        assert_eq!(obs.len(&topic("b")), 1);
    }

    #[test]
    fn unsubscribe_owner_only_touches_owner() {
        let mut obs: Observers<u32> = Observers::new();
        obs.subscribe(topic("a"), Some(ElementKey(1)), 1);
        obs.subscribe(topic("a"), Some(ElementKey(2)), 2);
        obs.subscribe(topic("a"), Some(ElementKey(1)), 3);
        obs.unsubscribe_owner(&topic("a"), ElementKey(1));
        assert_eq!(obs.len(&topic("a")), 1);
    }

    #[test]
    fn unsubscribe_owner_during_delivery() {
        let mut obs: Observers<u32> = Observers::new();
        obs.subscribe(topic("a"), Some(ElementKey(1)), 1);
        obs.subscribe(topic("a"), Some(ElementKey(2)), 2);
        let taken = obs.begin(&topic("a"));
        obs.unsubscribe_owner(&topic("a"), ElementKey(1));
        assert!(obs.is_cancelled(&topic("a"), &taken[0]));
        obs.end(topic("a"), taken);
        let left: Vec<u32> = obs
            .begin(&topic("a"))
            .into_iter()
            .map(|o| o.handler)
            .collect();
        assert_eq!(left, vec![2]);
    }

    #[test]
    fn depth_tracks_outermost_delivery() {
        let mut obs: Observers<u32> = Observers::new();
        obs.enter();
        obs.enter();
        assert!(!obs.exit(), "inner exit is not outermost");
        assert!(obs.exit(), "outer exit is outermost");
    }
}
