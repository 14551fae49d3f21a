// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Three-phase event dispatch over the rendered ancestor path.
//!
//! An event aimed at an element visits:
//!
//! - capture: every rendered ancestor, root first, running capture listeners;
//! - target: the element itself, running every listener in registration order;
//! - bubble: the ancestors again, parent first, running non-capture listeners.
//!   Skipped when the event does not bubble.
//!
//! A listener returning [`Outcome::Stop`] or calling [`Event::stop_propagation`]
//! ends dispatch immediately, and [`Tree::dispatch_event`] reports where.
//! Default handling is left to the caller, who can inspect
//! [`Event::default_prevented`] afterwards.
//!
//! ```
//! use understory_view_tree::{Event, ListenerOptions, Outcome, Phase, Tree, Value};
//!
//! let mut tree = Tree::new();
//! let doc = tree.create_document("app").unwrap();
//! let button = tree.create("ok", "button").unwrap();
//! tree.append_child(doc, button).unwrap();
//!
//! tree.add_event_listener(doc, "click", ListenerOptions::CAPTURE, |_, ev| {
//!     assert_eq!(ev.phase(), Some(Phase::Capture));
//!     Outcome::Continue
//! });
//! tree.add_event_listener(button, "click", ListenerOptions::empty(), |_, _| Outcome::Stop);
//!
//! let mut ev = Event::new("click", true, Value::Bool(true));
//! let stop = tree.dispatch_event(button, &mut ev).unwrap();
//! assert_eq!(stop.phase, Phase::Target);
//! assert_eq!(stop.node, button);
//! ```

use alloc::borrow::Cow;
use alloc::boxed::Box;

use smallvec::SmallVec;
use tracing::{trace, warn};

use crate::signal::{SubscriptionId, Topic};
use crate::tree::Tree;
use crate::types::{ElementKey, Field, Outcome, Value};

/// Propagation phase of an event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Root to parent of the target.
    Capture,
    /// The target itself.
    Target,
    /// Parent of the target back to the root.
    Bubble,
}

bitflags::bitflags! {
    /// Registration options of an event listener.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ListenerOptions: u8 {
        /// Run during the capture phase instead of the bubble phase.
        const CAPTURE = 0b0000_0001;
        /// Remove the listener after it ran once.
        const ONCE = 0b0000_0010;
    }
}

/// One step of a dispatch sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dispatch {
    /// Phase of the step.
    pub phase: Phase,
    /// Element whose listeners run.
    pub node: ElementKey,
}

/// Event delivered through a [`Tree`].
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    kind: Cow<'static, str>,
    bubbles: bool,
    target: Option<ElementKey>,
    current_target: Option<ElementKey>,
    phase: Option<Phase>,
    stopped: bool,
    default_prevented: bool,
    /// Event data.
    pub payload: Value,
}

impl Event {
    /// Create an event of `kind`.
    pub fn new(kind: impl Into<Cow<'static, str>>, bubbles: bool, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            bubbles,
            target: None,
            current_target: None,
            phase: None,
            stopped: false,
            default_prevented: false,
            payload,
        }
    }

    /// Event type, for example `click` or `routechange`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Whether the event runs a bubble phase.
    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    /// Element the event was dispatched at.
    pub fn target(&self) -> Option<ElementKey> {
        self.target
    }

    /// Element whose listeners are running.
    pub fn current_target(&self) -> Option<ElementKey> {
        self.current_target
    }

    /// Current phase. `None` outside dispatch.
    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// End dispatch after the current listener.
    pub fn stop_propagation(&mut self) {
        self.stopped = true;
    }

    /// Returns `true` once propagation was stopped.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Ask the caller to skip the default action.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Returns `true` if a listener called [`Event::prevent_default`].
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Listener callback.
pub type ListenerFn = Box<dyn FnMut(&mut Tree, &mut Event) -> Outcome>;

/// A registered listener with its options.
pub struct Listener {
    options: ListenerOptions,
    handler: ListenerFn,
}

impl core::fmt::Debug for Listener {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Listener")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Build the capture → target → bubble sequence for `target` given its
/// rendered ancestors, outermost first.
pub fn dispatch_sequence(
    ancestors: &[ElementKey],
    target: ElementKey,
    bubbles: bool,
) -> SmallVec<[Dispatch; 8]> {
    let mut out = SmallVec::new();
    for &node in ancestors {
        out.push(Dispatch {
            phase: Phase::Capture,
            node,
        });
    }
    out.push(Dispatch {
        phase: Phase::Target,
        node: target,
    });
    if bubbles {
        for &node in ancestors.iter().rev() {
            out.push(Dispatch {
                phase: Phase::Bubble,
                node,
            });
        }
    }
    out
}

impl Tree {
    /// Register a listener for events of `kind` on `key`.
    pub fn add_event_listener(
        &mut self,
        key: ElementKey,
        kind: impl Into<Cow<'static, str>>,
        options: ListenerOptions,
        handler: impl FnMut(&mut Self, &mut Event) -> Outcome + 'static,
    ) -> SubscriptionId {
        self.listeners.subscribe(
            Topic::new(key, Field::event(kind)),
            Some(key),
            Listener {
                options,
                handler: Box::new(handler),
            },
        )
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove_event_listener(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Ask the native binding to forward host events of `kind` aimed at `key`.
    pub fn listen_native(&mut self, key: ElementKey, kind: &str) {
        if let Some(b) = self.binding.as_mut() {
            b.listen(key, kind);
        }
    }

    /// Dispatch `event` at `target`.
    ///
    /// Returns the step where propagation stopped, or `None` if every step ran.
    /// Events aimed at detached elements are dropped.
    pub fn dispatch_event(&mut self, target: ElementKey, event: &mut Event) -> Option<Dispatch> {
        if !self.contains(target) {
            return None;
        }
        if self.is_detached(target) {
            warn!(
                element = self.id_of(target).unwrap_or_default(),
                kind = event.kind(),
                "event dispatched on a detached element"
            );
            return None;
        }
        event.target = Some(target);
        let sequence = dispatch_sequence(self.path_of(target), target, event.bubbles);
        let mut stop = None;
        for step in sequence {
            event.phase = Some(step.phase);
            event.current_target = Some(step.node);
            if self.handle(step, event) == Outcome::Stop || event.stopped {
                stop = Some(step);
                break;
            }
        }
        event.phase = None;
        event.current_target = None;
        stop
    }

    fn handle(&mut self, step: Dispatch, event: &mut Event) -> Outcome {
        let topic = Topic::new(step.node, Field::event(event.kind.clone()));
        if self.listeners.is_busy(&topic) {
            trace!(kind = event.kind(), "nested dispatch skipped for busy listeners");
            return Outcome::Continue;
        }
        if self.listeners.is_empty(&topic) {
            return Outcome::Continue;
        }
        let mut taken = self.listeners.begin(&topic);
        let mut outcome = Outcome::Continue;
        for entry in &mut taken {
            if self.listeners.is_cancelled(&topic, entry) {
                continue;
            }
            let options = entry.handler.options;
            let capture = options.contains(ListenerOptions::CAPTURE);
            let runs = match step.phase {
                Phase::Capture => capture,
                Phase::Target => true,
                Phase::Bubble => !capture,
            };
            if !runs {
                continue;
            }
            let result = (entry.handler.handler)(self, event);
            if options.contains(ListenerOptions::ONCE) {
                self.listeners.unsubscribe(entry.id);
            }
            if result == Outcome::Stop || event.stopped {
                outcome = Outcome::Stop;
                break;
            }
        }
        self.listeners.end(topic, taken);
        outcome
    }
}
