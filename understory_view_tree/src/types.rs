// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the view tree: element handles, flags, fields and values.

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;

/// Leading character that marks a view name as parameterized (for example `:id`).
pub const PARAM_SENTINEL: char = ':';

/// Returns `true` if `name` is a parameterized view name.
pub fn is_parameter_name(name: &str) -> bool {
    name.starts_with(PARAM_SENTINEL)
}

/// Handle of an element stored in a [`Tree`](crate::Tree).
///
/// Handles are only meaningful for the tree that created them.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ElementKey(pub(crate) u32);

impl ElementKey {
    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Structural flags of an element.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ElementFlags: u8 {
        /// The element is the true root of a document. Its subtree is never detached.
        const DOCUMENT_ROOT = 0b0000_0001;
    }
}

/// Namespace of a stored field.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Namespace {
    /// Application data.
    Data,
    /// Properties mirrored to the native UI (for example `activeview`).
    Ui,
    /// Lifecycle signals such as `mounted` or `activated`.
    Event,
    /// Navigation state: route change requests, failures, bound parameters.
    Navigation,
    /// Framework bookkeeping (for example the router's base URL).
    Internals,
}

/// Address of a value inside an element's store.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Field {
    /// Namespace of the field.
    pub namespace: Namespace,
    /// Name of the field within its namespace.
    pub name: Cow<'static, str>,
}

impl Field {
    /// Create a field in an arbitrary namespace.
    pub fn new(namespace: Namespace, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }

    /// Field in the [`Namespace::Data`] namespace.
    pub fn data(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Namespace::Data, name)
    }

    /// Field in the [`Namespace::Ui`] namespace.
    pub fn ui(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Namespace::Ui, name)
    }

    /// Field in the [`Namespace::Event`] namespace.
    pub fn event(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Namespace::Event, name)
    }

    /// Field in the [`Namespace::Navigation`] namespace.
    pub fn navigation(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Namespace::Navigation, name)
    }

    /// Field in the [`Namespace::Internals`] namespace.
    pub fn internals(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(Namespace::Internals, name)
    }
}

/// Closed set of values carried by fields, mutations and events.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Text.
    Str(String),
    /// Reference to another element of the same tree.
    Element(ElementKey),
    /// Ordered list of values.
    List(Vec<Value>),
}

impl Value {
    /// Returns the text payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean payload, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the element payload, if any.
    pub fn as_element(&self) -> Option<ElementKey> {
        match self {
            Self::Element(k) => Some(*k),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<ElementKey> for Value {
    fn from(k: ElementKey) -> Self {
        Self::Element(k)
    }
}

/// A change of one field on one element, as delivered to watchers.
#[derive(Clone, Debug, PartialEq)]
pub struct Mutation {
    /// Element whose store changed.
    pub source: ElementKey,
    /// Field that changed.
    pub field: Field,
    /// New value.
    pub value: Value,
}

/// Propagation control returned by watchers and listeners.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Keep delivering to the next handler.
    Continue,
    /// Stop delivery immediately.
    Stop,
}
