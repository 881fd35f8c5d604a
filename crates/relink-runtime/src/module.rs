// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Relink Contributors

//! Module cache entries, shared exports handles, and per-module HMR state

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::runtime::ModuleRuntime;

/// A module factory: populates a fresh exports object, requiring its own
/// dependencies through the runtime as it goes.
///
/// Factories run synchronously on first `require` of their id. An error
/// return propagates to the caller of `require` unchanged, and the module's
/// half-initialized cache entry is left in place.
pub type ModuleFactory = Rc<dyn Fn(&mut ModuleRuntime, &ModuleHandle) -> Result<()>>;

/// Callback invoked with the post-patch exports of its declared dependencies
/// after a hot update has rebuilt them.
pub type AcceptCallback = Rc<dyn Fn(&[Exports]) -> Result<()>>;

/// Shared handle to a module's exports object.
///
/// Identity is stable for the lifetime of a cache entry: every consumer that
/// required the module holds a handle to the same underlying map and
/// observes later insertions. A hot update replaces the object wholesale by
/// discarding the cache entry and re-running the factory against a fresh
/// one; it is never mutated in place by the runtime.
#[derive(Clone, Default)]
pub struct Exports(Rc<RefCell<Map<String, Value>>>);

impl Exports {
    /// Create an empty exports object
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a named export, overwriting any previous value
    pub fn insert(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().insert(name.into(), value);
    }

    /// Read a named export
    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.borrow().get(name).cloned()
    }

    /// Number of named exports populated so far
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Whether no exports have been populated yet
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Whether two handles refer to the same underlying object.
    ///
    /// A re-instantiated module fails this check against its old handle
    /// even when the contents are equal.
    pub fn same_object(&self, other: &Exports) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Exports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Exports").field(&self.0.borrow()).finish()
    }
}

/// One `hot.accept` registration: the declared dependency ids and the
/// callback to invoke with their post-patch exports.
#[derive(Clone)]
pub(crate) struct AcceptBinding {
    pub(crate) deps: Vec<String>,
    pub(crate) callback: AcceptCallback,
}

/// Per-module HMR state, shared between the cache entry and the handle the
/// factory received.
#[derive(Default)]
pub(crate) struct HotState {
    /// Whether the module volunteered to absorb updates to itself
    pub(crate) self_accept: bool,
    /// Accept registrations, in registration order
    pub(crate) accept_callbacks: Vec<AcceptBinding>,
}

/// A live cache entry: one instantiated module.
pub(crate) struct Module {
    /// Shared exports object handed to every consumer
    pub(crate) exports: Exports,
    /// Consumers that required this module; `None` marks a top-level
    /// require. Append-only, deduplicated.
    pub(crate) parents: Vec<Option<String>>,
    /// HMR state
    pub(crate) hot: Rc<RefCell<HotState>>,
}

impl Module {
    pub(crate) fn new(parent: Option<String>) -> Self {
        Self {
            exports: Exports::new(),
            parents: vec![parent],
            hot: Rc::default(),
        }
    }

    /// Record an additional consumer edge, once per distinct consumer
    pub(crate) fn add_parent(&mut self, parent: Option<String>) {
        if !self.parents.contains(&parent) {
            self.parents.push(parent);
        }
    }
}

/// The factory's view of the module being instantiated: its id, its exports
/// object, and its HMR registration surface.
pub struct ModuleHandle {
    id: String,
    exports: Exports,
    hot: Rc<RefCell<HotState>>,
}

impl ModuleHandle {
    pub(crate) fn new(id: &str, module: &Module) -> Self {
        Self {
            id: id.to_string(),
            exports: module.exports.clone(),
            hot: Rc::clone(&module.hot),
        }
    }

    /// The module's id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The module's exports object
    pub fn exports(&self) -> &Exports {
        &self.exports
    }

    /// The module's HMR registration surface
    pub fn hot(&self) -> HotHandle {
        HotHandle {
            module_id: self.id.clone(),
            state: Rc::clone(&self.hot),
        }
    }
}

/// HMR registration surface, reached from a factory body as `module.hot()`.
pub struct HotHandle {
    module_id: String,
    state: Rc<RefCell<HotState>>,
}

impl HotHandle {
    /// Mark the module as self-accepting: a hot update stops propagating
    /// here and the module is re-instantiated in place.
    pub fn accept(&self) {
        self.state.borrow_mut().self_accept = true;
    }

    /// Self-accept and register a callback invoked with the module's own
    /// post-patch exports once the update has been applied.
    pub fn accept_with<F>(&self, callback: F)
    where
        F: Fn(&[Exports]) -> Result<()> + 'static,
    {
        let mut state = self.state.borrow_mut();
        state.self_accept = true;
        state.accept_callbacks.push(AcceptBinding {
            deps: vec![self.module_id.clone()],
            callback: Rc::new(callback),
        });
    }
}
