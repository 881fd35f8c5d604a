// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Relink Contributors

//! The module registry: factory storage, the live module cache, and
//! execution-time dependency tracking

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{Result, RuntimeError};
use crate::module::{Exports, Module, ModuleFactory, ModuleHandle};

/// The module runtime: factory tables, cache, execution stack, and patch
/// state in one aggregate.
///
/// The runtime is single-threaded by design. All operations take `&mut
/// self`; factories re-enter the runtime through the reference they are
/// handed, and shared handles ([`Exports`], hot state) use `Rc` internally.
pub struct ModuleRuntime {
    /// Live id → factory table consulted by [`require`](Self::require)
    pub(crate) module_factory_map: FxHashMap<String, ModuleFactory>,
    /// Staging table, populated by `define` while a patch window is open
    pub(crate) patched_module_factory_map: FxHashMap<String, ModuleFactory>,
    /// Live module cache; one entry per instantiated id
    pub(crate) module_cache: FxHashMap<String, Module>,
    /// Ids of modules currently instantiating, outermost first
    pub(crate) execute_module_stack: Vec<String>,
    /// Whether a patch window is open; gates `define` redirection
    pub(crate) patching: bool,
}

impl ModuleRuntime {
    /// Create an empty runtime
    pub fn new() -> Self {
        Self {
            module_factory_map: FxHashMap::default(),
            patched_module_factory_map: FxHashMap::default(),
            module_cache: FxHashMap::default(),
            execute_module_stack: Vec::new(),
            patching: false,
        }
    }

    /// Register a factory for `id`, overwriting any previous registration.
    ///
    /// While a patch window is open the registration lands in the staging
    /// table and stays invisible to `require` until the patch commits.
    pub fn define<F>(&mut self, id: &str, factory: F)
    where
        F: Fn(&mut ModuleRuntime, &ModuleHandle) -> Result<()> + 'static,
    {
        let factory: ModuleFactory = Rc::new(factory);
        if self.patching {
            tracing::debug!(id, "staging factory");
            self.patched_module_factory_map.insert(id.to_string(), factory);
        } else {
            self.module_factory_map.insert(id.to_string(), factory);
        }
    }

    /// Instantiate `id` if needed and return its exports handle.
    ///
    /// The consumer recorded for the edge is whichever module is currently
    /// instantiating (top of the execution stack), or the root marker for a
    /// top-level call. Repeated and circular requires are cheap: a cached
    /// module only gains a parent entry and hands back the existing handle.
    ///
    /// Factory errors propagate unchanged. The execution-stack entry is
    /// popped on every exit path, and a failing module leaves its
    /// half-initialized cache entry behind.
    pub fn require(&mut self, id: &str) -> Result<Exports> {
        let parent = self.execute_module_stack.last().cloned();

        if let Some(module) = self.module_cache.get_mut(id) {
            module.add_parent(parent);
            return Ok(module.exports.clone());
        }

        let factory = self
            .module_factory_map
            .get(id)
            .cloned()
            .ok_or_else(|| RuntimeError::module_not_found(id))?;

        tracing::debug!(id, parent = parent.as_deref(), "instantiating module");

        // Insert before running the factory so circular requires resolve to
        // the in-progress exports instead of recursing forever.
        let module = Module::new(parent);
        let handle = ModuleHandle::new(id, &module);
        self.module_cache.insert(id.to_string(), module);

        self.execute_module_stack.push(id.to_string());
        let outcome = (*factory)(self, &handle);
        self.execute_module_stack.pop();
        outcome?;

        Ok(handle.exports().clone())
    }

    /// Whether `id` has a live cache entry
    pub fn is_cached(&self, id: &str) -> bool {
        self.module_cache.contains_key(id)
    }

    /// The cached exports handle for `id`, if instantiated
    pub fn cached_exports(&self, id: &str) -> Option<Exports> {
        self.module_cache.get(id).map(|module| module.exports.clone())
    }

    /// Whether a factory for `id` is registered in the live table
    pub fn is_defined(&self, id: &str) -> bool {
        self.module_factory_map.contains_key(id)
    }
}

impl Default for ModuleRuntime {
    fn default() -> Self {
        Self::new()
    }
}
