// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Relink Contributors

//! The patch controller: staged factory commits and subgraph invalidation.
//!
//! A patch walks the consumer graph backward from each changed module until
//! it hits a self-accepting boundary, discards every cache entry on the
//! walked chains, commits the staged factories, re-instantiates the
//! boundaries, and finally notifies their accept callbacks with post-patch
//! exports.

use rustc_hash::FxHashSet;

use crate::error::{Result, RuntimeError};
use crate::module::AcceptBinding;
use crate::runtime::ModuleRuntime;

/// Everything the boundary search accumulates, merged across updated ids.
#[derive(Default)]
struct UpdatePlan {
    /// Self-accepting modules to re-instantiate, in discovery order
    boundaries: Vec<String>,
    /// Cache entries to discard, in discovery order
    invalid_module_ids: Vec<String>,
    /// Accept callbacks queued for dispatch after the boundaries rebuild
    accept_callbacks: Vec<AcceptBinding>,
}

impl ModuleRuntime {
    /// Apply a hot update.
    ///
    /// `load_new_code` runs first with the staging window open; its `define`
    /// calls are captured without touching the live factory table. The
    /// runtime then computes update boundaries for every id in
    /// `updated_module_ids`, evicts the affected chains, commits the staged
    /// factories, re-requires each boundary, and dispatches the accept
    /// callbacks that matched an updated id. A callback always receives
    /// post-patch exports: dispatch happens strictly after every boundary
    /// has been rebuilt.
    ///
    /// A changed module with no self-accepting consumer anywhere above it
    /// contributes nothing: its chain is dropped silently, the stale cache
    /// entries stay live, and only the factory table is updated.
    ///
    /// At most one patch may be in flight at a time; re-entering `patch`
    /// from inside `load_new_code`, a factory, or a callback corrupts the
    /// staging table. Errors propagate without rolling back cache or
    /// factory state, but the staging window is closed on every exit path
    /// so later `define` calls cannot be misrouted.
    pub fn patch<F>(&mut self, updated_module_ids: &[&str], load_new_code: F) -> Result<()>
    where
        F: FnOnce(&mut ModuleRuntime) -> Result<()>,
    {
        self.patching = true;
        let outcome = self.apply_patch(updated_module_ids, load_new_code);
        self.patching = false;
        outcome
    }

    fn apply_patch<F>(&mut self, updated_module_ids: &[&str], load_new_code: F) -> Result<()>
    where
        F: FnOnce(&mut ModuleRuntime) -> Result<()>,
    {
        load_new_code(self)?;

        let mut plan = UpdatePlan::default();
        for id in updated_module_ids {
            self.find_update_boundaries(id, &mut plan);
        }

        tracing::debug!(
            updated = updated_module_ids.len(),
            boundaries = plan.boundaries.len(),
            invalidated = plan.invalid_module_ids.len(),
            "committing patch"
        );

        for id in &plan.invalid_module_ids {
            self.module_cache.remove(id);
        }

        let staged = std::mem::take(&mut self.patched_module_factory_map);
        self.module_factory_map.extend(staged);

        for id in &plan.boundaries {
            self.require(id)?;
        }

        for binding in &plan.accept_callbacks {
            let mut fresh = Vec::with_capacity(binding.deps.len());
            for dep in &binding.deps {
                let exports = self
                    .cached_exports(dep)
                    .ok_or_else(|| RuntimeError::module_not_found(dep.as_str()))?;
                fresh.push(exports);
            }
            (*binding.callback)(&fresh)?;
        }

        Ok(())
    }

    /// Backward traversal from one updated module over consumer edges.
    ///
    /// Chains stop at self-accepting modules, which become boundaries; the
    /// walked path behind a boundary joins the invalidation set. A chain
    /// that runs out of parents without meeting a boundary contributes
    /// nothing, as does an id with no cache entry (never required, or
    /// already evicted by an earlier traversal).
    fn find_update_boundaries(&self, updated_module_id: &str, plan: &mut UpdatePlan) {
        let mut queue = vec![(
            updated_module_id.to_string(),
            vec![updated_module_id.to_string()],
        )];
        let mut visited: FxHashSet<String> = FxHashSet::default();
        // Boundaries whose callbacks were already matched against this
        // updated id; a boundary reachable over several chains must queue
        // its callbacks once per updated id, not once per chain.
        let mut matched: FxHashSet<String> = FxHashSet::default();

        while let Some((module_id, chain)) = queue.pop() {
            if visited.contains(&module_id) {
                continue;
            }

            let Some(module) = self.module_cache.get(&module_id) else {
                continue;
            };
            let hot = module.hot.borrow();

            if hot.self_accept {
                if !plan.boundaries.contains(&module_id) {
                    plan.boundaries.push(module_id.clone());
                }
                if matched.insert(module_id.clone()) {
                    for binding in &hot.accept_callbacks {
                        if binding.deps.iter().any(|dep| dep == updated_module_id) {
                            plan.accept_callbacks.push(binding.clone());
                        }
                    }
                }
                for link in &chain {
                    if !plan.invalid_module_ids.contains(link) {
                        plan.invalid_module_ids.push(link.clone());
                    }
                }
                // A boundary stops the walk; its own consumers stay intact.
                continue;
            }

            for parent in &module.parents {
                let Some(parent_id) = parent else {
                    // Top-level consumer: nothing above to absorb the update.
                    continue;
                };
                let mut next_chain = chain.clone();
                next_chain.push(parent_id.clone());
                queue.push((parent_id.clone(), next_chain));
            }

            visited.insert(module_id);
        }
    }
}
