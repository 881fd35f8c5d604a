// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Relink Contributors

//! # relink-runtime
//!
//! A hot-module-replacement (HMR) module runtime: a minimal dynamic linker
//! that instantiates registered modules lazily, learns the dependency graph
//! from execution order, and applies hot patches without restarting the
//! host.
//!
//! The runtime provides:
//!
//! - `define()` / `require()` registration and lookup over opaque module ids
//! - execution-time consumer tracking (no static dependency declarations)
//! - a two-phase staged-then-committed patch protocol
//! - cycle-safe boundary search with in-place accept callbacks
//! - push-notification glue for build-server driven updates
//!
//! ## Quick Start
//!
//! ```rust
//! use relink_runtime::ModuleRuntime;
//! use serde_json::json;
//!
//! let mut runtime = ModuleRuntime::new();
//!
//! runtime.define("./greeting.js", |_runtime, module| {
//!     module.exports().insert("text", json!("hello"));
//!     Ok(())
//! });
//! runtime.define("./app.js", |runtime, module| {
//!     let greeting = runtime.require("./greeting.js")?;
//!     module.exports().insert("banner", greeting.get("text").unwrap());
//!     Ok(())
//! });
//!
//! let app = runtime.require("./app.js").unwrap();
//! assert_eq!(app.get("banner"), Some(json!("hello")));
//! ```
//!
//! ## Hot updates
//!
//! A module opts into updates with `module.hot().accept()`; changes to it or
//! anything below it are then absorbed by re-instantiating the module in
//! place, leaving its own consumers untouched:
//!
//! ```rust
//! use relink_runtime::ModuleRuntime;
//! use serde_json::json;
//!
//! let mut runtime = ModuleRuntime::new();
//! runtime.define("./message.js", |_runtime, module| {
//!     module.exports().insert("text", json!("hello"));
//!     module.hot().accept();
//!     Ok(())
//! });
//! runtime.require("./message.js").unwrap();
//!
//! runtime
//!     .patch(&["./message.js"], |runtime| {
//!         runtime.define("./message.js", |_runtime, module| {
//!             module.exports().insert("text", json!("bonjour"));
//!             module.hot().accept();
//!             Ok(())
//!         });
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let message = runtime.require("./message.js").unwrap();
//! assert_eq!(message.get("text"), Some(json!("bonjour")));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod module;
pub mod notifier;
pub mod runtime;

mod patch;

// Re-exports
pub use error::{Result, RuntimeError};
pub use module::{AcceptCallback, Exports, HotHandle, ModuleFactory, ModuleHandle};
pub use notifier::{ArtifactLoader, UpdateArtifact, UpdateMessage, UpdateNotifier};
pub use runtime::ModuleRuntime;

/// Version of the relink runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
