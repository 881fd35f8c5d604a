// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Relink Contributors

//! Update notification glue: decoding push-channel payloads and driving
//! artifact evaluation.
//!
//! The transport that delivers payloads and the fetch that retrieves
//! artifacts both live outside this crate; the notifier only decodes
//! messages and hands the fetched artifact to the runtime.

use serde::Deserialize;

use crate::error::Result;
use crate::runtime::ModuleRuntime;

/// A push-channel message, tagged by `type`.
///
/// Only `update` messages carry meaning for the runtime; every other
/// discriminator decodes to [`Other`](UpdateMessage::Other) and is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UpdateMessage {
    /// A new build artifact is available
    Update {
        /// Fetchable location of the artifact
        url: String,
    },
    /// Any other message type
    #[serde(other)]
    Other,
}

/// An executable update artifact.
///
/// Evaluating the artifact against the runtime is expected to call
/// [`patch`] with the changed module ids, with the new [`define`]s inside
/// the patch's load closure — one `patch(ids, …)` call per artifact is the
/// bootstrap convention of the build system.
///
/// [`define`]: ModuleRuntime::define
/// [`patch`]: ModuleRuntime::patch
pub type UpdateArtifact = Box<dyn FnOnce(&mut ModuleRuntime) -> Result<()>>;

/// Fetches build artifacts announced over the push channel.
///
/// Implementations own all I/O. A fetch failure should be reported as
/// [`RuntimeError::NotificationLoad`](crate::RuntimeError::NotificationLoad).
pub trait ArtifactLoader {
    /// Fetch the artifact at `url` and return it as an executable action
    fn load(&mut self, url: &str) -> Result<UpdateArtifact>;
}

/// Consumes push-channel payloads and applies the updates they announce.
pub struct UpdateNotifier<L> {
    loader: L,
}

impl<L: ArtifactLoader> UpdateNotifier<L> {
    /// Create a notifier around an artifact loader
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    /// Handle one raw push-channel payload.
    ///
    /// Malformed payloads surface a decode error to the channel driver. A
    /// loader failure is logged and swallowed: the runtime stays in its
    /// pre-update state. An error from evaluating a successfully fetched
    /// artifact is a patch failure and propagates.
    pub fn handle_message(&mut self, runtime: &mut ModuleRuntime, raw: &str) -> Result<()> {
        let message: UpdateMessage = serde_json::from_str(raw)?;
        match message {
            UpdateMessage::Update { url } => {
                tracing::info!(url = %url, "update notification received");
                let artifact = match self.loader.load(&url) {
                    Ok(artifact) => artifact,
                    Err(err) => {
                        tracing::error!(url = %url, error = %err, "failed to load update artifact");
                        return Ok(());
                    }
                };
                artifact(runtime)
            }
            UpdateMessage::Other => Ok(()),
        }
    }
}
