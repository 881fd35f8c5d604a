// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Relink Contributors

//! Error types for the module runtime

use thiserror::Error;

/// Result type for module runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors that can occur in the module runtime.
///
/// Two error categories carry no variant of their own because they propagate
/// unchanged: an error returned by a module factory surfaces verbatim from
/// [`require`](crate::ModuleRuntime::require), and an error returned by an
/// accept callback surfaces verbatim from
/// [`patch`](crate::ModuleRuntime::patch). Module code reports its own
/// failures through the transparent [`Other`](RuntimeError::Other) variant.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// `require` was called with an id absent from the live factory table
    #[error("Cannot find module '{0}'")]
    ModuleNotFound(String),

    /// An update artifact could not be fetched
    #[error("Failed to load update artifact '{url}': {reason}")]
    NotificationLoad {
        /// Artifact location from the update message
        url: String,
        /// Reason for failure
        reason: String,
    },

    /// An inbound push message could not be decoded
    #[error("Malformed update notification: {0}")]
    Notification(#[from] serde_json::Error),

    /// Error raised by module code (factories and accept callbacks)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RuntimeError {
    /// Create a module not found error
    pub fn module_not_found(id: impl Into<String>) -> Self {
        Self::ModuleNotFound(id.into())
    }

    /// Create a notification load error
    pub fn notification_load(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotificationLoad {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
