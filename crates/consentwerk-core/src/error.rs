// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the Consentwerk bridge.
//
// The bridge performs zero local recovery: every fault is logged once at
// the point of detection and re-raised unchanged, so the host application
// decides on retry/ignore/abort.

use thiserror::Error;

/// Top-level error type for all bridge operations.
#[derive(Debug, Error)]
pub enum ConsentwerkError {
    // -- Resolution faults --
    /// The named native method does not exist, or the argument types do
    /// not match its signature. Always fatal to the call.
    #[error("method resolution failed for `{method}`: {detail}")]
    MethodResolution { method: String, detail: String },

    /// The underlying invocation mechanism faulted while running a
    /// resolved method.
    #[error("native call failed: {0}")]
    Native(String),

    // -- Conversion faults --
    /// A native handle's runtime type does not match what a converter
    /// expects (e.g. a scalar where a collection was required).
    #[error("value conversion failed: expected {expected}, got {actual}")]
    Conversion { expected: String, actual: String },

    // -- Context faults --
    /// No current UI surface is available to inject into the call.
    #[error("no UI context available: {0}")]
    NoUiContext(String),

    // -- Platform --
    /// The native runtime is not reachable on this platform.
    #[error("native runtime not available on this platform")]
    PlatformUnavailable,
}

impl ConsentwerkError {
    /// Build a conversion fault from an expected type tag and whatever
    /// actually showed up.
    pub fn conversion(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Conversion {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Build a method-resolution fault for `method`.
    pub fn resolution(method: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MethodResolution {
            method: method.into(),
            detail: detail.into(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ConsentwerkError>;
