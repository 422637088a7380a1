// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Consentwerk — native SDK bridge.
//
// This crate lets Rust host code invoke operations on, and receive
// asynchronous notifications from, the Consentwerk native SDK singleton,
// which lives in a separate object runtime reachable only through a
// reflection-style call surface (call-by-name with typed argument and
// return marshalling, no compile-time binding).
//
// Layering, leaves first: `runtime` abstracts the call surface,
// `convert` maps values across it, `dispatch` performs named invocations
// (including context-injected ones), `callback` carries notifications
// back across threads, and `facade` composes the public operation set.

pub mod callback;
pub mod convert;
pub mod dispatch;
pub mod facade;
pub mod runtime;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(not(target_os = "android"))]
pub mod stub;

#[cfg(test)]
pub(crate) mod testing;

pub use facade::Consentwerk;
pub use runtime::{NativeHandle, NativeRuntime, NativeValue};

use std::sync::Arc;

/// Retrieves the native call surface for the target operating system.
///
/// On Android this talks to the ART runtime over JNI; everywhere else a
/// stub is returned whose every operation faults `PlatformUnavailable`,
/// so non-device builds stay green.
pub fn platform_runtime() -> Arc<dyn NativeRuntime> {
    #[cfg(target_os = "android")]
    {
        Arc::new(android::AndroidRuntime::new())
    }
    #[cfg(not(target_os = "android"))]
    {
        Arc::new(stub::StubRuntime)
    }
}
