// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Abstraction over the native object runtime's reflection-style call
// surface.
//
// The native SDK lives in a foreign object runtime that can only be
// reached by named, typed invocation — there is no compile-time binding.
// This module defines the minimal capability set the rest of the bridge
// is written against, so the marshalling and dispatch logic runs
// unchanged over the JNI-backed runtime on device, over the stub on
// desktop, and over an in-memory fake in the tests.

use std::fmt;
use std::sync::Arc;

use consentwerk_core::error::Result;

/// An opaque reference to an object living in the native runtime.
///
/// Handles are borrowed, never owned: a handle is valid only for the
/// duration of the call that produced it, and transient handles the
/// bridge creates itself (class refs, UI context handles, reverse-
/// converted collections) must be released through [`ScopedRef`] before
/// that call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(pub u64);

impl NativeHandle {
    /// The runtime-typed null object.
    ///
    /// Distinct from a host-side hole ([`NativeValue::Absent`]): the
    /// native call-resolution mechanism accepts a typed null where it
    /// raises a method-resolution fault for a host hole.
    pub const NULL: NativeHandle = NativeHandle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value crossing the runtime boundary in either direction.
///
/// Strings and boxed primitives are classified into scalar variants by
/// the runtime wherever it can; everything else crosses as an object
/// handle.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// A host-side hole (the host language's "null"). Must never reach
    /// the native call-resolution mechanism: the dispatcher rewrites
    /// every `Absent` argument to [`NativeValue::Null`] first.
    Absent,
    /// The runtime-typed null sentinel.
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Object(NativeHandle),
}

impl NativeValue {
    /// Short type tag used in conversion faults.
    pub fn type_name(&self) -> &'static str {
        match self {
            NativeValue::Absent => "absent",
            NativeValue::Null => "null",
            NativeValue::Bool(_) => "bool",
            NativeValue::Int(_) => "int",
            NativeValue::Str(_) => "string",
            NativeValue::Object(_) => "object",
        }
    }

    /// An optional host string as an argument value; `None` is a
    /// host-side hole for the dispatcher's null-sentinel rewrite.
    pub fn opt_string(value: Option<&str>) -> NativeValue {
        match value {
            Some(s) => NativeValue::Str(s.to_owned()),
            None => NativeValue::Absent,
        }
    }
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        NativeValue::Str(value.to_owned())
    }
}

impl From<String> for NativeValue {
    fn from(value: String) -> Self {
        NativeValue::Str(value)
    }
}

impl From<bool> for NativeValue {
    fn from(value: bool) -> Self {
        NativeValue::Bool(value)
    }
}

impl From<i64> for NativeValue {
    fn from(value: i64) -> Self {
        NativeValue::Int(value)
    }
}

impl From<NativeHandle> for NativeValue {
    fn from(value: NativeHandle) -> Self {
        NativeValue::Object(value)
    }
}

/// Host-side receiver for invocations the native runtime performs on a
/// registered callback proxy.
///
/// `invoke` may be called from any native-runtime thread at any time,
/// including before the registration call has returned to the host.
/// Implementations must confine themselves to enqueueing — host handlers
/// never run on the delivery thread.
pub trait ProxyInvocation: Send + Sync {
    fn invoke(&self, method: &str, args: Vec<NativeValue>);
}

/// The reflection-style call surface of the native runtime.
///
/// Every operation is synchronous: it either returns or faults on the
/// calling thread. No ordering is provided between concurrent calls, and
/// no call can be cancelled once issued.
pub trait NativeRuntime: Send + Sync {
    /// Resolve a class by its fully-qualified name.
    ///
    /// The returned handle is transient and must be released.
    fn find_class(&self, name: &str) -> Result<NativeHandle>;

    /// Invoke a static method on a class handle.
    fn call_static(
        &self,
        class: NativeHandle,
        method: &str,
        args: &[NativeValue],
    ) -> Result<NativeValue>;

    /// Invoke an instance method by name.
    fn call(
        &self,
        target: NativeHandle,
        method: &str,
        args: &[NativeValue],
    ) -> Result<NativeValue>;

    /// Construct a native object (a boxed boolean, a hash set) from a
    /// class name and constructor arguments.
    fn new_object(&self, class: &str, args: &[NativeValue]) -> Result<NativeHandle>;

    /// Materialise a callback proxy implementing the named native
    /// interface, backed by `target`.
    ///
    /// The runtime retains the invocation target for the life of the
    /// process — the base contract has no way to unregister a proxy.
    fn new_proxy(
        &self,
        interface: &str,
        target: Arc<dyn ProxyInvocation>,
    ) -> Result<NativeHandle>;

    /// Resolve the host platform's current UI context (the foreground
    /// activity).
    ///
    /// Fails with `NoUiContext` when no UI surface exists. The returned
    /// handle is transient and must be released.
    fn current_ui_context(&self) -> Result<NativeHandle>;

    /// Release a transient handle created during the current call.
    ///
    /// Releasing [`NativeHandle::NULL`] is a no-op.
    fn release(&self, handle: NativeHandle);
}

/// RAII guard over a transient native handle.
///
/// Guarantees release on every exit path, including fault paths.
pub struct ScopedRef<'rt> {
    runtime: &'rt dyn NativeRuntime,
    handle: NativeHandle,
}

impl<'rt> ScopedRef<'rt> {
    pub fn new(runtime: &'rt dyn NativeRuntime, handle: NativeHandle) -> Self {
        Self { runtime, handle }
    }

    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    /// The guarded handle as an argument value.
    pub fn as_value(&self) -> NativeValue {
        NativeValue::Object(self.handle)
    }

    /// Disarm the guard and hand responsibility for the release to the
    /// caller.
    pub fn into_handle(self) -> NativeHandle {
        let handle = self.handle;
        std::mem::forget(self);
        handle
    }
}

impl Drop for ScopedRef<'_> {
    fn drop(&mut self) {
        self.runtime.release(self.handle);
    }
}
