// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub call surface for desktop/CI builds where the native runtime is
// unavailable.
//
// Every operation returns `PlatformUnavailable` — the real implementation
// lives in the `android` module.

use std::sync::Arc;

use tracing::warn;

use consentwerk_core::error::{ConsentwerkError, Result};

use crate::runtime::{NativeHandle, NativeRuntime, NativeValue, ProxyInvocation};

/// No-op call surface returned on non-mobile platforms.
pub struct StubRuntime;

impl NativeRuntime for StubRuntime {
    fn find_class(&self, name: &str) -> Result<NativeHandle> {
        warn!(class = name, "NativeRuntime::find_class called on stub runtime");
        Err(ConsentwerkError::PlatformUnavailable)
    }

    fn call_static(
        &self,
        _class: NativeHandle,
        method: &str,
        _args: &[NativeValue],
    ) -> Result<NativeValue> {
        warn!(method, "NativeRuntime::call_static called on stub runtime");
        Err(ConsentwerkError::PlatformUnavailable)
    }

    fn call(
        &self,
        _target: NativeHandle,
        method: &str,
        _args: &[NativeValue],
    ) -> Result<NativeValue> {
        warn!(method, "NativeRuntime::call called on stub runtime");
        Err(ConsentwerkError::PlatformUnavailable)
    }

    fn new_object(&self, class: &str, _args: &[NativeValue]) -> Result<NativeHandle> {
        warn!(class, "NativeRuntime::new_object called on stub runtime");
        Err(ConsentwerkError::PlatformUnavailable)
    }

    fn new_proxy(
        &self,
        interface: &str,
        _target: Arc<dyn ProxyInvocation>,
    ) -> Result<NativeHandle> {
        warn!(interface, "NativeRuntime::new_proxy called on stub runtime");
        Err(ConsentwerkError::PlatformUnavailable)
    }

    fn current_ui_context(&self) -> Result<NativeHandle> {
        Err(ConsentwerkError::PlatformUnavailable)
    }

    fn release(&self, _handle: NativeHandle) {}
}
