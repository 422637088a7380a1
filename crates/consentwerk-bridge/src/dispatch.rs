// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Named invocation against the native SDK singleton.
//
// The singleton is re-resolved through its static `getInstance` accessor
// on every call — the native runtime may recreate it at any point in its
// lifecycle, so the handle is never cached. Transient handles created for
// a call (the class ref, the resolved instance wrapper, UI context and
// derived application handles, the boxed initialize flag) are
// scope-released on all exit paths.
//
// Fault policy: zero local recovery. Every fault is logged here with full
// detail and re-raised unchanged to the caller.

use std::sync::Arc;

use tracing::{debug, error};

use consentwerk_core::config::InitializeParams;
use consentwerk_core::error::{ConsentwerkError, Result};

use crate::convert;
use crate::runtime::{NativeRuntime, NativeValue, ScopedRef};

/// Fully-qualified class name of the native SDK singleton.
pub const SDK_CLASS: &str = "io.consentwerk.sdk.Consentwerk";

/// Boxed-boolean class for the initialize flag. The native `initialize`
/// signature takes the boxed type; handing it a primitive would resolve
/// to nothing.
const BOXED_BOOLEAN_CLASS: &str = "java.lang.Boolean";

/// Performs named, typed invocations on the native SDK singleton.
pub struct Dispatcher {
    runtime: Arc<dyn NativeRuntime>,
}

impl Dispatcher {
    pub fn new(runtime: Arc<dyn NativeRuntime>) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Arc<dyn NativeRuntime> {
        &self.runtime
    }

    /// Invoke a void method on the singleton.
    pub fn invoke_void(&self, method: &str, args: Vec<NativeValue>) -> Result<()> {
        self.invoke(method, args).map(|_| ())
    }

    /// Invoke a method and extract a boolean result.
    pub fn invoke_bool(&self, method: &str, args: Vec<NativeValue>) -> Result<bool> {
        let ret = self.invoke(method, args)?;
        convert::to_bool(self.runtime.as_ref(), &ret)
    }

    /// Invoke a method and extract a string result. An absent return is
    /// the empty string.
    pub fn invoke_string(&self, method: &str, args: Vec<NativeValue>) -> Result<String> {
        match self.invoke(method, args)? {
            NativeValue::Str(s) => Ok(s),
            NativeValue::Null | NativeValue::Absent => Ok(String::new()),
            other => Err(ConsentwerkError::conversion("string", other.type_name())),
        }
    }

    /// Invoke a method whose return feeds a converter. The caller owns
    /// whatever handle comes back (the converters release it).
    pub fn invoke_object(&self, method: &str, args: Vec<NativeValue>) -> Result<NativeValue> {
        self.invoke(method, args)
    }

    /// Invoke a void method with the current UI context prepended as the
    /// sole argument. Used only by operations that present UI surfaces.
    ///
    /// A missing UI context surfaces as `NoUiContext` — shaped like any
    /// other dispatch fault, but the kind is preserved since the
    /// underlying accessor can distinguish it.
    pub fn invoke_void_with_ui_context(&self, method: &str) -> Result<()> {
        match self.try_invoke_with_ui_context(method) {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(method, error = %e, "context-injected dispatch failed");
                Err(e)
            }
        }
    }

    /// Dispatch `initialize` with two-level context injection: the
    /// current UI context yields the owning application object, which is
    /// prepended ahead of the caller-supplied arguments.
    pub fn invoke_initialize(&self, params: &InitializeParams) -> Result<()> {
        match self.try_initialize(params) {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(method = "initialize", error = %e, "context-injected dispatch failed");
                Err(e)
            }
        }
    }

    fn invoke(&self, method: &str, mut args: Vec<NativeValue>) -> Result<NativeValue> {
        map_absent_to_null(&mut args);
        match self.invoke_prepared(method, &args) {
            Ok(value) => {
                debug!(method, "native dispatch completed");
                Ok(value)
            }
            Err(e) => {
                error!(method, error = %e, "native dispatch failed");
                Err(e)
            }
        }
    }

    /// Resolve class and singleton, then perform the call. Guards ensure
    /// the transient class and instance refs are released on both the
    /// success and fault paths.
    fn invoke_prepared(&self, method: &str, args: &[NativeValue]) -> Result<NativeValue> {
        let rt = self.runtime.as_ref();
        let class = ScopedRef::new(rt, rt.find_class(SDK_CLASS)?);
        let instance = self.resolve_instance(&class)?;
        rt.call(instance.handle(), method, args)
    }

    fn try_invoke_with_ui_context(&self, method: &str) -> Result<()> {
        let rt = self.runtime.as_ref();
        let context = ScopedRef::new(rt, rt.current_ui_context()?);
        let class = ScopedRef::new(rt, rt.find_class(SDK_CLASS)?);
        let instance = self.resolve_instance(&class)?;
        rt.call(instance.handle(), method, &[context.as_value()])
            .map(|_| ())
    }

    fn try_initialize(&self, params: &InitializeParams) -> Result<()> {
        let rt = self.runtime.as_ref();
        let context = ScopedRef::new(rt, rt.current_ui_context()?);
        let application = match rt.call(context.handle(), "getApplication", &[])? {
            NativeValue::Object(h) => ScopedRef::new(rt, h),
            other => return Err(ConsentwerkError::conversion("application", other.type_name())),
        };

        // The flag crosses as an explicitly constructed boxed boolean;
        // automatic primitive coercion would miss the native signature.
        let flag = ScopedRef::new(
            rt,
            rt.new_object(
                BOXED_BOOLEAN_CLASS,
                &[NativeValue::Str(params.disable_remote_config.to_string())],
            )?,
        );

        let mut args = vec![
            application.as_value(),
            NativeValue::Str(params.api_key.clone()),
            NativeValue::opt_string(params.local_configuration_path.as_deref()),
            NativeValue::opt_string(params.remote_configuration_url.as_deref()),
            NativeValue::opt_string(params.provider_id.as_deref()),
            flag.as_value(),
            NativeValue::Str(params.language_code.clone()),
        ];
        if let Some(notice_id) = &params.notice_id {
            args.push(NativeValue::Str(notice_id.clone()));
        }
        map_absent_to_null(&mut args);

        let class = ScopedRef::new(rt, rt.find_class(SDK_CLASS)?);
        let instance = self.resolve_instance(&class)?;
        rt.call(instance.handle(), "initialize", &args).map(|_| ())
    }

    fn resolve_instance<'rt>(&'rt self, class: &ScopedRef<'_>) -> Result<ScopedRef<'rt>> {
        let rt = self.runtime.as_ref();
        match rt.call_static(class.handle(), "getInstance", &[])? {
            NativeValue::Object(h) => Ok(ScopedRef::new(rt, h)),
            other => Err(ConsentwerkError::conversion("singleton", other.type_name())),
        }
    }
}

/// Rewrite host-side holes to the runtime-typed null sentinel.
///
/// The native call-resolution mechanism raises a method-not-found fault
/// (not a null-pointer fault) when handed a host hole, so every `Absent`
/// entry is replaced before invocation — first and last positions
/// included.
fn map_absent_to_null(args: &mut [NativeValue]) {
    for arg in args.iter_mut() {
        if matches!(arg, NativeValue::Absent) {
            *arg = NativeValue::Null;
        }
    }
}
