// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android call surface via JNI.
//
// Requires the Android NDK and targets `aarch64-linux-android` or
// `armv7-linux-androideabi`. The SDK singleton lives in the ART runtime;
// every bridge operation goes through reflective call-by-name
// (`Class.getMethods` + `Method.invoke`) so the Rust side needs no
// compile-time knowledge of native signatures.
//
// ## Architecture notes
//
// Handles are process-global: each `NativeHandle` maps to a JNI
// `GlobalRef` in [`HANDLES`]; `release` drops the global ref. The
// singleton itself is re-resolved per call by the dispatcher, never
// cached here.
//
// Callback proxies are `java.lang.reflect.Proxy` instances whose
// invocation handler is the Java glue class
// `io.consentwerk.bridge.NativeInvocationHandler` shipped with the host
// app. Its `invoke` override forwards into the exported
// `nativeProxyInvoke` entry point below — see `ANDROID-INTEGRATION.md`
// for the Java glue source. Proxy invocation targets are retained in
// [`PROXIES`] for the life of the process; there is no unregistration.

#![cfg(target_os = "android")]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use jni::objects::{GlobalRef, JObject, JObjectArray, JString, JValue};
use jni::sys::{jlong, jsize};
use jni::{JNIEnv, JavaVM};

use consentwerk_core::error::{ConsentwerkError, Result};

use crate::runtime::{NativeHandle, NativeRuntime, NativeValue, ProxyInvocation};

/// Java glue class whose instances serve as proxy invocation handlers.
const INVOCATION_HANDLER_CLASS: &str = "io/consentwerk/bridge/NativeInvocationHandler";

/// Global-ref table backing [`NativeHandle`] values.
static HANDLES: OnceLock<Mutex<HashMap<u64, GlobalRef>>> = OnceLock::new();

/// Monotonic handle id source. Zero is reserved for the null sentinel.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Registered proxy invocation targets, keyed by the id baked into the
/// Java-side invocation handler. Never removed: the native SDK may hold
/// the proxy for the rest of the process.
static PROXIES: OnceLock<Mutex<HashMap<i64, Arc<dyn ProxyInvocation>>>> = OnceLock::new();

fn handles() -> &'static Mutex<HashMap<u64, GlobalRef>> {
    HANDLES.get_or_init(|| Mutex::new(HashMap::new()))
}

fn proxies() -> &'static Mutex<HashMap<i64, Arc<dyn ProxyInvocation>>> {
    PROXIES.get_or_init(|| Mutex::new(HashMap::new()))
}

// ---------------------------------------------------------------------------
// JNI bootstrap helpers
// ---------------------------------------------------------------------------

/// Obtain the process `JavaVM` from the global Android context.
fn vm() -> Result<&'static JavaVM> {
    static VM: OnceLock<JavaVM> = OnceLock::new();
    if let Some(vm) = VM.get() {
        return Ok(vm);
    }
    let ctx = ndk_context::android_context();
    // SAFETY: `ctx.vm()` returns the `JavaVM*` set by the NDK glue code.
    // The pointer is valid for the lifetime of the process.
    let vm = unsafe { JavaVM::from_raw(ctx.vm().cast()) }
        .map_err(|e| ConsentwerkError::Native(format!("failed to obtain JavaVM: {e}")))?;
    Ok(VM.get_or_init(|| vm))
}

/// Attach the current thread (if needed) and return its `JNIEnv`.
fn env() -> Result<JNIEnv<'static>> {
    vm()?
        .attach_current_thread_permanently()
        .map_err(|e| jni_err("attach_current_thread", e))
}

/// Map a `jni::errors::Error` into a native-call fault.
fn jni_err(context: &str, e: jni::errors::Error) -> ConsentwerkError {
    ConsentwerkError::Native(format!("{context}: {e}"))
}

/// Intern a local reference as a process-global handle.
fn intern(env: &mut JNIEnv<'_>, obj: &JObject<'_>) -> Result<NativeHandle> {
    if obj.is_null() {
        return Ok(NativeHandle::NULL);
    }
    let global = env
        .new_global_ref(obj)
        .map_err(|e| jni_err("new_global_ref", e))?;
    let id = NEXT_HANDLE.fetch_add(1, Ordering::SeqCst);
    handles()
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .insert(id, global);
    Ok(NativeHandle(id))
}

/// Look up the global ref behind a handle.
fn resolve(handle: NativeHandle) -> Result<GlobalRef> {
    handles()
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .get(&handle.0)
        .cloned()
        .ok_or_else(|| ConsentwerkError::Native(format!("stale or unknown handle {handle}")))
}

/// If the last JNI call raised a Java exception, clear it and map it to
/// a bridge fault. NoSuchMethod-flavoured exceptions become resolution
/// faults so callers can tell a bad name from a failing method body.
fn check_exception(env: &mut JNIEnv<'_>, method: &str) -> Result<()> {
    if !env.exception_check().unwrap_or(false) {
        return Ok(());
    }
    let throwable = env.exception_occurred().ok();
    let _ = env.exception_clear();
    let detail = throwable
        .and_then(|t| {
            let s = env
                .call_method(&t, "toString", "()Ljava/lang/String;", &[])
                .ok()?
                .l()
                .ok()?;
            env.get_string(&JString::from(s)).ok().map(String::from)
        })
        .unwrap_or_else(|| "unidentified native exception".to_owned());
    if detail.contains("NoSuchMethod") {
        Err(ConsentwerkError::resolution(method, detail))
    } else {
        Err(ConsentwerkError::Native(detail))
    }
}

// ---------------------------------------------------------------------------
// Value marshalling
// ---------------------------------------------------------------------------

/// Box a bridge value into a `java.lang.Object` local reference for the
/// reflective argument array. `Absent` never reaches this point — the
/// dispatcher rewrites it to `Null` first.
fn box_value<'local>(env: &mut JNIEnv<'local>, value: &NativeValue) -> Result<JObject<'local>> {
    match value {
        NativeValue::Absent | NativeValue::Null => Ok(JObject::null()),
        NativeValue::Bool(b) => env
            .call_static_method(
                "java/lang/Boolean",
                "valueOf",
                "(Z)Ljava/lang/Boolean;",
                &[JValue::Bool(*b as u8)],
            )
            .and_then(|v| v.l())
            .map_err(|e| jni_err("Boolean.valueOf", e)),
        NativeValue::Int(i) => env
            .call_static_method(
                "java/lang/Long",
                "valueOf",
                "(J)Ljava/lang/Long;",
                &[JValue::Long(*i)],
            )
            .and_then(|v| v.l())
            .map_err(|e| jni_err("Long.valueOf", e)),
        NativeValue::Str(s) => env
            .new_string(s)
            .map(JObject::from)
            .map_err(|e| jni_err("new_string", e)),
        NativeValue::Object(h) => {
            if h.is_null() {
                Ok(JObject::null())
            } else {
                let global = resolve(*h)?;
                env.new_local_ref(global.as_obj())
                    .map_err(|e| jni_err("new_local_ref", e))
            }
        }
    }
}

/// Classify a returned `java.lang.Object` into a bridge value. Strings
/// and boxed primitives come back as scalars; everything else is
/// interned as an object handle.
fn classify<'local>(env: &mut JNIEnv<'local>, obj: JObject<'local>) -> Result<NativeValue> {
    if obj.is_null() {
        return Ok(NativeValue::Null);
    }
    if env
        .is_instance_of(&obj, "java/lang/String")
        .map_err(|e| jni_err("is_instance_of(String)", e))?
    {
        let s = env
            .get_string(&JString::from(obj))
            .map_err(|e| jni_err("get_string", e))?;
        return Ok(NativeValue::Str(String::from(s)));
    }
    if env
        .is_instance_of(&obj, "java/lang/Boolean")
        .map_err(|e| jni_err("is_instance_of(Boolean)", e))?
    {
        let b = env
            .call_method(&obj, "booleanValue", "()Z", &[])
            .and_then(|v| v.z())
            .map_err(|e| jni_err("booleanValue", e))?;
        return Ok(NativeValue::Bool(b));
    }
    if env
        .is_instance_of(&obj, "java/lang/Number")
        .map_err(|e| jni_err("is_instance_of(Number)", e))?
    {
        let i = env
            .call_method(&obj, "longValue", "()J", &[])
            .and_then(|v| v.j())
            .map_err(|e| jni_err("longValue", e))?;
        return Ok(NativeValue::Int(i));
    }
    intern(env, &obj).map(NativeValue::Object)
}

/// Build the `Object[]` argument array for `Method.invoke`.
fn box_args<'local>(
    env: &mut JNIEnv<'local>,
    args: &[NativeValue],
) -> Result<JObjectArray<'local>> {
    let array = env
        .new_object_array(args.len() as jsize, "java/lang/Object", JObject::null())
        .map_err(|e| jni_err("new_object_array", e))?;
    for (i, arg) in args.iter().enumerate() {
        let boxed = box_value(env, arg)?;
        env.set_object_array_element(&array, i as jsize, boxed)
            .map_err(|e| jni_err("set_object_array_element", e))?;
    }
    Ok(array)
}

// ---------------------------------------------------------------------------
// Reflective invocation
// ---------------------------------------------------------------------------

/// Invoke `method` on `target` by name.
///
/// `declaring` is the `java.lang.Class` to search; for instance calls it
/// is `target.getClass()`, for static calls the target itself (with a
/// null receiver passed to `Method.invoke`).
fn invoke_by_name<'local>(
    env: &mut JNIEnv<'local>,
    declaring: &JObject<'local>,
    receiver: &JObject<'local>,
    method: &str,
    args: &[NativeValue],
) -> Result<NativeValue> {
    let methods: JObjectArray = env
        .call_method(
            declaring,
            "getMethods",
            "()[Ljava/lang/reflect/Method;",
            &[],
        )
        .and_then(|v| v.l())
        .map_err(|e| jni_err("getMethods", e))?
        .into();
    let count = env
        .get_array_length(&methods)
        .map_err(|e| jni_err("get_array_length", e))?;

    // First method matching on name and arity wins; argument types are
    // checked by the runtime at invoke time.
    let mut matched: Option<JObject> = None;
    for i in 0..count {
        let candidate = env
            .get_object_array_element(&methods, i)
            .map_err(|e| jni_err("get_object_array_element", e))?;
        let name_obj = env
            .call_method(&candidate, "getName", "()Ljava/lang/String;", &[])
            .and_then(|v| v.l())
            .map_err(|e| jni_err("Method.getName", e))?;
        let name = String::from(
            env.get_string(&JString::from(name_obj))
                .map_err(|e| jni_err("get_string(name)", e))?,
        );
        if name != method {
            continue;
        }
        let arity = env
            .call_method(&candidate, "getParameterCount", "()I", &[])
            .and_then(|v| v.i())
            .map_err(|e| jni_err("getParameterCount", e))?;
        if arity as usize == args.len() {
            matched = Some(candidate);
            break;
        }
    }
    let Some(method_obj) = matched else {
        return Err(ConsentwerkError::resolution(
            method,
            format!("no method of arity {} on target class", args.len()),
        ));
    };

    let boxed_args = box_args(env, args)?;
    let outcome = env.call_method(
        &method_obj,
        "invoke",
        "(Ljava/lang/Object;[Ljava/lang/Object;)Ljava/lang/Object;",
        &[JValue::Object(receiver), JValue::Object(&boxed_args)],
    );
    check_exception(env, method)?;
    let returned = outcome
        .and_then(|v| v.l())
        .map_err(|e| jni_err("Method.invoke", e))?;
    classify(env, returned)
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Android implementation of the native call surface.
///
/// Zero-sized: all state lives in the process-global handle and proxy
/// tables, and in the ART runtime itself.
pub struct AndroidRuntime;

impl AndroidRuntime {
    /// Create the runtime. Does not touch JNI — the first call happens
    /// lazily when an operation is invoked.
    pub fn new() -> Self {
        Self
    }
}

impl Default for AndroidRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeRuntime for AndroidRuntime {
    fn find_class(&self, name: &str) -> Result<NativeHandle> {
        let mut env = env()?;
        let class = env
            .find_class(name.replace('.', "/"))
            .map_err(|e| jni_err("find_class", e))?;
        check_exception(&mut env, name)?;
        intern(&mut env, &class)
    }

    fn call_static(
        &self,
        class: NativeHandle,
        method: &str,
        args: &[NativeValue],
    ) -> Result<NativeValue> {
        let mut env = env()?;
        let class_ref = resolve(class)?;
        let class_obj = env
            .new_local_ref(class_ref.as_obj())
            .map_err(|e| jni_err("new_local_ref(class)", e))?;
        invoke_by_name(&mut env, &class_obj, &JObject::null(), method, args)
    }

    fn call(&self, target: NativeHandle, method: &str, args: &[NativeValue]) -> Result<NativeValue> {
        let mut env = env()?;
        let target_ref = resolve(target)?;
        let target_obj = env
            .new_local_ref(target_ref.as_obj())
            .map_err(|e| jni_err("new_local_ref(target)", e))?;
        let class_obj = env
            .call_method(&target_obj, "getClass", "()Ljava/lang/Class;", &[])
            .and_then(|v| v.l())
            .map_err(|e| jni_err("getClass", e))?;
        invoke_by_name(&mut env, &class_obj, &target_obj, method, args)
    }

    fn new_object(&self, class: &str, args: &[NativeValue]) -> Result<NativeHandle> {
        let mut env = env()?;
        let signature = constructor_signature(args);
        let jni_args: Vec<JObject> = args
            .iter()
            .map(|a| box_value(&mut env, a))
            .collect::<Result<_>>()?;
        let jvalues: Vec<JValue> = jni_args.iter().map(JValue::Object).collect();
        let obj = env
            .new_object(class.replace('.', "/"), &signature, &jvalues)
            .map_err(|e| jni_err("new_object", e))?;
        check_exception(&mut env, class)?;
        intern(&mut env, &obj)
    }

    fn new_proxy(
        &self,
        interface: &str,
        target: Arc<dyn ProxyInvocation>,
    ) -> Result<NativeHandle> {
        let mut env = env()?;

        let id = NEXT_HANDLE.fetch_add(1, Ordering::SeqCst) as i64;
        proxies()
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(id, target);

        let handler = env
            .new_object(INVOCATION_HANDLER_CLASS, "(J)V", &[JValue::Long(id as jlong)])
            .map_err(|e| jni_err("new NativeInvocationHandler", e))?;

        let iface = env
            .find_class(interface.replace('.', "/"))
            .map_err(|e| jni_err("find_class(interface)", e))?;
        let loader = env
            .call_method(&iface, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])
            .and_then(|v| v.l())
            .map_err(|e| jni_err("getClassLoader", e))?;

        let iface_array = env
            .new_object_array(1, "java/lang/Class", &iface)
            .map_err(|e| jni_err("new_object_array(interfaces)", e))?;

        let proxy = env
            .call_static_method(
                "java/lang/reflect/Proxy",
                "newProxyInstance",
                "(Ljava/lang/ClassLoader;[Ljava/lang/Class;Ljava/lang/reflect/InvocationHandler;)Ljava/lang/Object;",
                &[
                    JValue::Object(&loader),
                    JValue::Object(&iface_array),
                    JValue::Object(&handler),
                ],
            )
            .and_then(|v| v.l())
            .map_err(|e| jni_err("Proxy.newProxyInstance", e))?;
        check_exception(&mut env, interface)?;

        tracing::debug!(interface, proxy_id = id, "callback proxy materialised");
        intern(&mut env, &proxy)
    }

    fn current_ui_context(&self) -> Result<NativeHandle> {
        let ctx = ndk_context::android_context();
        let ptr = ctx.context();
        if ptr.is_null() {
            return Err(ConsentwerkError::NoUiContext(
                "Android context is null — no foreground activity".into(),
            ));
        }
        let mut env = env()?;
        // SAFETY: the NDK guarantees this pointer is a valid jobject for
        // the hosting Activity.
        let activity = unsafe { JObject::from_raw(ptr.cast()) };
        intern(&mut env, &activity)
    }

    fn release(&self, handle: NativeHandle) {
        if handle.is_null() {
            return;
        }
        handles()
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&handle.0);
    }
}

/// JNI signature for a constructor taking the boxed forms of `args`.
fn constructor_signature(args: &[NativeValue]) -> String {
    let mut sig = String::from("(");
    for arg in args {
        sig.push_str(match arg {
            NativeValue::Str(_) => "Ljava/lang/String;",
            NativeValue::Bool(_) => "Ljava/lang/Boolean;",
            NativeValue::Int(_) => "J",
            _ => "Ljava/lang/Object;",
        });
    }
    sig.push_str(")V");
    sig
}

// ---------------------------------------------------------------------------
// Proxy entry point
// ---------------------------------------------------------------------------

/// Called by `NativeInvocationHandler.invoke` on whichever runtime
/// thread delivers the notification. Converts the method name and
/// argument array, then forwards to the registered invocation target,
/// which only enqueues. Exceptions must not cross back into Java, so
/// every fault is logged and swallowed here.
#[unsafe(no_mangle)]
pub extern "system" fn Java_io_consentwerk_bridge_NativeInvocationHandler_nativeProxyInvoke(
    mut env: JNIEnv<'_>,
    _this: JObject<'_>,
    id: jlong,
    method: JString<'_>,
    args: JObjectArray<'_>,
) {
    let Some(target) = proxies()
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .get(&id)
        .cloned()
    else {
        tracing::warn!(proxy_id = id, "proxy invocation for unknown target dropped");
        return;
    };

    let method_name = match env.get_string(&method) {
        Ok(s) => String::from(s),
        Err(e) => {
            tracing::warn!(error = %e, "could not read proxy method name");
            return;
        }
    };

    let mut payload = Vec::new();
    if !args.is_null() {
        let count = env.get_array_length(&args).unwrap_or(0);
        for i in 0..count {
            let element = match env.get_object_array_element(&args, i) {
                Ok(obj) => obj,
                Err(e) => {
                    tracing::warn!(error = %e, index = i, "could not read proxy argument");
                    continue;
                }
            };
            match classify(&mut env, element) {
                Ok(value) => payload.push(value),
                Err(e) => tracing::warn!(error = %e, index = i, "could not classify proxy argument"),
            }
        }
    }

    target.invoke(&method_name, payload);
}
