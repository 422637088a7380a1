// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory native runtime used by the unit tests.
//
// Models just enough of the native object graph for the bridge: the SDK
// singleton with a programmable method table, string/object collections
// speaking the iterator protocol, boxed booleans, an activity with a
// derived application, and callback proxies that tests can invoke from
// foreign threads. Invocations against the singleton are recorded with
// rendered argument lists so tests can inspect exactly what crossed the
// boundary.
//
// Faithfulness notes: like the real call-resolution mechanism, the fake
// raises a method-resolution fault when handed a host-side hole
// (`NativeValue::Absent`), and calls against released handles fail. The
// singleton and registered proxies survive `release` — those objects are
// owned by the native side, releasing only drops the bridge's wrapper.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use consentwerk_core::error::{ConsentwerkError, Result};

use crate::runtime::{NativeHandle, NativeRuntime, NativeValue, ProxyInvocation};

const SINGLETON_ID: u64 = 1;

/// One recorded invocation against the SDK singleton.
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: String,
    pub rendered_args: Vec<String>,
}

#[derive(Clone)]
enum FakeObject {
    Class(String),
    Singleton,
    Activity,
    Application,
    StringSet(Vec<String>),
    ObjectSet(Vec<NativeHandle>),
    StringMap(Vec<(String, String)>),
    Iter(Vec<NativeValue>, usize),
    Purpose {
        id: String,
        name: Option<String>,
        description: Option<String>,
    },
    Vendor {
        id: String,
        name: Option<String>,
        purpose_ids: Vec<String>,
        leg_int_purpose_ids: Vec<String>,
        feature_ids: Vec<String>,
    },
    Boxed(bool),
    Proxy(Arc<dyn ProxyInvocation>),
    Event(Option<String>),
}

struct State {
    objects: HashMap<u64, FakeObject>,
    next_id: u64,
    calls: Vec<RecordedCall>,
    released: Vec<NativeHandle>,
    proxies: Vec<NativeHandle>,
}

impl State {
    fn alloc(&mut self, object: FakeObject) -> NativeHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.insert(id, object);
        NativeHandle(id)
    }
}

type Reply = Box<dyn Fn(&FakeRuntime) -> Result<NativeValue> + Send>;

pub(crate) struct FakeRuntime {
    state: Mutex<State>,
    replies: Mutex<HashMap<String, Reply>>,
    instance_resolutions: AtomicUsize,
    ui_context_available: AtomicBool,
}

impl FakeRuntime {
    pub fn new() -> Self {
        let mut objects = HashMap::new();
        objects.insert(SINGLETON_ID, FakeObject::Singleton);
        Self {
            state: Mutex::new(State {
                objects,
                next_id: SINGLETON_ID + 1,
                calls: Vec::new(),
                released: Vec::new(),
                proxies: Vec::new(),
            }),
            replies: Mutex::new(HashMap::new()),
            instance_resolutions: AtomicUsize::new(0),
            ui_context_available: AtomicBool::new(true),
        }
    }

    // -- Inspection ---------------------------------------------------------

    pub fn singleton_handle(&self) -> NativeHandle {
        NativeHandle(SINGLETON_ID)
    }

    pub fn singleton_calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    pub fn released(&self) -> Vec<NativeHandle> {
        self.state().released.clone()
    }

    /// Proxy handles in registration order.
    pub fn proxies(&self) -> Vec<NativeHandle> {
        self.state().proxies.clone()
    }

    /// How many times the singleton was resolved via `getInstance`.
    pub fn instance_resolutions(&self) -> usize {
        self.instance_resolutions.load(Ordering::SeqCst)
    }

    /// Handles still alive that the bridge was responsible for releasing.
    pub fn live_transient_count(&self) -> usize {
        self.state()
            .objects
            .values()
            .filter(|obj| !matches!(obj, FakeObject::Singleton | FakeObject::Proxy(_)))
            .count()
    }

    pub fn set_ui_context_available(&self, available: bool) {
        self.ui_context_available.store(available, Ordering::SeqCst);
    }

    /// Simulate the native side invoking a registered proxy. Tests call
    /// this from spawned threads to model foreign-thread delivery.
    pub fn invoke_proxy(&self, handle: NativeHandle, method: &str, args: Vec<NativeValue>) {
        let target = match self.state().objects.get(&handle.0) {
            Some(FakeObject::Proxy(target)) => Arc::clone(target),
            _ => panic!("no proxy registered under {handle}"),
        };
        target.invoke(method, args);
    }

    // -- Object construction ------------------------------------------------

    pub fn alloc_string_set(&self, items: &[&str]) -> NativeHandle {
        self.alloc_string_set_owned(items.iter().map(|s| s.to_string()).collect())
    }

    fn alloc_string_set_owned(&self, items: Vec<String>) -> NativeHandle {
        self.state().alloc(FakeObject::StringSet(items))
    }

    pub fn alloc_string_map(&self, entries: &[(&str, &str)]) -> NativeHandle {
        let entries = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.state().alloc(FakeObject::StringMap(entries))
    }

    pub fn alloc_boxed_bool(&self, value: bool) -> NativeHandle {
        self.state().alloc(FakeObject::Boxed(value))
    }

    pub fn alloc_purpose(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> NativeHandle {
        self.state().alloc(FakeObject::Purpose {
            id: id.to_owned(),
            name: name.map(str::to_owned),
            description: description.map(str::to_owned),
        })
    }

    pub fn alloc_vendor(
        &self,
        id: &str,
        name: Option<&str>,
        purpose_ids: &[&str],
        leg_int_purpose_ids: &[&str],
        feature_ids: &[&str],
    ) -> NativeHandle {
        self.state().alloc(FakeObject::Vendor {
            id: id.to_owned(),
            name: name.map(str::to_owned),
            purpose_ids: purpose_ids.iter().map(|s| s.to_string()).collect(),
            leg_int_purpose_ids: leg_int_purpose_ids.iter().map(|s| s.to_string()).collect(),
            feature_ids: feature_ids.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn alloc_purpose_set(&self, purposes: &[(&str, &str)]) -> NativeHandle {
        let handles: Vec<NativeHandle> = purposes
            .iter()
            .map(|(id, name)| self.alloc_purpose(id, Some(name), None))
            .collect();
        self.state().alloc(FakeObject::ObjectSet(handles))
    }

    pub fn alloc_event(&self, message: Option<&str>) -> NativeHandle {
        self.state().alloc(FakeObject::Event(message.map(str::to_owned)))
    }

    // -- Singleton method table ---------------------------------------------

    pub fn stub_bool(&self, method: &str, value: bool) {
        self.stub(method, move |_| Ok(NativeValue::Bool(value)));
    }

    pub fn stub_boxed_bool(&self, method: &str, value: bool) {
        self.stub(method, move |rt| {
            Ok(NativeValue::Object(rt.alloc_boxed_bool(value)))
        });
    }

    pub fn stub_string_set(&self, method: &str, items: &[&str]) {
        let items: Vec<String> = items.iter().map(|s| s.to_string()).collect();
        self.stub(method, move |rt| {
            Ok(NativeValue::Object(rt.alloc_string_set_owned(items.clone())))
        });
    }

    pub fn stub_purpose_set(&self, method: &str, purposes: &[(&str, &str)]) {
        let purposes: Vec<(String, String)> = purposes
            .iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect();
        self.stub(method, move |rt| {
            let pairs: Vec<(&str, &str)> = purposes
                .iter()
                .map(|(id, name)| (id.as_str(), name.as_str()))
                .collect();
            Ok(NativeValue::Object(rt.alloc_purpose_set(&pairs)))
        });
    }

    pub fn stub_string_map(&self, method: &str, entries: &[(&str, &str)]) {
        let entries: Vec<(String, String)> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.stub(method, move |rt| {
            let pairs: Vec<(&str, &str)> = entries
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            Ok(NativeValue::Object(rt.alloc_string_map(&pairs)))
        });
    }

    /// Make the named singleton method fault with a resolution error.
    pub fn stub_fault(&self, method: &str, detail: &str) {
        let method_name = method.to_owned();
        let detail = detail.to_owned();
        self.stub(method, move |_| {
            Err(ConsentwerkError::resolution(
                method_name.clone(),
                detail.clone(),
            ))
        });
    }

    fn stub(
        &self,
        method: &str,
        reply: impl Fn(&FakeRuntime) -> Result<NativeValue> + Send + 'static,
    ) {
        self.replies
            .lock()
            .expect("fake reply table poisoned")
            .insert(method.to_owned(), Box::new(reply));
    }

    // -- Internals ----------------------------------------------------------

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake runtime state poisoned")
    }

    fn render(objects: &HashMap<u64, FakeObject>, value: &NativeValue) -> String {
        match value {
            NativeValue::Absent => "absent".into(),
            NativeValue::Null => "null".into(),
            NativeValue::Bool(b) => format!("bool:{b}"),
            NativeValue::Int(i) => format!("int:{i}"),
            NativeValue::Str(s) => format!("str:{s}"),
            NativeValue::Object(h) if h.is_null() => "null".into(),
            NativeValue::Object(h) => match objects.get(&h.0) {
                None => "stale".into(),
                Some(FakeObject::Class(name)) => format!("class:{name}"),
                Some(FakeObject::Singleton) => "singleton".into(),
                Some(FakeObject::Activity) => "activity".into(),
                Some(FakeObject::Application) => "application".into(),
                Some(FakeObject::StringSet(items)) => {
                    let mut sorted = items.clone();
                    sorted.sort();
                    format!("set:{}", sorted.join(","))
                }
                Some(FakeObject::ObjectSet(_)) => "objects".into(),
                Some(FakeObject::StringMap(_)) => "map".into(),
                Some(FakeObject::Iter(..)) => "iter".into(),
                Some(FakeObject::Purpose { id, .. }) => format!("purpose:{id}"),
                Some(FakeObject::Vendor { id, .. }) => format!("vendor:{id}"),
                Some(FakeObject::Boxed(b)) => format!("boxed:{b}"),
                Some(FakeObject::Proxy(_)) => "proxy".into(),
                Some(FakeObject::Event(_)) => "event".into(),
            },
        }
    }

    fn call_singleton(&self, method: &str, args: &[NativeValue]) -> Result<NativeValue> {
        // The real call-resolution mechanism cannot match a method when a
        // host-side hole appears anywhere in the argument list.
        if args.iter().any(|a| matches!(a, NativeValue::Absent)) {
            return Err(ConsentwerkError::resolution(
                method,
                "host-side hole in argument list broke method resolution",
            ));
        }

        {
            let mut state = self.state();
            let rendered_args = args
                .iter()
                .map(|a| Self::render(&state.objects, a))
                .collect();
            state.calls.push(RecordedCall {
                method: method.to_owned(),
                rendered_args,
            });
        }

        let replies = self.replies.lock().expect("fake reply table poisoned");
        match replies.get(method) {
            Some(reply) => reply(self),
            None => Ok(NativeValue::Null),
        }
    }

    fn call_object(
        &self,
        target: NativeHandle,
        method: &str,
        args: &[NativeValue],
    ) -> Result<NativeValue> {
        let mut state = self.state();
        let object = match state.objects.get(&target.0) {
            Some(object) => object.clone(),
            None => {
                return Err(ConsentwerkError::Native(format!(
                    "call on stale or unknown handle {target}"
                )));
            }
        };

        let unresolved =
            || -> Result<NativeValue> { Err(ConsentwerkError::resolution(method, "no such method")) };

        match object {
            FakeObject::Singleton => unreachable!("singleton calls handled separately"),
            FakeObject::Class(_) | FakeObject::Proxy(_) | FakeObject::Application => unresolved(),
            FakeObject::Activity => match method {
                "getApplication" => Ok(NativeValue::Object(state.alloc(FakeObject::Application))),
                _ => unresolved(),
            },
            FakeObject::Boxed(b) => match method {
                "booleanValue" => Ok(NativeValue::Bool(b)),
                _ => unresolved(),
            },
            FakeObject::Event(message) => match method {
                "getMessage" => Ok(match message {
                    Some(m) => NativeValue::Str(m),
                    None => NativeValue::Null,
                }),
                _ => unresolved(),
            },
            FakeObject::StringSet(items) => match method {
                "size" => Ok(NativeValue::Int(items.len() as i64)),
                "iterator" => {
                    let elements = items.into_iter().map(NativeValue::Str).collect();
                    Ok(NativeValue::Object(state.alloc(FakeObject::Iter(elements, 0))))
                }
                "add" => match args {
                    [NativeValue::Str(s)] => {
                        let added = !items.contains(s);
                        if added {
                            if let Some(FakeObject::StringSet(stored)) =
                                state.objects.get_mut(&target.0)
                            {
                                stored.push(s.clone());
                            }
                        }
                        Ok(NativeValue::Bool(added))
                    }
                    _ => unresolved(),
                },
                _ => unresolved(),
            },
            FakeObject::ObjectSet(handles) => match method {
                "size" => Ok(NativeValue::Int(handles.len() as i64)),
                "iterator" => {
                    let elements = handles.into_iter().map(NativeValue::Object).collect();
                    Ok(NativeValue::Object(state.alloc(FakeObject::Iter(elements, 0))))
                }
                _ => unresolved(),
            },
            FakeObject::StringMap(entries) => match method {
                "keySet" => {
                    let keys = entries.iter().map(|(k, _)| k.clone()).collect();
                    Ok(NativeValue::Object(state.alloc(FakeObject::StringSet(keys))))
                }
                "get" => match args {
                    [NativeValue::Str(key)] => Ok(entries
                        .iter()
                        .find(|(k, _)| k == key)
                        .map(|(_, v)| NativeValue::Str(v.clone()))
                        .unwrap_or(NativeValue::Null)),
                    _ => unresolved(),
                },
                _ => unresolved(),
            },
            FakeObject::Iter(elements, pos) => match method {
                "hasNext" => Ok(NativeValue::Bool(pos < elements.len())),
                "next" => {
                    if pos >= elements.len() {
                        return Err(ConsentwerkError::Native("iterator exhausted".into()));
                    }
                    let element = elements[pos].clone();
                    if let Some(FakeObject::Iter(_, stored_pos)) = state.objects.get_mut(&target.0)
                    {
                        *stored_pos += 1;
                    }
                    Ok(element)
                }
                _ => unresolved(),
            },
            FakeObject::Purpose {
                id,
                name,
                description,
            } => {
                let opt = |v: Option<String>| match v {
                    Some(s) => NativeValue::Str(s),
                    None => NativeValue::Null,
                };
                match method {
                    "getId" => Ok(NativeValue::Str(id)),
                    "getName" => Ok(opt(name)),
                    "getDescription" => Ok(opt(description)),
                    "getDescriptionLegal" | "getIconId" => Ok(NativeValue::Null),
                    _ => unresolved(),
                }
            }
            FakeObject::Vendor {
                id,
                name,
                purpose_ids,
                leg_int_purpose_ids,
                feature_ids,
            } => match method {
                "getId" => Ok(NativeValue::Str(id)),
                "getName" => Ok(match name {
                    Some(s) => NativeValue::Str(s),
                    None => NativeValue::Null,
                }),
                "getPolicyUrl" | "getNamespace" => Ok(NativeValue::Null),
                "getPurposeIds" => {
                    Ok(NativeValue::Object(state.alloc(FakeObject::StringSet(purpose_ids))))
                }
                "getLegIntPurposeIds" => Ok(NativeValue::Object(
                    state.alloc(FakeObject::StringSet(leg_int_purpose_ids)),
                )),
                "getFeatureIds" => {
                    Ok(NativeValue::Object(state.alloc(FakeObject::StringSet(feature_ids))))
                }
                _ => unresolved(),
            },
        }
    }
}

impl NativeRuntime for FakeRuntime {
    fn find_class(&self, name: &str) -> Result<NativeHandle> {
        Ok(self.state().alloc(FakeObject::Class(name.to_owned())))
    }

    fn call_static(
        &self,
        class: NativeHandle,
        method: &str,
        _args: &[NativeValue],
    ) -> Result<NativeValue> {
        match self.state().objects.get(&class.0) {
            Some(FakeObject::Class(_)) if method == "getInstance" => {
                self.instance_resolutions.fetch_add(1, Ordering::SeqCst);
                Ok(NativeValue::Object(self.singleton_handle()))
            }
            Some(FakeObject::Class(_)) => {
                Err(ConsentwerkError::resolution(method, "no such static method"))
            }
            _ => Err(ConsentwerkError::Native(format!(
                "static call on non-class handle {class}"
            ))),
        }
    }

    fn call(&self, target: NativeHandle, method: &str, args: &[NativeValue]) -> Result<NativeValue> {
        if target == self.singleton_handle() {
            self.call_singleton(method, args)
        } else {
            self.call_object(target, method, args)
        }
    }

    fn new_object(&self, class: &str, args: &[NativeValue]) -> Result<NativeHandle> {
        match (class, args) {
            ("java.util.HashSet", []) => Ok(self.state().alloc(FakeObject::StringSet(Vec::new()))),
            ("java.lang.Boolean", [NativeValue::Str(s)]) => {
                Ok(self.state().alloc(FakeObject::Boxed(s == "true")))
            }
            _ => Err(ConsentwerkError::Native(format!(
                "cannot construct {class} from {} argument(s)",
                args.len()
            ))),
        }
    }

    fn new_proxy(
        &self,
        _interface: &str,
        target: Arc<dyn ProxyInvocation>,
    ) -> Result<NativeHandle> {
        let mut state = self.state();
        let handle = state.alloc(FakeObject::Proxy(target));
        state.proxies.push(handle);
        Ok(handle)
    }

    fn current_ui_context(&self) -> Result<NativeHandle> {
        if !self.ui_context_available.load(Ordering::SeqCst) {
            return Err(ConsentwerkError::NoUiContext(
                "no foreground activity".into(),
            ));
        }
        Ok(self.state().alloc(FakeObject::Activity))
    }

    fn release(&self, handle: NativeHandle) {
        if handle.is_null() {
            return;
        }
        let mut state = self.state();
        // Native-owned objects survive the bridge dropping its wrapper.
        let keep = matches!(
            state.objects.get(&handle.0),
            Some(FakeObject::Singleton | FakeObject::Proxy(_))
        );
        if !keep {
            state.objects.remove(&handle.0);
        }
        state.released.push(handle);
    }
}
