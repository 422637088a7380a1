// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Callback proxies and cross-thread delivery.
//
// The native runtime invokes registered proxies from its own threads, at
// any time relative to host calls. Handlers must not run there: a proxy
// only stamps and enqueues the delivery, and the host drains the queue
// from its designated thread via `CallbackRouter::dispatch_pending`.
//
// Registration is fire-and-forget. The native side may hold a proxy
// handle for the whole process lifetime, so every registration is
// retained indefinitely — the base contract has no unregistration path.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use consentwerk_core::error::Result;
use consentwerk_core::types::{ConsentEvent, EventKind, ProxyId};

use crate::convert;
use crate::dispatch::Dispatcher;
use crate::runtime::{NativeRuntime, NativeValue, ProxyInvocation};

/// Native interface implemented by zero-argument callback proxies
/// (ready/error registrations). Its single method is `call`.
const CALLABLE_INTERFACE: &str = "io.consentwerk.sdk.functional.Callable";

/// Native interface implemented by the event-listener proxy. Each
/// notification kind arrives as its own method.
const EVENT_LISTENER_INTERFACE: &str = "io.consentwerk.sdk.functional.EventListener";

/// A delivery captured on a native-runtime thread, waiting for the host
/// thread to drain it.
struct Delivery {
    proxy: ProxyId,
    method: String,
    payload: Vec<NativeValue>,
    received_at: DateTime<Utc>,
}

/// Host-side handler shapes.
enum Handler {
    /// Zero-argument action (ready and error registrations).
    Action(Box<dyn FnMut() + Send>),
    /// Typed event handler (event-listener registration).
    Events(Box<dyn FnMut(&ConsentEvent) + Send>),
}

/// The proxy object handed to the native runtime.
///
/// Invoked from arbitrary threads; it does nothing but timestamp the
/// delivery and enqueue it onto the router's channel.
struct QueueProxy {
    id: ProxyId,
    tx: mpsc::Sender<Delivery>,
}

impl ProxyInvocation for QueueProxy {
    fn invoke(&self, method: &str, args: Vec<NativeValue>) {
        let delivery = Delivery {
            proxy: self.id,
            method: method.to_owned(),
            payload: args,
            received_at: Utc::now(),
        };
        if self.tx.send(delivery).is_err() {
            // Router gone: the process is shutting down.
            warn!(method, "callback delivery dropped: router no longer exists");
        }
    }
}

/// Registry of callback proxies plus the cross-thread delivery queue.
pub struct CallbackRouter {
    dispatcher: Arc<Dispatcher>,
    tx: mpsc::Sender<Delivery>,
    rx: Mutex<mpsc::Receiver<Delivery>>,
    handlers: Mutex<HashMap<ProxyId, Handler>>,
}

impl CallbackRouter {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            dispatcher,
            tx,
            rx: Mutex::new(rx),
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a zero-argument ready action (`onReady`).
    pub fn register_ready(&self, action: Box<dyn FnMut() + Send>) -> Result<ProxyId> {
        self.register("onReady", CALLABLE_INTERFACE, Handler::Action(action))
    }

    /// Register a zero-argument error action (`onError`).
    pub fn register_error(&self, action: Box<dyn FnMut() + Send>) -> Result<ProxyId> {
        self.register("onError", CALLABLE_INTERFACE, Handler::Action(action))
    }

    /// Register a typed event listener (`addEventListener`).
    pub fn register_event_listener(
        &self,
        handler: Box<dyn FnMut(&ConsentEvent) + Send>,
    ) -> Result<ProxyId> {
        self.register("addEventListener", EVENT_LISTENER_INTERFACE, Handler::Events(handler))
    }

    fn register(&self, method: &str, interface: &str, handler: Handler) -> Result<ProxyId> {
        let id = ProxyId::new();
        let rt = self.dispatcher.runtime();
        let proxy = rt.new_proxy(
            interface,
            Arc::new(QueueProxy {
                id,
                tx: self.tx.clone(),
            }),
        )?;

        // Stored before the registration dispatch: the native side may
        // invoke the proxy before the call returns to us.
        lock(&self.handlers).insert(id, handler);

        if let Err(e) = self
            .dispatcher
            .invoke_void(method, vec![NativeValue::Object(proxy)])
        {
            lock(&self.handlers).remove(&id);
            return Err(e);
        }

        debug!(%id, method, "callback proxy registered");
        Ok(id)
    }

    /// Drain queued deliveries on the caller's thread, invoking the
    /// registered handlers. Returns the number of deliveries handled.
    ///
    /// Handlers run outside the router's locks, so a handler is free to
    /// issue bridge calls of its own.
    pub fn dispatch_pending(&self) -> usize {
        let mut handled = 0;
        loop {
            let delivery = match lock(&self.rx).try_recv() {
                Ok(d) => d,
                Err(_) => break,
            };
            if self.deliver(delivery) {
                handled += 1;
            }
        }
        handled
    }

    fn deliver(&self, delivery: Delivery) -> bool {
        let rt = self.dispatcher.runtime().as_ref();

        let Some(mut handler) = lock(&self.handlers).remove(&delivery.proxy) else {
            warn!(proxy = %delivery.proxy, method = %delivery.method, "delivery for unknown proxy dropped");
            release_payload(rt, &delivery.payload);
            return false;
        };

        let handled = match &mut handler {
            Handler::Action(action) => {
                action();
                true
            }
            Handler::Events(events) => match event_from_delivery(rt, &delivery) {
                Some(event) => {
                    events(&event);
                    true
                }
                None => {
                    warn!(method = %delivery.method, "unknown event notification dropped");
                    false
                }
            },
        };

        release_payload(rt, &delivery.payload);
        lock(&self.handlers).insert(delivery.proxy, handler);
        handled
    }
}

/// Convert a raw delivery into a typed event.
///
/// The payload is only borrowed here — `deliver` releases any handles
/// afterwards, exactly once.
fn event_from_delivery(rt: &dyn NativeRuntime, delivery: &Delivery) -> Option<ConsentEvent> {
    let kind = EventKind::from_callback_method(&delivery.method)?;
    let message = delivery.payload.first().and_then(|value| match value {
        NativeValue::Str(s) => Some(s.clone()),
        NativeValue::Object(h) if !h.is_null() => {
            convert::string_getter(rt, *h, "getMessage").ok().flatten()
        }
        _ => None,
    });
    Some(ConsentEvent {
        kind,
        message,
        received_at: delivery.received_at,
    })
}

fn release_payload(rt: &dyn NativeRuntime, payload: &[NativeValue]) {
    for value in payload {
        if let NativeValue::Object(h) = value {
            rt.release(*h);
        }
    }
}

/// Lock with poison recovery: a panicking handler must not wedge the
/// delivery pump for the rest of the process.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
