// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Value conversion between native handles and host domain types.
//
// Conversion is expressed through the runtime's own call protocol:
// collections are walked via `iterator`/`hasNext`/`next`, boxed booleans
// are unwrapped via `booleanValue`, and value objects are copied field by
// field through their getters. Every conversion fully copies the data out
// before the handle's scope closes — no domain value retains a borrowed
// handle.
//
// Ownership convention: a converter takes ownership of every handle
// reachable from the value it is given and releases it before returning,
// so a dispatch return can be fed straight in. The one exception is
// [`from_string_set`], whose result must outlive the dispatch call that
// consumes it; it hands back the guard instead.

use std::collections::{HashMap, HashSet};

use consentwerk_core::error::{ConsentwerkError, Result};
use consentwerk_core::types::{Purpose, Vendor};

use crate::runtime::{NativeHandle, NativeRuntime, NativeValue, ScopedRef};

/// Collection class used for reverse-converted id sets. The element type
/// is the runtime's string class; handing the resulting collection to a
/// method expecting differently-typed elements is a contract violation
/// that surfaces as an invocation failure, never a silent coercion.
const NATIVE_SET_CLASS: &str = "java.util.HashSet";

/// Convert a native string collection into a host set.
///
/// Duplicate elements collapse; an absent or null collection yields an
/// empty set, never a fault and never a null container.
pub fn to_string_set(rt: &dyn NativeRuntime, value: &NativeValue) -> Result<HashSet<String>> {
    let mut out = HashSet::new();
    for_each_element(rt, value, "string collection", |_, element| match element {
        NativeValue::Str(s) => {
            out.insert(s);
            Ok(())
        }
        other => Err(ConsentwerkError::conversion("string element", other.type_name())),
    })?;
    Ok(out)
}

/// Convert a native string-to-string map into a host map.
///
/// Keys with null values are dropped; an absent or null map yields an
/// empty host map.
pub fn to_string_map(rt: &dyn NativeRuntime, value: &NativeValue) -> Result<HashMap<String, String>> {
    let handle = match object_handle(value, "string map")? {
        None => return Ok(HashMap::new()),
        Some(h) => h,
    };
    let map = ScopedRef::new(rt, handle);
    let keys = rt.call(map.handle(), "keySet", &[])?;

    let mut out = HashMap::new();
    for_each_element(rt, &keys, "key set", |rt, element| {
        let key = match element {
            NativeValue::Str(s) => s,
            other => return Err(ConsentwerkError::conversion("string key", other.type_name())),
        };
        match rt.call(map.handle(), "get", &[NativeValue::Str(key.clone())])? {
            NativeValue::Str(v) => {
                out.insert(key, v);
            }
            NativeValue::Null | NativeValue::Absent => {}
            NativeValue::Object(h) if h.is_null() => {}
            other => return Err(ConsentwerkError::conversion("string value", other.type_name())),
        }
        Ok(())
    })?;
    Ok(out)
}

/// Unwrap a boolean result.
///
/// The native side answers with either a primitive or a boxed boolean;
/// an absent return reads as `false`.
pub fn to_bool(rt: &dyn NativeRuntime, value: &NativeValue) -> Result<bool> {
    match value {
        NativeValue::Absent | NativeValue::Null => Ok(false),
        NativeValue::Bool(b) => Ok(*b),
        NativeValue::Object(h) if h.is_null() => Ok(false),
        NativeValue::Object(h) => {
            let boxed = ScopedRef::new(rt, *h);
            match rt.call(boxed.handle(), "booleanValue", &[])? {
                NativeValue::Bool(b) => Ok(b),
                other => Err(ConsentwerkError::conversion("bool", other.type_name())),
            }
        }
        other => Err(ConsentwerkError::conversion("bool", other.type_name())),
    }
}

/// Copy a purpose snapshot out of a native handle.
///
/// A null handle is `None` — the native SDK answers null for unknown ids.
pub fn to_purpose(rt: &dyn NativeRuntime, value: &NativeValue) -> Result<Option<Purpose>> {
    let handle = match object_handle(value, "purpose")? {
        None => return Ok(None),
        Some(h) => h,
    };
    let obj = ScopedRef::new(rt, handle);
    Ok(Some(Purpose {
        id: string_getter(rt, obj.handle(), "getId")?.unwrap_or_default(),
        name: string_getter(rt, obj.handle(), "getName")?,
        description: string_getter(rt, obj.handle(), "getDescription")?,
        description_legal: string_getter(rt, obj.handle(), "getDescriptionLegal")?,
        icon_id: string_getter(rt, obj.handle(), "getIconId")?,
    }))
}

/// Copy a vendor snapshot out of a native handle.
pub fn to_vendor(rt: &dyn NativeRuntime, value: &NativeValue) -> Result<Option<Vendor>> {
    let handle = match object_handle(value, "vendor")? {
        None => return Ok(None),
        Some(h) => h,
    };
    let obj = ScopedRef::new(rt, handle);
    Ok(Some(Vendor {
        id: string_getter(rt, obj.handle(), "getId")?.unwrap_or_default(),
        name: string_getter(rt, obj.handle(), "getName")?,
        policy_url: string_getter(rt, obj.handle(), "getPolicyUrl")?,
        namespace: string_getter(rt, obj.handle(), "getNamespace")?,
        purpose_ids: to_string_set(rt, &rt.call(obj.handle(), "getPurposeIds", &[])?)?,
        leg_int_purpose_ids: to_string_set(rt, &rt.call(obj.handle(), "getLegIntPurposeIds", &[])?)?,
        feature_ids: to_string_set(rt, &rt.call(obj.handle(), "getFeatureIds", &[])?)?,
    }))
}

/// Convert a native collection of purposes into a host set.
pub fn to_purpose_set(rt: &dyn NativeRuntime, value: &NativeValue) -> Result<HashSet<Purpose>> {
    let mut out = HashSet::new();
    for_each_element(rt, value, "purpose collection", |rt, element| {
        if let Some(purpose) = to_purpose(rt, &element)? {
            out.insert(purpose);
        }
        Ok(())
    })?;
    Ok(out)
}

/// Convert a native collection of vendors into a host set.
pub fn to_vendor_set(rt: &dyn NativeRuntime, value: &NativeValue) -> Result<HashSet<Vendor>> {
    let mut out = HashSet::new();
    for_each_element(rt, value, "vendor collection", |rt, element| {
        if let Some(vendor) = to_vendor(rt, &element)? {
            out.insert(vendor);
        }
        Ok(())
    })?;
    Ok(out)
}

/// Reverse conversion: build a native string collection for an argument
/// position.
///
/// The returned guard must stay alive across the dispatch call that
/// consumes it; dropping it releases the transient collection.
pub fn from_string_set<'rt>(
    rt: &'rt dyn NativeRuntime,
    ids: &HashSet<String>,
) -> Result<ScopedRef<'rt>> {
    let set = ScopedRef::new(rt, rt.new_object(NATIVE_SET_CLASS, &[])?);
    for id in ids {
        rt.call(set.handle(), "add", &[NativeValue::Str(id.clone())])?;
    }
    Ok(set)
}

/// Read an optional string off a handle through the named getter.
pub(crate) fn string_getter(
    rt: &dyn NativeRuntime,
    handle: NativeHandle,
    method: &str,
) -> Result<Option<String>> {
    match rt.call(handle, method, &[])? {
        NativeValue::Str(s) => Ok(Some(s)),
        NativeValue::Null | NativeValue::Absent => Ok(None),
        NativeValue::Object(h) if h.is_null() => Ok(None),
        other => Err(ConsentwerkError::conversion("string", other.type_name())),
    }
}

/// Classify a value as an object handle, a permitted absence, or a
/// conversion fault.
fn object_handle(value: &NativeValue, expected: &str) -> Result<Option<NativeHandle>> {
    match value {
        NativeValue::Absent | NativeValue::Null => Ok(None),
        NativeValue::Object(h) if h.is_null() => Ok(None),
        NativeValue::Object(h) => Ok(Some(*h)),
        other => Err(ConsentwerkError::conversion(expected, other.type_name())),
    }
}

/// Walk a native collection via its iterator protocol, feeding each
/// element to `f`. The collection and iterator handles are released on
/// every exit path; element handles are the callback's to consume.
fn for_each_element<F>(
    rt: &dyn NativeRuntime,
    value: &NativeValue,
    expected: &str,
    mut f: F,
) -> Result<()>
where
    F: FnMut(&dyn NativeRuntime, NativeValue) -> Result<()>,
{
    let handle = match object_handle(value, expected)? {
        None => return Ok(()),
        Some(h) => h,
    };
    let collection = ScopedRef::new(rt, handle);
    let iter = match rt.call(collection.handle(), "iterator", &[])? {
        NativeValue::Object(h) => ScopedRef::new(rt, h),
        other => return Err(ConsentwerkError::conversion("iterator", other.type_name())),
    };
    loop {
        match rt.call(iter.handle(), "hasNext", &[])? {
            NativeValue::Bool(false) => break,
            NativeValue::Bool(true) => {}
            other => return Err(ConsentwerkError::conversion("bool", other.type_name())),
        }
        let element = rt.call(iter.handle(), "next", &[])?;
        f(rt, element)?;
    }
    Ok(())
}
