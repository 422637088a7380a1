// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain values for the Consentwerk bridge.
//
// These are plain snapshots copied out of native handles at conversion
// time. Once converted they are independent of the native object's
// lifetime — no snapshot retains a borrowed handle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Identity of a registered callback proxy.
///
/// The native side may hold the proxy handle for the whole process
/// lifetime, so a registration is never dropped once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyId(pub Uuid);

impl ProxyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProxyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProxyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A data-processing purpose declared by the native SDK.
///
/// Identity is the declared `id`: two snapshots with the same id collapse
/// in sets regardless of their display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purpose {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub description_legal: Option<String>,
    pub icon_id: Option<String>,
}

impl PartialEq for Purpose {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Purpose {}

impl Hash for Purpose {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A vendor declared by the native SDK.
///
/// Identity is the declared `id`, same as [`Purpose`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub id: String,
    pub name: Option<String>,
    pub policy_url: Option<String>,
    pub namespace: Option<String>,
    pub purpose_ids: HashSet<String>,
    pub leg_int_purpose_ids: HashSet<String>,
    pub feature_ids: HashSet<String>,
}

impl PartialEq for Vendor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Vendor {}

impl Hash for Vendor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Identifier sets for the general user-status update.
///
/// Consent and legitimate-interest legal bases are separated for both
/// purposes and vendors; the deprecated consent-only operation fills the
/// legitimate-interest sets with empties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserStatusParams {
    pub enabled_consent_purpose_ids: HashSet<String>,
    pub disabled_consent_purpose_ids: HashSet<String>,
    pub enabled_li_purpose_ids: HashSet<String>,
    pub disabled_li_purpose_ids: HashSet<String>,
    pub enabled_consent_vendor_ids: HashSet<String>,
    pub disabled_consent_vendor_ids: HashSet<String>,
    pub enabled_li_vendor_ids: HashSet<String>,
    pub disabled_li_vendor_ids: HashSet<String>,
}

/// Notification kinds delivered through the event-listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    ConsentChanged,
    NoticeShown,
    NoticeHidden,
    PreferencesShown,
    PreferencesHidden,
    Error,
}

impl EventKind {
    /// Map a native callback method name onto an event kind.
    ///
    /// Returns `None` for method names this bridge does not understand;
    /// unknown notifications are dropped with a warning rather than
    /// faulting the delivery pump.
    pub fn from_callback_method(method: &str) -> Option<Self> {
        match method {
            "consentChanged" => Some(Self::ConsentChanged),
            "noticeShown" => Some(Self::NoticeShown),
            "noticeHidden" => Some(Self::NoticeHidden),
            "preferencesShown" => Some(Self::PreferencesShown),
            "preferencesHidden" => Some(Self::PreferencesHidden),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A notification received from the native SDK, converted and stamped at
/// the moment the bridge's proxy was invoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentEvent {
    pub kind: EventKind,
    /// Optional payload message (e.g. the description of an error event).
    pub message: Option<String>,
    pub received_at: DateTime<Utc>,
}
