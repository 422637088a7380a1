// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Public operation surface of the bridge.
//
// Every operation is a plain synchronous dispatch against the native
// singleton; the bridge tracks no consent state of its own. Readiness
// lives on the native side: `initialize` returns as soon as the call is
// issued, and the transition to ready is observed only through a
// previously registered `on_ready` callback. Register `on_ready` and
// `on_error` before (or immediately after) calling `initialize`, or the
// transition can be missed. Calling query or mutation operations before
// the SDK is ready is tolerated or rejected by the native side, not by
// this layer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, instrument, warn};

use consentwerk_core::config::InitializeParams;
use consentwerk_core::error::Result;
use consentwerk_core::types::{ConsentEvent, Purpose, ProxyId, UserStatusParams, Vendor};

use crate::callback::CallbackRouter;
use crate::convert;
use crate::dispatch::Dispatcher;
use crate::runtime::{NativeRuntime, NativeValue};

/// Host-side handle on the native consent-management SDK.
pub struct Consentwerk {
    dispatcher: Arc<Dispatcher>,
    router: CallbackRouter,
}

impl Consentwerk {
    /// Create a bridge over the given native call surface.
    ///
    /// Registers the bridge's own ready hook, which performs the
    /// one-time post-init `setUserAgent` call identifying this crate to
    /// the native SDK. Construction therefore already talks to the
    /// runtime and faults if it is unreachable.
    pub fn new(runtime: Arc<dyn NativeRuntime>) -> Result<Self> {
        let dispatcher = Arc::new(Dispatcher::new(runtime));
        let router = CallbackRouter::new(Arc::clone(&dispatcher));

        let hook = Arc::clone(&dispatcher);
        router.register_ready(Box::new(move || {
            let result = hook.invoke_void(
                "setUserAgent",
                vec![
                    NativeValue::Str(env!("CARGO_PKG_NAME").to_owned()),
                    NativeValue::Str(env!("CARGO_PKG_VERSION").to_owned()),
                ],
            );
            if let Err(e) = result {
                // Callback context: nowhere to propagate, the host sees
                // the SDK come up without a user agent.
                warn!(error = %e, "setUserAgent after ready failed");
            }
        }))?;

        Ok(Self { dispatcher, router })
    }

    /// Bridge over the platform's own native runtime.
    pub fn for_platform() -> Result<Self> {
        Self::new(crate::platform_runtime())
    }

    fn rt(&self) -> &dyn NativeRuntime {
        self.dispatcher.runtime().as_ref()
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Start native SDK initialization.
    ///
    /// Issues a single context-injected dispatch and returns without
    /// waiting for readiness.
    #[instrument(skip_all)]
    pub fn initialize(&self, params: &InitializeParams) -> Result<()> {
        info!(language = %params.language_code, "initializing native SDK");
        self.dispatcher.invoke_initialize(params)
    }

    /// Whether the native SDK has finished initializing.
    pub fn is_ready(&self) -> Result<bool> {
        self.dispatcher.invoke_bool("isReady", vec![])
    }

    /// Clear all stored consent information.
    pub fn reset(&self) -> Result<()> {
        self.dispatcher.invoke_void("reset", vec![])
    }

    /// Change the language used for notice and preference texts.
    pub fn update_selected_language(&self, language_code: &str) -> Result<()> {
        self.dispatcher
            .invoke_void("updateSelectedLanguage", vec![language_code.into()])
    }

    // -- Callback registration ---------------------------------------------
    //
    // Registrations are permanent: the native side may hold the proxy
    // handle for the rest of the process, so there is no unregistration.

    /// Run `action` when the native SDK becomes ready. Fires immediately
    /// (on the next `dispatch_pending`) if the SDK already is.
    pub fn on_ready<F>(&self, action: F) -> Result<ProxyId>
    where
        F: FnMut() + Send + 'static,
    {
        self.router.register_ready(Box::new(action))
    }

    /// Run `action` when the native SDK signals an initialization error.
    pub fn on_error<F>(&self, action: F) -> Result<ProxyId>
    where
        F: FnMut() + Send + 'static,
    {
        self.router.register_error(Box::new(action))
    }

    /// Receive typed SDK notifications (consent changes, notice and
    /// preference visibility, errors).
    pub fn add_event_listener<F>(&self, handler: F) -> Result<ProxyId>
    where
        F: FnMut(&ConsentEvent) + Send + 'static,
    {
        self.router.register_event_listener(Box::new(handler))
    }

    /// Drain pending callback deliveries on the calling thread.
    ///
    /// Native notifications arrive on arbitrary runtime threads and are
    /// queued; handlers only ever run inside this call. Returns the
    /// number of deliveries handled.
    pub fn dispatch_pending(&self) -> usize {
        self.router.dispatch_pending()
    }

    // -- Purpose and vendor queries ----------------------------------------

    pub fn get_enabled_purposes(&self) -> Result<HashSet<Purpose>> {
        let ret = self.dispatcher.invoke_object("getEnabledPurposes", vec![])?;
        convert::to_purpose_set(self.rt(), &ret)
    }

    pub fn get_enabled_purpose_ids(&self) -> Result<HashSet<String>> {
        let ret = self.dispatcher.invoke_object("getEnabledPurposeIds", vec![])?;
        convert::to_string_set(self.rt(), &ret)
    }

    pub fn get_disabled_purposes(&self) -> Result<HashSet<Purpose>> {
        let ret = self.dispatcher.invoke_object("getDisabledPurposes", vec![])?;
        convert::to_purpose_set(self.rt(), &ret)
    }

    pub fn get_disabled_purpose_ids(&self) -> Result<HashSet<String>> {
        let ret = self.dispatcher.invoke_object("getDisabledPurposeIds", vec![])?;
        convert::to_string_set(self.rt(), &ret)
    }

    pub fn get_required_purposes(&self) -> Result<HashSet<Purpose>> {
        let ret = self.dispatcher.invoke_object("getRequiredPurposes", vec![])?;
        convert::to_purpose_set(self.rt(), &ret)
    }

    pub fn get_required_purpose_ids(&self) -> Result<HashSet<String>> {
        let ret = self.dispatcher.invoke_object("getRequiredPurposeIds", vec![])?;
        convert::to_string_set(self.rt(), &ret)
    }

    pub fn get_enabled_vendors(&self) -> Result<HashSet<Vendor>> {
        let ret = self.dispatcher.invoke_object("getEnabledVendors", vec![])?;
        convert::to_vendor_set(self.rt(), &ret)
    }

    pub fn get_enabled_vendor_ids(&self) -> Result<HashSet<String>> {
        let ret = self.dispatcher.invoke_object("getEnabledVendorIds", vec![])?;
        convert::to_string_set(self.rt(), &ret)
    }

    pub fn get_disabled_vendors(&self) -> Result<HashSet<Vendor>> {
        let ret = self.dispatcher.invoke_object("getDisabledVendors", vec![])?;
        convert::to_vendor_set(self.rt(), &ret)
    }

    pub fn get_disabled_vendor_ids(&self) -> Result<HashSet<String>> {
        let ret = self.dispatcher.invoke_object("getDisabledVendorIds", vec![])?;
        convert::to_string_set(self.rt(), &ret)
    }

    pub fn get_required_vendors(&self) -> Result<HashSet<Vendor>> {
        let ret = self.dispatcher.invoke_object("getRequiredVendors", vec![])?;
        convert::to_vendor_set(self.rt(), &ret)
    }

    pub fn get_required_vendor_ids(&self) -> Result<HashSet<String>> {
        let ret = self.dispatcher.invoke_object("getRequiredVendorIds", vec![])?;
        convert::to_string_set(self.rt(), &ret)
    }

    /// Look up a single purpose. `None` if the id is unknown.
    pub fn get_purpose(&self, purpose_id: &str) -> Result<Option<Purpose>> {
        let ret = self
            .dispatcher
            .invoke_object("getPurpose", vec![purpose_id.into()])?;
        convert::to_purpose(self.rt(), &ret)
    }

    /// Look up a single vendor. `None` if the id is unknown.
    pub fn get_vendor(&self, vendor_id: &str) -> Result<Option<Vendor>> {
        let ret = self
            .dispatcher
            .invoke_object("getVendor", vec![vendor_id.into()])?;
        convert::to_vendor(self.rt(), &ret)
    }

    // -- Texts --------------------------------------------------------------

    /// Full translation map (locale code to text) for a notice text key.
    pub fn get_text(&self, key: &str) -> Result<HashMap<String, String>> {
        let ret = self.dispatcher.invoke_object("getText", vec![key.into()])?;
        convert::to_string_map(self.rt(), &ret)
    }

    /// Text for `key` in the currently selected language.
    pub fn get_translated_text(&self, key: &str) -> Result<String> {
        self.dispatcher.invoke_string("getTranslatedText", vec![key.into()])
    }

    /// JavaScript snippet that forwards the stored consent into an
    /// embedded web view.
    pub fn get_javascript_for_web_view(&self) -> Result<String> {
        self.dispatcher.invoke_string("getJavaScriptForWebView", vec![])
    }

    // -- Consent status queries ---------------------------------------------

    pub fn get_user_consent_status_for_purpose(&self, purpose_id: &str) -> Result<bool> {
        self.dispatcher
            .invoke_bool("getUserConsentStatusForPurpose", vec![purpose_id.into()])
    }

    pub fn get_user_consent_status_for_vendor(&self, vendor_id: &str) -> Result<bool> {
        self.dispatcher
            .invoke_bool("getUserConsentStatusForVendor", vec![vendor_id.into()])
    }

    /// Consent for the vendor itself and for every purpose it requires.
    pub fn get_user_consent_status_for_vendor_and_required_purposes(
        &self,
        vendor_id: &str,
    ) -> Result<bool> {
        self.dispatcher.invoke_bool(
            "getUserConsentStatusForVendorAndRequiredPurposes",
            vec![vendor_id.into()],
        )
    }

    pub fn get_user_legitimate_interest_status_for_purpose(&self, purpose_id: &str) -> Result<bool> {
        self.dispatcher.invoke_bool(
            "getUserLegitimateInterestStatusForPurpose",
            vec![purpose_id.into()],
        )
    }

    pub fn get_user_legitimate_interest_status_for_vendor(&self, vendor_id: &str) -> Result<bool> {
        self.dispatcher.invoke_bool(
            "getUserLegitimateInterestStatusForVendor",
            vec![vendor_id.into()],
        )
    }

    pub fn get_user_legitimate_interest_status_for_vendor_and_required_purposes(
        &self,
        vendor_id: &str,
    ) -> Result<bool> {
        self.dispatcher.invoke_bool(
            "getUserLegitimateInterestStatusForVendorAndRequiredPurposes",
            vec![vendor_id.into()],
        )
    }

    pub fn is_consent_required(&self) -> Result<bool> {
        self.dispatcher.invoke_bool("isConsentRequired", vec![])
    }

    pub fn is_user_consent_status_partial(&self) -> Result<bool> {
        self.dispatcher.invoke_bool("isUserConsentStatusPartial", vec![])
    }

    pub fn should_consent_be_collected(&self) -> Result<bool> {
        self.dispatcher.invoke_bool("shouldConsentBeCollected", vec![])
    }

    // -- Consent mutation ----------------------------------------------------

    /// Enable every purpose and vendor.
    pub fn set_user_agree_to_all(&self) -> Result<bool> {
        self.dispatcher.invoke_bool("setUserAgreeToAll", vec![])
    }

    /// Disable every purpose and vendor.
    pub fn set_user_disagree_to_all(&self) -> Result<bool> {
        self.dispatcher.invoke_bool("setUserDisagreeToAll", vec![])
    }

    /// Update the user status with separated consent and
    /// legitimate-interest id sets.
    pub fn set_user_status(&self, params: &UserStatusParams) -> Result<bool> {
        self.set_status_sets(
            "setUserStatus",
            [
                &params.enabled_consent_purpose_ids,
                &params.disabled_consent_purpose_ids,
                &params.enabled_li_purpose_ids,
                &params.disabled_li_purpose_ids,
                &params.enabled_consent_vendor_ids,
                &params.disabled_consent_vendor_ids,
                &params.enabled_li_vendor_ids,
                &params.disabled_li_vendor_ids,
            ],
        )
    }

    /// Update the user status wholesale, one flag per category.
    pub fn set_user_status_flags(
        &self,
        purposes_consent: bool,
        purposes_li: bool,
        vendors_consent: bool,
        vendors_li: bool,
    ) -> Result<bool> {
        self.dispatcher.invoke_bool(
            "setUserStatus",
            vec![
                purposes_consent.into(),
                purposes_li.into(),
                vendors_consent.into(),
                vendors_li.into(),
            ],
        )
    }

    /// Update consent-only status.
    #[deprecated(note = "use `set_user_status`, which separates consent from legitimate interest")]
    pub fn set_user_consent_status(
        &self,
        enabled_purpose_ids: &HashSet<String>,
        disabled_purpose_ids: &HashSet<String>,
        enabled_vendor_ids: &HashSet<String>,
        disabled_vendor_ids: &HashSet<String>,
    ) -> Result<bool> {
        let empty = HashSet::new();
        self.set_status_sets(
            "setUserConsentStatus",
            [
                enabled_purpose_ids,
                disabled_purpose_ids,
                &empty,
                &empty,
                enabled_vendor_ids,
                disabled_vendor_ids,
                &empty,
                &empty,
            ],
        )
    }

    /// Shared lowering for the eight-set status operations. The reverse-
    /// converted collections live exactly as long as the dispatch call.
    fn set_status_sets(&self, method: &str, sets: [&HashSet<String>; 8]) -> Result<bool> {
        let rt = self.rt();
        let mut guards = Vec::with_capacity(sets.len());
        for set in sets {
            guards.push(convert::from_string_set(rt, set)?);
        }
        let args = guards.iter().map(|g| g.as_value()).collect();
        self.dispatcher.invoke_bool(method, args)
    }

    // -- UI -----------------------------------------------------------------

    /// Set up the consent UI, showing the notice if consent is required.
    pub fn setup_ui(&self) -> Result<()> {
        self.dispatcher.invoke_void_with_ui_context("setupUI")
    }

    pub fn show_notice(&self) -> Result<()> {
        self.dispatcher.invoke_void_with_ui_context("showNotice")
    }

    pub fn show_preferences(&self) -> Result<()> {
        self.dispatcher.invoke_void_with_ui_context("showPreferences")
    }

    pub fn hide_notice(&self) -> Result<()> {
        self.dispatcher.invoke_void("hideNotice", vec![])
    }

    pub fn hide_preferences(&self) -> Result<()> {
        self.dispatcher.invoke_void("hidePreferences", vec![])
    }

    pub fn is_notice_visible(&self) -> Result<bool> {
        self.dispatcher.invoke_bool("isNoticeVisible", vec![])
    }

    pub fn is_preferences_visible(&self) -> Result<bool> {
        self.dispatcher.invoke_bool("isPreferencesVisible", vec![])
    }
}
