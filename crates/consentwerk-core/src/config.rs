// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Initialization parameters for the native SDK.

use serde::{Deserialize, Serialize};

/// Parameters for the native `initialize` call.
///
/// `None` fields cross the runtime boundary as the native null sentinel;
/// the optional `notice_id` selects between the seven- and
/// eight-argument forms of the native method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeParams {
    /// API key identifying the SDK account.
    pub api_key: String,
    /// Path to a bundled configuration file, if any.
    pub local_configuration_path: Option<String>,
    /// URL of a remote configuration override, if any.
    pub remote_configuration_url: Option<String>,
    /// Provider identifier, if the account uses one.
    pub provider_id: Option<String>,
    /// Skip fetching the remote configuration and rely on the bundled one.
    pub disable_remote_config: bool,
    /// BCP 47 language code for notice and preference texts.
    pub language_code: String,
    /// Specific notice to load instead of the account default.
    pub notice_id: Option<String>,
}

impl InitializeParams {
    /// Minimal parameter set: an API key plus a language, everything else
    /// left to the account defaults.
    pub fn new(api_key: impl Into<String>, language_code: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            local_configuration_path: None,
            remote_configuration_url: None,
            provider_id: None,
            disable_remote_config: false,
            language_code: language_code.into(),
            notice_id: None,
        }
    }
}
