// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Probe binary: construct the bridge over the platform's call surface
// and exercise a few operations. On an Android device this reaches the
// real SDK; on desktop it demonstrates the stub fault surface.

use consentwerk_bridge::Consentwerk;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("probing the platform native runtime");

    match Consentwerk::for_platform() {
        Ok(bridge) => {
            tracing::info!("bridge constructed; querying readiness");
            match bridge.is_ready() {
                Ok(ready) => tracing::info!(ready, "native SDK responded"),
                Err(e) => tracing::error!(error = %e, "readiness query failed"),
            }
        }
        Err(e) => {
            // Expected on desktop: construction registers the ready hook,
            // which already needs the native runtime.
            tracing::error!(error = %e, "bridge construction failed");
        }
    }
}
