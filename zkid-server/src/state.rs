//! Application state shared across axum handlers: the verifier, the
//! issuer registry and revocation backend reachable outside the verify
//! path (CLI subcommands and the `/revocation/*` routes), the named
//! scenario table, and the `/metrics` counters.

use std::collections::HashMap;
use std::sync::Arc;

use zkid_core::revocation::RevocationBackend;
use zkid_core::telemetry::TelemetryCounters;
use zkid_core::registry::IssuerRegistry;
use zkid_core::Verifier;
use zkid_types::Scenario;

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<Verifier>,
    pub issuer_registry: Arc<dyn IssuerRegistry>,
    pub revocation_backend: Option<Arc<dyn RevocationBackend>>,
    pub scenarios: Arc<HashMap<String, Scenario>>,
    pub counters: Arc<TelemetryCounters>,
}
