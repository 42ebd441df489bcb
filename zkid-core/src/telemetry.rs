//! Telemetry hooks: a fire-and-forget `TelemetrySink` trait
//! emitting a `VerificationEvent` per terminal outcome, plus a small
//! atomic-counter aggregate for cheap in-process dashboards.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use zkid_types::VerificationEvent;

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn record(&self, event: VerificationEvent);
}

/// Logs every event via `tracing` at `info` (success) or `warn` (rejection).
/// The default sink wired into `zkid-server` when no other is configured.
#[derive(Default)]
pub struct TracingTelemetrySink;

#[async_trait]
impl TelemetrySink for TracingTelemetrySink {
    async fn record(&self, event: VerificationEvent) {
        if event.verified {
            tracing::info!(
                claim_type = %event.claim_type,
                verification_time_ms = event.verification_time_ms,
                client_identifier = event.client_identifier.as_deref().unwrap_or("-"),
                "verification succeeded"
            );
        } else {
            tracing::warn!(
                claim_type = %event.claim_type,
                verification_time_ms = event.verification_time_ms,
                client_identifier = event.client_identifier.as_deref().unwrap_or("-"),
                error = event.error.as_deref().unwrap_or("-"),
                "verification rejected"
            );
        }
    }
}

/// Running totals for `GET /metrics`, updated on every recorded event.
#[derive(Default)]
pub struct TelemetryCounters {
    verified_total: AtomicU64,
    rejected_total: AtomicU64,
    latency_sum_ms: AtomicU64,
}

impl TelemetryCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verified_total(&self) -> u64 {
        self.verified_total.load(Ordering::Relaxed)
    }

    pub fn rejected_total(&self) -> u64 {
        self.rejected_total.load(Ordering::Relaxed)
    }

    pub fn mean_latency_ms(&self) -> f64 {
        let total = self.verified_total() + self.rejected_total();
        if total == 0 {
            return 0.0;
        }
        self.latency_sum_ms.load(Ordering::Relaxed) as f64 / total as f64
    }
}

#[async_trait]
impl TelemetrySink for TelemetryCounters {
    async fn record(&self, event: VerificationEvent) {
        if event.verified {
            self.verified_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rejected_total.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_sum_ms.fetch_add(event.verification_time_ms, Ordering::Relaxed);
    }
}

#[async_trait]
impl<T: TelemetrySink + ?Sized> TelemetrySink for std::sync::Arc<T> {
    async fn record(&self, event: VerificationEvent) {
        (**self).record(event).await;
    }
}

/// Fans a single event out to every sink in the list, in order.
pub struct BroadcastTelemetrySink {
    sinks: Vec<Box<dyn TelemetrySink>>,
}

impl BroadcastTelemetrySink {
    pub fn new(sinks: Vec<Box<dyn TelemetrySink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl TelemetrySink for BroadcastTelemetrySink {
    async fn record(&self, event: VerificationEvent) {
        for sink in &self.sinks {
            sink.record(event.clone()).await;
        }
    }
}
