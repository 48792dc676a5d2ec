//! Telemetry hook around signing and verification.
//!
//! Events carry operation names and public attributes only: algorithm, DID,
//! marker id, outcome. Key material and payloads never reach a sink.

use std::sync::Mutex;

use crate::crypto::Algorithm;

/// How an operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(String),
}

/// One recorded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryEvent {
    pub operation: &'static str,
    pub algorithm: Option<Algorithm>,
    pub did: Option<String>,
    pub marker_id: Option<String>,
    pub outcome: Outcome,
}

impl TelemetryEvent {
    pub fn new(operation: &'static str, outcome: Outcome) -> Self {
        Self {
            operation,
            algorithm: None,
            did: None,
            marker_id: None,
            outcome,
        }
    }

    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    pub fn did(mut self, did: impl Into<String>) -> Self {
        self.did = Some(did.into());
        self
    }

    pub fn marker_id(mut self, id: impl Into<String>) -> Self {
        self.marker_id = Some(id.into());
        self
    }
}

/// A telemetry sink. Must not affect the operation it observes.
pub trait Telemetry: Send + Sync {
    fn record(&self, event: &TelemetryEvent);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn record(&self, _event: &TelemetryEvent) {}
}

/// Forwards events to the `log` facade under the `departure_marker::telemetry`
/// target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn record(&self, event: &TelemetryEvent) {
        let algorithm = event.algorithm.map(|a| a.as_str()).unwrap_or("-");
        let did = event.did.as_deref().unwrap_or("-");
        let id = event.marker_id.as_deref().unwrap_or("-");
        match &event.outcome {
            Outcome::Success => log::info!(
                target: "departure_marker::telemetry",
                "{} ok alg={algorithm} did={did} marker={id}",
                event.operation
            ),
            Outcome::Failure(reason) => log::warn!(
                target: "departure_marker::telemetry",
                "{} failed alg={algorithm} did={did} marker={id}: {reason}",
                event.operation
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl Telemetry for MemoryTelemetry {
    fn record(&self, event: &TelemetryEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
