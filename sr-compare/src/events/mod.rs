//! Event emission for observability.
//!
//! Pipeline, stage, and correlation progress is reported as structured
//! [`PipelineEvent`]s through an [`EventSink`]. The sink travels with the
//! run context rather than living in a global, so concurrent runs in one
//! process never see each other's events.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A structured pipeline event.
///
/// Event names are dot-scoped (e.g. `stage.started`, `run.completed`).
#[derive(Debug, Clone)]
pub struct PipelineEvent {
    /// Dot-scoped event name.
    pub name: String,
    /// The run this event belongs to.
    pub run_id: Uuid,
    /// The stage this event concerns, if any.
    pub stage: Option<String>,
    /// Structured event payload.
    pub payload: Option<serde_json::Value>,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
}

impl PipelineEvent {
    /// Creates a new event stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>, run_id: Uuid) -> Self {
        Self {
            name: name.into(),
            run_id,
            stage: None,
            payload: None,
            timestamp: Utc::now(),
        }
    }

    /// Attaches a stage name.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Attaches a structured payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}
