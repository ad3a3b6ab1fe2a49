//! The mutable context threaded through a pipeline run.

use super::StagingManifest;
use crate::events::{EventSink, NoOpEventSink, PipelineEvent};
use crate::store::ArtifactStore;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Shared state for one pipeline run.
///
/// Built by the pipeline once inputs are staged, then handed to each
/// stage in turn. Stages read the store and manifest from here; the
/// pipeline records each stage's canonical output directory back into
/// it so correlation can find every stage's artifacts afterwards.
pub struct RunContext {
    /// Unique ID for this run.
    run_id: Uuid,
    /// When the run context was created.
    started_at: DateTime<Utc>,
    /// The directory layout for this run.
    store: ArtifactStore,
    /// The staged inputs and their correlation keys.
    manifest: StagingManifest,
    /// Canonical output directory per completed stage.
    stage_dirs: BTreeMap<String, PathBuf>,
    /// Where events for this run are delivered.
    event_sink: Arc<dyn EventSink>,
}

impl RunContext {
    /// Creates a new run context.
    #[must_use]
    pub fn new(run_id: Uuid, store: ArtifactStore, manifest: StagingManifest) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            store,
            manifest,
            stage_dirs: BTreeMap::new(),
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the run ID.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns when the run context was created.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the artifact store.
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Returns the shared input directory tools read from.
    #[must_use]
    pub fn input_dir(&self) -> &Path {
        self.store.input_dir()
    }

    /// Returns the staging manifest.
    #[must_use]
    pub fn manifest(&self) -> &StagingManifest {
        &self.manifest
    }

    /// Returns the event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.event_sink
    }

    /// Records the canonical output directory of a completed stage.
    pub fn record_stage_dir(&mut self, stage: impl Into<String>, dir: impl Into<PathBuf>) {
        self.stage_dirs.insert(stage.into(), dir.into());
    }

    /// Returns the canonical output directory of a completed stage.
    #[must_use]
    pub fn stage_dir(&self, stage: &str) -> Option<&Path> {
        self.stage_dirs.get(stage).map(PathBuf::as_path)
    }

    /// Returns all recorded stage directories.
    #[must_use]
    pub fn stage_dirs(&self) -> &BTreeMap<String, PathBuf> {
        &self.stage_dirs
    }

    /// Emits an event for this run.
    pub async fn emit_event(
        &self,
        name: &str,
        stage: Option<&str>,
        payload: Option<serde_json::Value>,
    ) {
        self.event_sink.emit(self.build_event(name, stage, payload)).await;
    }

    /// Emits an event without blocking.
    pub fn try_emit_event(
        &self,
        name: &str,
        stage: Option<&str>,
        payload: Option<serde_json::Value>,
    ) {
        self.event_sink.try_emit(self.build_event(name, stage, payload));
    }

    fn build_event(
        &self,
        name: &str,
        stage: Option<&str>,
        payload: Option<serde_json::Value>,
    ) -> PipelineEvent {
        let mut event = PipelineEvent::new(name, self.run_id);
        if let Some(stage) = stage {
            event = event.with_stage(stage);
        }
        if let Some(payload) = payload {
            event = event.with_payload(payload);
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use tempfile::TempDir;

    fn context_in(dir: &TempDir) -> RunContext {
        let store =
            ArtifactStore::open(dir.path().join("input"), dir.path().join("results")).unwrap();
        RunContext::new(Uuid::new_v4(), store, StagingManifest::default())
    }

    #[test]
    fn test_record_and_lookup_stage_dir() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context_in(&dir);

        assert!(ctx.stage_dir("BSRGAN").is_none());

        let canonical = ctx.store().stage_dir("BSRGAN");
        ctx.record_stage_dir("BSRGAN", &canonical);

        assert_eq!(ctx.stage_dir("BSRGAN"), Some(canonical.as_path()));
        assert_eq!(ctx.stage_dirs().len(), 1);
    }

    #[tokio::test]
    async fn test_events_reach_sink() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = context_in(&dir).with_event_sink(sink.clone());

        ctx.emit_event(
            "stage.started",
            Some("SwinIR"),
            Some(serde_json::json!({"index": 0})),
        )
        .await;
        ctx.try_emit_event("stage.completed", Some("SwinIR"), None);

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].run_id, ctx.run_id());
        assert_eq!(events[0].stage.as_deref(), Some("SwinIR"));
        assert_eq!(events[1].name, "stage.completed");
    }
}
