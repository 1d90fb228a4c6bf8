use std::path::{Path, PathBuf};

use cover_contracts::events::{EventKind, EventPayload, EventWriter};
use cover_contracts::{GatewayError, SessionError};
use serde_json::{json, Value};

use crate::export::export_image;
use crate::gateway::ModelGateway;
use crate::session::{Job, Session, Stage, StageOutput, Step};

/// Runs session workflows against a model gateway and records what happened
/// in the event log.
pub struct Orchestrator {
    gateway: Box<dyn ModelGateway>,
    events: EventWriter,
}

impl Orchestrator {
    pub fn new(gateway: Box<dyn ModelGateway>, events: EventWriter) -> Self {
        Self { gateway, events }
    }

    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }

    pub fn set_gateway(&mut self, gateway: Box<dyn ModelGateway>) {
        self.gateway = gateway;
    }

    pub fn event_writer(&self) -> EventWriter {
        self.events.clone()
    }

    pub fn start(&self, session: &Session) {
        self.record(
            EventKind::SessionStarted,
            json!({
                "session_id": session.session_id(),
                "gateway": self.gateway.name(),
            }),
        );
    }

    /// Performs the gateway call a job asks for. Does not touch any session.
    pub async fn execute(&self, job: &Job) -> Result<StageOutput, GatewayError> {
        tracing::debug!(stage = job.stage().name(), gateway = self.gateway.name(), "executing job");
        match job.stage() {
            Stage::Describe { title, body } => self
                .gateway
                .describe(title, body)
                .await
                .map(StageOutput::Prompt),
            Stage::Generate { prompt } => {
                self.gateway.generate(prompt).await.map(StageOutput::Image)
            }
            Stage::Edit { base, command, .. } => {
                self.gateway.edit(base, command).await.map(StageOutput::Image)
            }
        }
    }

    /// describe → generate; appends and selects the new artifact on success.
    pub async fn produce(&self, session: &mut Session) -> Result<usize, SessionError> {
        let job = session.begin_produce()?;
        self.record_phase(session);
        self.drive(session, job).await
    }

    /// Edits the selected artifact; appends and selects the result on success.
    pub async fn refine(&self, session: &mut Session, command: &str) -> Result<usize, SessionError> {
        let job = session.begin_refine(command)?;
        self.record_phase(session);
        self.drive(session, job).await
    }

    /// Runs `job` and every job that follows from it until the workflow ends.
    pub async fn drive(&self, session: &mut Session, mut job: Job) -> Result<usize, SessionError> {
        loop {
            let outcome = self.execute(&job).await;
            let stage = job.stage().name();
            match self.apply(session, job, outcome) {
                Step::Next(next) => job = next,
                Step::Finished { index } => return Ok(index),
                Step::Failed(err) => {
                    tracing::warn!(stage, error = %err, "workflow failed");
                    return Err(SessionError::Gateway(err));
                }
                Step::Discarded => return Err(SessionError::Discarded),
            }
        }
    }

    /// Folds a job outcome into the session and logs the transition.
    pub fn apply(
        &self,
        session: &mut Session,
        job: Job,
        outcome: Result<StageOutput, GatewayError>,
    ) -> Step {
        let stage = job.stage().name();
        let step = session.advance(job, outcome);
        match &step {
            Step::Next(_) => {
                if let Some(prompt) = session.last_prompt() {
                    self.record(EventKind::PromptDescribed, json!({ "prompt": prompt }));
                }
                self.record_phase(session);
            }
            Step::Finished { index } => {
                if let Some(artifact) = session.history().get(*index) {
                    self.record(
                        EventKind::ArtifactAppended,
                        json!({
                            "index": index,
                            "media_type": artifact.image().media_type(),
                            "origin": artifact.origin(),
                        }),
                    );
                }
                self.record_phase(session);
            }
            Step::Failed(err) => {
                self.record(
                    EventKind::AttemptFailed,
                    json!({
                        "stage": stage,
                        "kind": err.kind(),
                        "error": err.to_string(),
                    }),
                );
                self.record_phase(session);
            }
            Step::Discarded => {
                self.record(EventKind::ResultDiscarded, json!({ "stage": stage }));
            }
        }
        step
    }

    pub fn restore(&self, session: &mut Session, index: usize) -> Result<(), SessionError> {
        session.restore(index)?;
        self.record(EventKind::SelectionRestored, json!({ "index": index }));
        Ok(())
    }

    pub fn reset(&self, session: &mut Session) {
        let discarded = session.history().len();
        session.reset();
        self.record(
            EventKind::SessionReset,
            json!({ "discarded_artifacts": discarded }),
        );
    }

    /// Writes the selected artifact to disk. See [`export_image`].
    pub fn export_current(&self, session: &Session, target: &Path) -> anyhow::Result<PathBuf> {
        let Some(artifact) = session.current() else {
            anyhow::bail!("there is no image to export yet");
        };
        let path = export_image(artifact.image(), target)?;
        self.record(
            EventKind::ArtifactExported,
            json!({
                "index": session.history().selected(),
                "path": path.to_string_lossy(),
            }),
        );
        Ok(path)
    }

    fn record_phase(&self, session: &Session) {
        self.record(
            EventKind::PhaseChanged,
            json!({
                "phase": session.phase(),
                "error": session.error_message(),
            }),
        );
    }

    fn record(&self, kind: EventKind, payload: Value) {
        let payload: EventPayload = payload.as_object().cloned().unwrap_or_default();
        if let Err(err) = self.events.emit(kind, payload) {
            tracing::warn!(event = kind.as_str(), error = %err, "event log write failed");
        }
    }
}
