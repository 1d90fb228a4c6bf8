//! Session state machine.
//!
//! A workflow is a chain of [`Job`]s. The session hands out the first job
//! (`begin_produce`, `begin_refine`), something runs it against a gateway,
//! and [`Session::advance`] folds the outcome back in and yields the next
//! step. Nothing here awaits, so a front end never has to keep the session
//! borrowed across a network round trip.

use cover_contracts::{Artifact, GatewayError, HistoryStore, ImageData, Phase, SessionError};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Describe {
        title: String,
        body: String,
    },
    Generate {
        prompt: String,
    },
    /// `base` is a copy of `artifacts[base_index]` taken when the job began.
    Edit {
        base_index: usize,
        base: ImageData,
        command: String,
    },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Describe { .. } => "describe",
            Stage::Generate { .. } => "generate",
            Stage::Edit { .. } => "edit",
        }
    }

    fn phase(&self) -> Phase {
        match self {
            Stage::Describe { .. } => Phase::Describing,
            Stage::Generate { .. } => Phase::Generating,
            Stage::Edit { .. } => Phase::Editing,
        }
    }
}

/// One pending gateway call, stamped with the session epoch it belongs to
/// and the ticket the session issued for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    epoch: u64,
    ticket: u64,
    stage: Stage,
}

impl Job {
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutput {
    Prompt(String),
    Image(ImageData),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Next(Job),
    Finished { index: usize },
    Failed(GatewayError),
    /// The job is no longer the one in flight (reset, or already applied);
    /// the outcome was dropped.
    Discarded,
}

#[derive(Debug, Clone)]
pub struct Session {
    session_id: String,
    epoch: u64,
    next_ticket: u64,
    in_flight: Option<u64>,
    phase: Phase,
    title: String,
    body: String,
    pending_command: String,
    last_prompt: Option<String>,
    error_message: Option<String>,
    history: HistoryStore,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            epoch: 0,
            next_ticket: 0,
            in_flight: None,
            phase: Phase::Idle,
            title: String::new(),
            body: String::new(),
            pending_command: String::new(),
            last_prompt: None,
            error_message: None,
            history: HistoryStore::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn pending_command(&self) -> &str {
        &self.pending_command
    }

    pub fn last_prompt(&self) -> Option<&str> {
        self.last_prompt.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn current(&self) -> Option<&Artifact> {
        self.history.current()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    pub fn set_pending_command(&mut self, command: impl Into<String>) {
        self.pending_command = command.into();
    }

    /// True when a reset would throw away something the user typed or produced.
    pub fn has_unsaved_input(&self) -> bool {
        !self.title.trim().is_empty()
            || !self.body.trim().is_empty()
            || !self.pending_command.trim().is_empty()
            || !self.history.is_empty()
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.phase.is_in_flight() {
            return Err(SessionError::Busy(self.phase));
        }
        Ok(())
    }

    fn start(&mut self, stage: Stage) -> Job {
        self.error_message = None;
        self.issue(stage)
    }

    fn issue(&mut self, stage: Stage) -> Job {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        self.phase = stage.phase();
        Job {
            epoch: self.epoch,
            ticket,
            stage,
        }
    }

    pub fn begin_produce(&mut self) -> Result<Job, SessionError> {
        self.ensure_idle()?;
        if self.title.trim().is_empty() && self.body.trim().is_empty() {
            return Err(SessionError::Validation(
                "Please provide a blog title or content first.".to_string(),
            ));
        }
        Ok(self.start(Stage::Describe {
            title: self.title.clone(),
            body: self.body.clone(),
        }))
    }

    /// Reads the selected artifact now, so a later restore cannot change
    /// which image this edit is based on.
    pub fn begin_refine(&mut self, command: &str) -> Result<Job, SessionError> {
        self.ensure_idle()?;
        let command = command.trim();
        if command.is_empty() {
            return Err(SessionError::Validation(
                "Please describe the edit to apply.".to_string(),
            ));
        }
        let Some(base_index) = self.history.selected() else {
            return Err(SessionError::Validation(
                "There is no image to edit yet.".to_string(),
            ));
        };
        let Some(base) = self.history.get(base_index).map(|artifact| artifact.image().clone())
        else {
            return Err(SessionError::IndexOutOfRange {
                index: base_index,
                len: self.history.len(),
            });
        };
        Ok(self.start(Stage::Edit {
            base_index,
            base,
            command: command.to_string(),
        }))
    }

    pub fn advance(&mut self, job: Job, outcome: Result<StageOutput, GatewayError>) -> Step {
        if job.epoch != self.epoch || self.in_flight != Some(job.ticket) {
            return Step::Discarded;
        }
        self.in_flight = None;

        match (job.stage, outcome) {
            (Stage::Describe { .. }, Ok(StageOutput::Prompt(prompt))) => {
                self.last_prompt = Some(prompt.clone());
                Step::Next(self.issue(Stage::Generate { prompt }))
            }
            (Stage::Describe { .. }, Err(err)) => self.fail(describe_failure(err)),
            (Stage::Generate { prompt }, Ok(StageOutput::Image(image))) => {
                let index = self.history.append(Artifact::generated(image, prompt));
                self.phase = Phase::Ready;
                Step::Finished { index }
            }
            (
                Stage::Edit {
                    base_index,
                    command,
                    ..
                },
                Ok(StageOutput::Image(image)),
            ) => {
                let index = self
                    .history
                    .append(Artifact::edited(image, command, base_index));
                self.phase = Phase::Ready;
                self.pending_command.clear();
                Step::Finished { index }
            }
            (_, Err(err)) => self.fail(err),
            (stage, Ok(_)) => self.fail(GatewayError::Transport(format!(
                "unexpected output for {} stage",
                stage.name()
            ))),
        }
    }

    fn fail(&mut self, err: GatewayError) -> Step {
        self.error_message = Some(err.to_string());
        self.phase = Phase::Failed;
        Step::Failed(err)
    }

    pub fn restore(&mut self, index: usize) -> Result<&Artifact, SessionError> {
        self.ensure_idle()?;
        self.history.restore(index)
    }

    /// Back to an empty session. In-flight jobs from before the reset are
    /// discarded when they come back.
    pub fn reset(&mut self) {
        let epoch = self.epoch + 1;
        let next_ticket = self.next_ticket;
        let session_id = std::mem::take(&mut self.session_id);
        *self = Self {
            session_id,
            epoch,
            next_ticket,
            ..Self::new()
        };
    }
}

fn describe_failure(err: GatewayError) -> GatewayError {
    match err {
        GatewayError::DescriptionFailed(_) => err,
        other => GatewayError::DescriptionFailed(other.to_string()),
    }
}
