//! Recording session: the state machine that turns captured actions and a
//! drained batch of page changes into [`RecordedAction`]s.
//!
//! Changes accumulate in the page from the moment the session starts, and the
//! collector can only be asked "what changed since the last drain". The
//! session drains it exactly once, at finalization, after every action has
//! already fired. At that point nothing tells which later action caused which
//! later change, so [`AttributionMode::Batch`] gives the whole batch to the
//! first action and nothing to the others. Telling them apart needs a drain
//! at each action boundary, which is what a future mode would add.

use crate::capture::{ActionCapturer, ChangeCollector};
use crate::tracker::coalesce;
use jsid_common::change::{CapturedAction, ChangeRecord, RecordedAction};
use jsid_common::error::DriverError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum AttributionMode {
    /// One drain at finalization, all changes attributed to the first action.
    #[default]
    Batch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    Finalizing,
    Finished,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not initialized: action capturer or change collector missing")]
    NotInitialized,
    #[error("Invalid session state for {operation}: {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Distribute a drained change batch over the captured actions.
///
/// Returns one [`RecordedAction`] per action, in order. With no actions the
/// batch is discarded.
pub fn attribute(
    actions: Vec<CapturedAction>,
    changes: Vec<ChangeRecord>,
    mode: AttributionMode,
) -> Vec<RecordedAction> {
    match mode {
        AttributionMode::Batch => {
            let mut changes = Some(changes);
            actions
                .into_iter()
                .map(|action| {
                    let attributed = changes.take().unwrap_or_default();
                    info!(
                        "Recorded {} action on {} with {} changes",
                        action.action_type,
                        action.selector,
                        attributed.len()
                    );
                    RecordedAction::new(action, attributed)
                })
                .collect()
        }
    }
}

pub struct RecordingSession {
    state: SessionState,
    mode: AttributionMode,
    capturer: Option<Arc<dyn ActionCapturer>>,
    collector: Option<Arc<dyn ChangeCollector>>,
    pending: Vec<CapturedAction>,
    recorded: Vec<RecordedAction>,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new(AttributionMode::default())
    }
}

impl RecordingSession {
    pub fn new(mode: AttributionMode) -> Self {
        Self {
            state: SessionState::Idle,
            mode,
            capturer: None,
            collector: None,
            pending: Vec::new(),
            recorded: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Actions captured so far and not yet attributed.
    pub fn pending_actions(&self) -> &[CapturedAction] {
        &self.pending
    }

    pub fn recorded_actions(&self) -> &[RecordedAction] {
        &self.recorded
    }

    /// Install the capturer and collector on the page and begin capturing.
    ///
    /// Allowed from `Idle` and `Finished`; clears everything captured by a
    /// previous run. On failure the session stays where it was.
    pub async fn start(
        &mut self,
        capturer: Arc<dyn ActionCapturer>,
        collector: Arc<dyn ChangeCollector>,
    ) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::Idle | SessionState::Finished) {
            return Err(SessionError::InvalidState {
                operation: "start",
                state: self.state,
            });
        }

        capturer.start().await?;
        collector.start().await?;
        capturer.clear().await?;
        collector.before_action().await?;

        self.capturer = Some(capturer);
        self.collector = Some(collector);
        self.pending.clear();
        self.recorded.clear();
        self.state = SessionState::Active;
        info!("Recording session started");
        Ok(())
    }

    /// Move actions captured in the page into the session. Returns how many
    /// actions were drained.
    pub async fn poll(&mut self) -> Result<usize, SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::InvalidState {
                operation: "poll",
                state: self.state,
            });
        }
        let capturer = self.capturer.as_ref().ok_or(SessionError::NotInitialized)?;

        let drained = capturer.drain().await?;
        let count = drained.len();
        coalesce(&mut self.pending, drained);
        Ok(count)
    }

    /// Attribute the session's changes to its actions and stop capturing.
    ///
    /// Calling this again after it succeeded returns the same actions without
    /// draining anything.
    pub async fn finalize(&mut self) -> Result<&[RecordedAction], SessionError> {
        if self.state == SessionState::Finished {
            return Ok(&self.recorded);
        }
        let (Some(capturer), Some(collector)) = (self.capturer.clone(), self.collector.clone())
        else {
            return Err(SessionError::NotInitialized);
        };

        self.state = SessionState::Finalizing;

        match capturer.drain().await {
            Ok(drained) => coalesce(&mut self.pending, drained),
            Err(e) => warn!("Final action drain failed: {}", e),
        }

        info!("Processing {} pending actions", self.pending.len());
        if self.pending.is_empty() {
            info!("No actions to process");
            self.state = SessionState::Finished;
            return Ok(&self.recorded);
        }

        let changes = match collector.after_action().await {
            Ok(changes) => changes,
            Err(e) => {
                warn!("Could not collect changes, recording actions without them: {}", e);
                Vec::new()
            }
        };
        info!("Collected {} total changes from session", changes.len());

        let actions = std::mem::take(&mut self.pending);
        self.recorded = attribute(actions, changes, self.mode);
        self.state = SessionState::Finished;
        Ok(&self.recorded)
    }
}
