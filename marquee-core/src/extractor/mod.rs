//! List extraction: an external producer of raw titles.
//!
//! A [`CandidateSource`] starts one extraction per list and hands back an
//! [`ExtractionHandle`], a finite stream of [`ExtractorEvent`]s that always
//! ends with [`ExtractorEvent::Exited`]. Dropping the handle cancels the
//! extraction.

mod process;
mod protocol;

pub use process::{ProcessExtractor, ProcessExtractorConfig};
pub use protocol::{OutputLine, parse_output_line};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{ExtractionFailure, PipelineError};
use crate::types::{Candidate, ListReference};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    Failed { code: i32 },
    /// Ended by a signal, including our own termination.
    Killed,
    /// Output could not be read.
    Errored(String),
}

impl ExitOutcome {
    /// Maps a non-successful exit onto the run failure it causes.
    pub fn into_failure(self) -> Option<ExtractionFailure> {
        match self {
            ExitOutcome::Success => None,
            ExitOutcome::Failed { code } => {
                Some(ExtractionFailure::NonZeroExit { code })
            }
            ExitOutcome::Killed => Some(ExtractionFailure::Terminated),
            ExitOutcome::Errored(message) => Some(ExtractionFailure::Io(message)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractorEvent {
    Candidate(Candidate),
    Exited(ExitOutcome),
}

/// Consumer end of one extraction. Not restartable.
#[derive(Debug)]
pub struct ExtractionHandle {
    events: mpsc::Receiver<ExtractorEvent>,
    cancel: CancellationToken,
    finished: bool,
}

impl ExtractionHandle {
    pub fn new(
        events: mpsc::Receiver<ExtractorEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            events,
            cancel,
            finished: false,
        }
    }

    /// Next event, or `None` once `Exited` has been delivered.
    ///
    /// A producer that vanishes without reporting an exit is surfaced as
    /// [`ExitOutcome::Errored`].
    pub async fn next_event(&mut self) -> Option<ExtractorEvent> {
        if self.finished {
            return None;
        }

        let event = match self.events.recv().await {
            Some(event) => event,
            None => ExtractorEvent::Exited(ExitOutcome::Errored(
                "extractor output closed without an exit status".to_string(),
            )),
        };
        if matches!(event, ExtractorEvent::Exited(_)) {
            self.finished = true;
        }
        Some(event)
    }

    /// Asks the producer to stop. Remaining events still drain through
    /// [`Self::next_event`].
    pub fn terminate(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ExtractionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Starts extracting `list`. Fails only when the producer cannot be
    /// started at all.
    async fn start(
        &self,
        list: &ListReference,
    ) -> Result<ExtractionHandle, PipelineError>;
}
