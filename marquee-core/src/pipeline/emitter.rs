use tokio::sync::mpsc;
use tracing::trace;

use crate::error::PipelineError;
use crate::types::{PipelineEvent, Progress, ProgressPhase, ResolvedMovie, RunStats};

/// Outbound side of a run's event channel.
///
/// Terminal events can only be sent through [`EventEmitter::complete`] or
/// [`EventEmitter::fail`], which consume the emitter and close the channel.
#[derive(Debug)]
pub struct EventEmitter {
    tx: mpsc::Sender<PipelineEvent>,
}

impl EventEmitter {
    pub fn new(tx: mpsc::Sender<PipelineEvent>) -> Self {
        Self { tx }
    }

    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<PipelineEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub async fn step(
        &self,
        current: usize,
        total: usize,
        movie_title: &str,
        phase: ProgressPhase,
    ) -> Result<(), PipelineError> {
        self.send(PipelineEvent::Progress(Progress::Step {
            current,
            total,
            movie_title: movie_title.to_string(),
            phase,
        }))
        .await
    }

    pub async fn notice(&self, message: impl Into<String>) -> Result<(), PipelineError> {
        self.send(PipelineEvent::Progress(Progress::Notice {
            message: message.into(),
        }))
        .await
    }

    pub async fn item(&self, movie: ResolvedMovie) -> Result<(), PipelineError> {
        self.send(PipelineEvent::Item { movie }).await
    }

    pub async fn complete(self, stats: RunStats) -> Result<(), PipelineError> {
        self.send(PipelineEvent::Complete { stats }).await
    }

    pub async fn fail(self, message: impl Into<String>) -> Result<(), PipelineError> {
        self.send(PipelineEvent::Error {
            message: message.into(),
        })
        .await
    }

    async fn send(&self, event: PipelineEvent) -> Result<(), PipelineError> {
        trace!(event = event.event_name(), "emitting");
        self.tx
            .send(event)
            .await
            .map_err(|_| PipelineError::ClientDisconnected)
    }
}
