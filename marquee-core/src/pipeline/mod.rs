//! The list enrichment run.
//!
//! One coordinating task walks a run through
//! `Init -> Extracting -> CacheScan -> Resolving -> Complete`, reporting to
//! the client through an [`EventEmitter`]. A single deadline covers the
//! whole run; when it fires the in-flight work is dropped (which terminates
//! the extractor) and exactly one `error` event is sent.

mod dedup;
mod emitter;
mod lookup;
mod state;

pub use dedup::DedupTracker;
pub use emitter::EventEmitter;
pub use lookup::{LookupResult, LookupSettings, TitleLookup};
pub use state::{RunPhase, RunState};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::cache::{CacheStore, TtlPolicy};
use crate::error::{ExtractionFailure, PipelineError};
use crate::extractor::{CandidateSource, ExtractorEvent};
use crate::providers::MetadataResolver;
use crate::types::{
    Candidate, ListReference, NormalizedKey, ProgressPhase, RunStats,
};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub run_deadline: Duration,
    /// Pause between consecutive fresh resolutions.
    pub inter_item_delay: Duration,
    pub ttl: TtlPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            run_deadline: Duration::from_secs(180),
            inter_item_delay: Duration::from_millis(200),
            ttl: TtlPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunStats),
    /// Ended early; carries the message sent to the client.
    Failed(String),
    TimedOut,
}

type Admitted = Vec<(Candidate, NormalizedKey)>;

#[derive(Clone)]
pub struct ListPipeline {
    source: Arc<dyn CandidateSource>,
    resolver: Arc<dyn MetadataResolver>,
    cache: Arc<dyn CacheStore>,
    settings: PipelineSettings,
}

impl fmt::Debug for ListPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListPipeline")
            .field("cache", &self.cache.backend_name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ListPipeline {
    pub fn new(
        source: Arc<dyn CandidateSource>,
        resolver: Arc<dyn MetadataResolver>,
        cache: Arc<dyn CacheStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            resolver,
            cache,
            settings,
        }
    }

    /// Runs `list` to a terminal state. Every outcome, including failures,
    /// has already been reported through `emitter` when this returns.
    pub async fn run(&self, list: ListReference, emitter: EventEmitter) -> RunOutcome {
        let run_id = Uuid::now_v7();
        let span = info_span!("list_run", %run_id, list = %list);
        self.run_to_end(list, emitter).instrument(span).await
    }

    async fn run_to_end(&self, list: ListReference, emitter: EventEmitter) -> RunOutcome {
        let started = Instant::now();
        let deadline = started + self.settings.run_deadline;
        let mut state = RunState::new();

        let result = match timeout_at(deadline, self.drive(&list, &emitter, &mut state)).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Timeout(self.settings.run_deadline)),
        };

        match result {
            Ok(()) => {
                let stats = state.stats();
                if let Err(e) = emitter.complete(stats).await {
                    warn!("Run finished but the completion could not be delivered: {}", e);
                    state.enter(RunPhase::Failed);
                    return RunOutcome::Failed(e.client_message().to_string());
                }
                state.enter(RunPhase::Complete);
                info!(
                    total = stats.total,
                    cached = stats.cached,
                    found = stats.found,
                    elapsed = ?started.elapsed(),
                    "List run complete"
                );
                RunOutcome::Completed(stats)
            }
            Err(PipelineError::ClientDisconnected) => {
                warn!(phase = %state.phase(), "Client disconnected; abandoning run");
                state.enter(RunPhase::Failed);
                RunOutcome::Failed(PipelineError::ClientDisconnected.client_message().to_string())
            }
            Err(err) => {
                error!(phase = %state.phase(), "List run failed: {}", err);
                let message = err.client_message();
                if let Err(e) = emitter.fail(message).await {
                    debug!("Failure could not be delivered: {}", e);
                }
                if err.is_timeout() {
                    state.enter(RunPhase::TimedOut);
                    RunOutcome::TimedOut
                } else {
                    state.enter(RunPhase::Failed);
                    RunOutcome::Failed(message.to_string())
                }
            }
        }
    }

    async fn drive(
        &self,
        list: &ListReference,
        emitter: &EventEmitter,
        state: &mut RunState,
    ) -> Result<(), PipelineError> {
        state.enter(RunPhase::Extracting);
        let admitted = self.extract(list, emitter, state).await?;

        state.enter(RunPhase::CacheScan);
        let misses = self.scan_cache(admitted, emitter, state).await?;

        state.enter(RunPhase::Resolving);
        self.resolve_misses(misses, emitter, state).await
    }

    /// Collects distinct candidates until the extractor exits.
    async fn extract(
        &self,
        list: &ListReference,
        emitter: &EventEmitter,
        state: &mut RunState,
    ) -> Result<Admitted, PipelineError> {
        let mut handle = self.source.start(list).await?;
        let mut dedup = DedupTracker::new();
        let mut admitted = Admitted::new();

        let exit = loop {
            match handle.next_event().await {
                Some(ExtractorEvent::Candidate(candidate)) => {
                    let key = candidate.key();
                    if !dedup.admit(key.clone()) {
                        debug!("Skipping duplicate title {:?}", candidate.title);
                        continue;
                    }
                    let count = admitted.len() + 1;
                    emitter
                        .step(count, count, &candidate.title, ProgressPhase::Extracting)
                        .await?;
                    admitted.push((candidate, key));
                }
                Some(ExtractorEvent::Exited(exit)) => break exit,
                None => {
                    return Err(ExtractionFailure::Io(
                        "extractor events ended without an exit status".to_string(),
                    )
                    .into());
                }
            }
        };

        if let Some(failure) = exit.into_failure() {
            return Err(failure.into());
        }
        if admitted.is_empty() {
            return Err(ExtractionFailure::NoCandidates.into());
        }

        state.total_candidates = admitted.len();
        info!("Extracted {} distinct titles", admitted.len());
        Ok(admitted)
    }

    /// Emits cache hits straight away and returns the misses in order.
    async fn scan_cache(
        &self,
        admitted: Admitted,
        emitter: &EventEmitter,
        state: &mut RunState,
    ) -> Result<Admitted, PipelineError> {
        let total = admitted.len();
        let mut misses = Admitted::new();

        for (index, (candidate, key)) in admitted.into_iter().enumerate() {
            emitter
                .step(index + 1, total, &candidate.title, ProgressPhase::CacheCheck)
                .await?;

            match self.cache.get(&key).await {
                Ok(Some(mut movie)) => {
                    debug!(key = key.short(), "Cache hit for {:?}", candidate.title);
                    movie.original_title = candidate.title;
                    state.record_cache_hit(&movie);
                    emitter.item(movie).await?;
                }
                Ok(None) => {
                    debug!(key = key.short(), "Cache miss for {:?}", candidate.title);
                    misses.push((candidate, key));
                }
                Err(e) => {
                    warn!("Cache read failed for {:?}, resolving fresh: {}", candidate.title, e);
                    misses.push((candidate, key));
                }
            }
        }

        info!(hits = state.cache_hits, misses = misses.len(), "Cache scan finished");
        if !misses.is_empty() {
            emitter
                .notice(format!(
                    "Found {} cached movies, fetching {} fresh...",
                    state.cache_hits,
                    misses.len()
                ))
                .await?;
        }
        Ok(misses)
    }

    async fn resolve_misses(
        &self,
        misses: Admitted,
        emitter: &EventEmitter,
        state: &mut RunState,
    ) -> Result<(), PipelineError> {
        let total = state.total_candidates;

        for (index, (candidate, key)) in misses.into_iter().enumerate() {
            if index > 0 && !self.settings.inter_item_delay.is_zero() {
                sleep(self.settings.inter_item_delay).await;
            }

            emitter
                .step(
                    state.cache_hits + index + 1,
                    total,
                    &candidate.title,
                    ProgressPhase::Processing,
                )
                .await?;

            let movie = self.resolver.resolve(&candidate.title).await;
            debug!(status = %movie.status, "Resolved {:?}", candidate.title);

            let ttl = self.settings.ttl.ttl_for(&movie);
            if let Err(e) = self.cache.put(&key, &movie, ttl).await {
                warn!("Cache write failed for {:?}: {}", candidate.title, e);
            }

            state.record_resolved(&movie);
            emitter.item(movie).await?;
        }

        Ok(())
    }
}
