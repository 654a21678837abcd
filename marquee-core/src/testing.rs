//! In-process stand-ins for the external collaborators of a run.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cache::CacheStore;
use crate::error::{CacheError, PipelineError};
use crate::extractor::{CandidateSource, ExitOutcome, ExtractionHandle, ExtractorEvent};
use crate::providers::{MetadataResolver, TitleQuery};
use crate::types::{
    Candidate, ListReference, MovieId, MovieStatus, NormalizedKey, Provider,
    ProviderKind, ResolvedMovie, normalize_title,
};

/// Candidate source replaying a fixed list of titles.
#[derive(Debug)]
pub struct ScriptedSource {
    titles: Vec<String>,
    exit: ExitOutcome,
    hold_open: bool,
    unstartable: bool,
    starts: AtomicUsize,
    cancel: Mutex<Option<CancellationToken>>,
}

impl ScriptedSource {
    pub fn new<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            titles: titles.into_iter().map(Into::into).collect(),
            exit: ExitOutcome::Success,
            hold_open: false,
            unstartable: false,
            starts: AtomicUsize::new(0),
            cancel: Mutex::new(None),
        }
    }

    pub fn exiting_with(mut self, exit: ExitOutcome) -> Self {
        self.exit = exit;
        self
    }

    /// Never exits on its own; only cancellation ends it.
    pub fn hanging(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn unstartable() -> Self {
        let mut source = Self::new(Vec::<String>::new());
        source.unstartable = true;
        source
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

#[async_trait]
impl CandidateSource for ScriptedSource {
    async fn start(
        &self,
        _list: &ListReference,
    ) -> Result<ExtractionHandle, PipelineError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.unstartable {
            return Err(PipelineError::Spawn {
                program: "scripted".to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such program"),
            });
        }

        let (tx, rx) = mpsc::channel(self.titles.len() + 1);
        let cancel = CancellationToken::new();
        *self
            .cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(cancel.clone());

        let titles = self.titles.clone();
        let exit = self.exit.clone();
        let hold_open = self.hold_open;
        let token = cancel.clone();
        tokio::spawn(async move {
            for title in titles {
                if tx
                    .send(ExtractorEvent::Candidate(Candidate::new(title)))
                    .await
                    .is_err()
                {
                    return;
                }
            }
            let exit = if hold_open {
                token.cancelled().await;
                ExitOutcome::Killed
            } else {
                exit
            };
            let _ = tx.send(ExtractorEvent::Exited(exit)).await;
        });

        Ok(ExtractionHandle::new(rx, cancel))
    }
}

#[derive(Debug, Clone)]
enum Canned {
    Available { id: u64, providers: Vec<Provider> },
    Unavailable { id: u64 },
    Failing,
}

/// Resolver answering from a fixed table keyed by the year-stripped title.
/// Unknown titles resolve to `not_found`.
#[derive(Debug, Default)]
pub struct StaticResolver {
    entries: HashMap<String, Canned>,
    latency: Duration,
    calls: Mutex<Vec<String>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_available(mut self, title: &str, id: u64) -> Self {
        let providers = vec![Provider {
            id: 8,
            name: "Netflix".to_string(),
            region: "US".to_string(),
            kind: ProviderKind::Stream,
            logo_path: Some("/netflix.jpg".to_string()),
        }];
        self.entries
            .insert(normalize_title(title), Canned::Available { id, providers });
        self
    }

    pub fn with_unavailable(mut self, title: &str, id: u64) -> Self {
        self.entries
            .insert(normalize_title(title), Canned::Unavailable { id });
        self
    }

    pub fn with_failure(mut self, title: &str) -> Self {
        self.entries.insert(normalize_title(title), Canned::Failing);
        self
    }

    /// Time each `resolve` call takes.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Titles passed to `resolve`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl MetadataResolver for StaticResolver {
    async fn resolve(&self, title: &str) -> ResolvedMovie {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(title.to_string());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let query = TitleQuery::parse(title);
        let (id, providers) = match self.entries.get(&normalize_title(&query.title)) {
            None => return ResolvedMovie::not_found(title),
            Some(Canned::Failing) => return ResolvedMovie::failed(title),
            Some(Canned::Unavailable { id }) => (*id, Vec::new()),
            Some(Canned::Available { id, providers }) => (*id, providers.clone()),
        };

        let status = if providers.is_empty() {
            MovieStatus::NoAvailability
        } else {
            MovieStatus::Found
        };
        ResolvedMovie {
            id: MovieId::Tmdb(id),
            title: query.title,
            original_title: title.to_string(),
            poster_path: Some(format!("/{id}.jpg")),
            vote_average: 7.5,
            release_date: query.year.map(|year| format!("{year}-01-01")),
            providers,
            status,
        }
    }
}

/// Cache whose every operation fails, as during a backend outage.
#[derive(Debug, Default)]
pub struct UnavailableCache;

#[async_trait]
impl CacheStore for UnavailableCache {
    async fn get(
        &self,
        _key: &NormalizedKey,
    ) -> Result<Option<ResolvedMovie>, CacheError> {
        Err(CacheError::Backend("connection refused".to_string()))
    }

    async fn put(
        &self,
        _key: &NormalizedKey,
        _movie: &ResolvedMovie,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Err(CacheError::Backend("connection refused".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "unavailable"
    }
}
