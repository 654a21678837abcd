use std::time::Duration;
use thiserror::Error;

/// Fatal run failures. Any of these ends a run with exactly one `error`
/// event; per-title problems never surface here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to spawn list extractor `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("list extraction failed: {0}")]
    Extraction(#[from] ExtractionFailure),

    #[error("run exceeded its deadline of {0:?}")]
    Timeout(Duration),

    #[error("client disconnected before the run finished")]
    ClientDisconnected,
}

impl PipelineError {
    /// Message sent to the client in the terminal `error` event.
    pub fn client_message(&self) -> &'static str {
        match self {
            PipelineError::Spawn { .. } => "Failed to run list extractor",
            PipelineError::Extraction(_) => "Failed to extract movies from list",
            PipelineError::Timeout(_) => "Request timed out",
            PipelineError::ClientDisconnected => "Client disconnected",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PipelineError::Timeout(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("extractor exited with status {code}")]
    NonZeroExit { code: i32 },

    #[error("extractor was terminated by a signal")]
    Terminated,

    #[error("extractor produced no titles")]
    NoCandidates,

    #[error("extractor I/O error: {0}")]
    Io(String),
}

/// Per-title lookup failures. Absorbed by the resolver and reported as an
/// `error` status on the item.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("metadata API returned status {0}")]
    Status(u16),

    #[error("invalid API key")]
    InvalidApiKey,

    #[error("rate limited by metadata API")]
    RateLimited,

    #[error("parse error: {0}")]
    Parse(String),
}

/// Cache backend failures. Logged, then treated as a miss (reads) or a
/// no-op (writes).
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

/// Failures of the single-title lookup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LookupError {
    #[error("movie title is required")]
    InvalidTitle,

    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
}
