//! Events pushed to a subscribed client while a list run progresses.
//!
//! Every event serializes to a single JSON object discriminated by `type`.
//! `error` and `complete` are terminal: nothing follows them.

use serde::{Deserialize, Serialize};

use super::movie::ResolvedMovie;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    #[serde(rename = "progress")]
    Progress(Progress),
    #[serde(rename = "movie_found")]
    Item { movie: ResolvedMovie },
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(rename = "complete")]
    Complete { stats: RunStats },
}

impl PipelineEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::Error { .. } | PipelineEvent::Complete { .. })
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            PipelineEvent::Progress(_) => "progress",
            PipelineEvent::Item { .. } => "movie_found",
            PipelineEvent::Error { .. } => "error",
            PipelineEvent::Complete { .. } => "complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Progress {
    Step {
        current: usize,
        total: usize,
        #[serde(rename = "movieTitle")]
        movie_title: String,
        phase: ProgressPhase,
    },
    Notice {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    Extracting,
    CacheCheck,
    Processing,
}

/// Counters reported by the `complete` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total: usize,
    pub processed: usize,
    pub cached: usize,
    pub found: usize,
}
