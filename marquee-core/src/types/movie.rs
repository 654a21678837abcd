use serde::{Deserialize, Serialize};
use std::fmt;

use super::key::NormalizedKey;

/// A raw title discovered by the list extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
}

impl Candidate {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    pub fn key(&self) -> NormalizedKey {
        NormalizedKey::from_title(&self.title)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovieStatus {
    Found,
    NoAvailability,
    NotFound,
    Error,
}

impl MovieStatus {
    /// Error results are cached briefly so they are retried on a later run.
    pub fn is_transient(self) -> bool {
        matches!(self, MovieStatus::Error)
    }
}

impl fmt::Display for MovieStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MovieStatus::Found => "found",
            MovieStatus::NoAvailability => "no_availability",
            MovieStatus::NotFound => "not_found",
            MovieStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Identifier of a resolved movie.
///
/// Titles the catalog knows carry the TMDB id; the rest get a synthetic id
/// derived from their key, so re-runs produce identical payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MovieId {
    Tmdb(u64),
    Synthetic(String),
}

impl MovieId {
    pub fn synthetic(status: MovieStatus, key: &NormalizedKey) -> Self {
        MovieId::Synthetic(format!("{status}:{}", key.short()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Stream,
    Rent,
}

/// One availability option for a movie in a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: u64,
    pub name: String,
    pub region: String,
    pub kind: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<String>,
}

/// The enriched record produced for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMovie {
    pub id: MovieId,
    pub title: String,
    pub original_title: String,
    pub poster_path: Option<String>,
    pub vote_average: f32,
    pub release_date: Option<String>,
    pub providers: Vec<Provider>,
    pub status: MovieStatus,
}

impl ResolvedMovie {
    /// A title the catalog has no entry for.
    pub fn not_found(original_title: &str) -> Self {
        Self::unresolved(original_title, MovieStatus::NotFound)
    }

    /// A title whose lookup failed with a network or parse error.
    pub fn failed(original_title: &str) -> Self {
        Self::unresolved(original_title, MovieStatus::Error)
    }

    fn unresolved(original_title: &str, status: MovieStatus) -> Self {
        let key = NormalizedKey::from_title(original_title);
        Self {
            id: MovieId::synthetic(status, &key),
            title: original_title.to_string(),
            original_title: original_title.to_string(),
            poster_path: None,
            vote_average: 0.0,
            release_date: None,
            providers: Vec::new(),
            status,
        }
    }

    pub fn has_availability(&self) -> bool {
        !self.providers.is_empty()
    }
}
