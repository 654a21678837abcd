//! Core library for Marquee.
//!
//! Turns a reference to an externally hosted movie list into a stream of
//! enriched movie records: titles come from an external extractor process,
//! are deduplicated, checked against a cache, and the misses are resolved
//! one at a time against TMDB search and watch-provider data.
//!
//! The entry points are [`pipeline::ListPipeline`] for whole lists and
//! [`pipeline::TitleLookup`] for a single title.

pub mod cache;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod providers;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{CacheError, ExtractionFailure, LookupError, PipelineError, ProviderError};
