pub mod availability;
pub mod title;
pub mod tmdb;

pub use availability::{DEFAULT_REGIONS, aggregate_providers};
pub use title::TitleQuery;
pub use tmdb::{TmdbResolver, TmdbSettings};

use async_trait::async_trait;

use crate::types::ResolvedMovie;

/// Resolves one raw title to catalog metadata plus availability.
///
/// Implementations absorb every network or parse failure and report it as
/// [`crate::types::MovieStatus::Error`]; `resolve` itself cannot fail.
/// Rate limiting is the caller's job.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn resolve(&self, title: &str) -> ResolvedMovie;
}
