pub mod events;
pub mod key;
pub mod list;
pub mod movie;

pub use events::{PipelineEvent, Progress, ProgressPhase, RunStats};
pub use key::{NormalizedKey, normalize_title};
pub use list::{ListReference, ListReferenceError};
pub use movie::{
    Candidate, MovieId, MovieStatus, Provider, ProviderKind, ResolvedMovie,
};
