//! Configuration for Marquee.
//!
//! Values are layered environment > TOML file > built-in defaults. A `.env`
//! file is honoured when present. Soft problems come back as
//! [`ConfigWarnings`] for the caller to log; hard ones as
//! [`ConfigLoadError`].

mod loader;
mod models;
mod sources;
mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader};
pub use models::{
    Config, ConfigMetadata, ExtractorConfig, PipelineConfig, RedisConfig,
    ServerConfig, TmdbConfig,
};
pub use sources::{EnvConfig, FileConfig};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
