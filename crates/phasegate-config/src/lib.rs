//! phasegate configuration
//!
//! Injectable configuration access for the orchestrator and its validators:
//! - [`ConfigProvider`]: the single read path (`get(key)`)
//! - [`ProcessEnvProvider`], [`MapProvider`], [`LayeredProvider`]
//! - [`CachedProvider`]: explicit keyed cache with invalidation and a version stamp
//! - [`Environment`]: development / testing / staging / production

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cache;
pub mod environment;
pub mod error;
pub mod provider;

pub use cache::{CacheStats, CachedProvider};
pub use environment::{Environment, UnknownEnvironment, ENVIRONMENT_KEYS};
pub use error::ConfigError;
pub use provider::{
    ConfigProvider, ConfigProviderExt, LayeredProvider, MapProvider, ProcessEnvProvider,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
