//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, templates compiled once)
//!     → AppConfig (validated, immutable)
//!     → routing::builder (route tree)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → HttpServer builds a new route tree
//!     → atomic swap of the live tree
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A reload that fails to load or validate keeps the current tree

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AppConfig, ListenerConfig, LogFormat, ObservabilityConfig, RouteConfig, RouterConfig,
    TargetConfig, VirtualHostConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
