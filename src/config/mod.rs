//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DeadlineConfig (validated, immutable)
//!     → handed to the executor, HTTP pipeline and observability setup
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{DeadlineConfig, ExecutorConfig, HttpConfig, LogFormat, ObservabilityConfig};
pub use validation::{validate_config, ValidationError};
