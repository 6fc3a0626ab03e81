//! Configuration module for child-bench
//!
//! Settings are resolved in layers:
//!
//! 1. CLI parameters (highest priority)
//! 2. `CHILD_BENCH_*` environment variables
//! 3. Hardcoded defaults (only when neither is set)
//!
//! Invalid values at any layer are errors; they never fall back to a default.
//!
//! - [`env_reader`] - environment lookup abstraction with a test mock
//! - [`env_config`] - validated reads of the individual variables
//! - [`app_config`] - the combined [`AppConfig`]
//!
//! ```rust
//! use child_bench::config::{AppConfig, CliArgs};
//!
//! let cli_args = CliArgs {
//!     iterations: Some("50".to_owned()),
//!     ..CliArgs::default()
//! };
//!
//! let config = AppConfig::from_cli(cli_args)?;
//! assert_eq!(config.iterations(), 50);
//! # Ok::<(), child_bench::ConfigError>(())
//! ```

pub mod app_config;
pub mod env_config;
pub mod env_reader;

pub use app_config::{AppConfig, CliArgs, ConfigBuilder, DEFAULT_ITERATIONS};
pub use env_config::{ConfigError, EnvConfig};
pub use env_reader::{EnvError, EnvReader, SystemEnvReader};

#[cfg(test)]
pub use env_reader::MockEnvReader;
