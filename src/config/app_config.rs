//! Application configuration module
//!
//! This module provides the main application configuration structure that combines
//! CLI arguments with environment values using a clear priority system.

use super::env_config::{
    parse_positive, parse_seconds, ConfigError, EnvConfig, FORMAT_NAMES, POSITIVE_INTEGER,
    POSITIVE_SECONDS,
};
use super::env_reader::{EnvReader, SystemEnvReader};
use crate::report::OutputFormat;
use std::time::Duration;

/// Iterations per request when nothing else is configured
pub const DEFAULT_ITERATIONS: u64 = 1000;

/// CLI arguments structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// Iterations per request
    pub iterations: Option<String>,
    /// Requests per benchmark
    pub repeat: Option<String>,
    /// Per-request timeout in seconds
    pub timeout: Option<String>,
    /// Report format
    pub format: Option<String>,
}

/// Main application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    iterations: u64,
    repeat: u64,
    timeout: Option<Duration>,
    format: OutputFormat,
}

/// Configuration builder for functional composition
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    iterations: Option<u64>,
    repeat: Option<u64>,
    timeout: Option<Duration>,
    format: Option<OutputFormat>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    #[must_use]
    pub const fn new() -> Self {
        Self {
            iterations: None,
            repeat: None,
            timeout: None,
            format: None,
        }
    }

    /// Set iterations per request
    #[must_use]
    pub const fn with_iterations(mut self, iterations: Option<u64>) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set requests per benchmark
    #[must_use]
    pub const fn with_repeat(mut self, repeat: Option<u64>) -> Self {
        self.repeat = repeat;
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the report format
    #[must_use]
    pub const fn with_format(mut self, format: Option<OutputFormat>) -> Self {
        self.format = format;
        self
    }

    /// Build the final AppConfig
    pub fn build(self) -> AppConfig {
        AppConfig {
            iterations: self.iterations.unwrap_or(DEFAULT_ITERATIONS),
            repeat: self.repeat.unwrap_or(1),
            timeout: self.timeout,
            format: self.format.unwrap_or_default(),
        }
    }
}

impl AppConfig {
    /// Create AppConfig from CLI arguments
    ///
    /// Priority order:
    /// 1. CLI parameters (highest priority)
    /// 2. `CHILD_BENCH_*` environment variables
    /// 3. Hardcoded defaults (only when neither is set)
    pub fn from_cli(cli_args: CliArgs) -> Result<Self, ConfigError> {
        Self::from_cli_with_reader(cli_args, &SystemEnvReader)
    }

    /// Create AppConfig with a custom environment reader (for testing)
    pub fn from_cli_with_reader<R: EnvReader>(
        cli_args: CliArgs,
        reader: &R,
    ) -> Result<Self, ConfigError> {
        let iterations = match Self::parse_cli(
            &cli_args.iterations,
            "--iterations",
            parse_positive,
            POSITIVE_INTEGER,
        )? {
            Some(iterations) => Some(iterations),
            None => EnvConfig::get_iterations_with_reader(reader)?,
        };

        let repeat = match Self::parse_cli(
            &cli_args.repeat,
            "--repeat",
            parse_positive,
            POSITIVE_INTEGER,
        )? {
            Some(repeat) => Some(repeat),
            None => EnvConfig::get_repeat_with_reader(reader)?,
        };

        let timeout = match Self::parse_cli(
            &cli_args.timeout,
            "--timeout",
            parse_seconds,
            POSITIVE_SECONDS,
        )? {
            Some(timeout) => Some(timeout),
            None => EnvConfig::get_timeout_with_reader(reader)?,
        };

        let format = match Self::parse_cli(
            &cli_args.format,
            "--format",
            |value| value.parse().ok(),
            FORMAT_NAMES,
        )? {
            Some(format) => Some(format),
            None => EnvConfig::get_format_with_reader(reader)?,
        };

        Ok(ConfigBuilder::new()
            .with_iterations(iterations)
            .with_repeat(repeat)
            .with_timeout(timeout)
            .with_format(format)
            .build())
    }

    /// Parse and validate an optional CLI value
    fn parse_cli<T, P>(
        value: &Option<String>,
        argument: &str,
        parse: P,
        expected: &str,
    ) -> Result<Option<T>, ConfigError>
    where
        P: Fn(&str) -> Option<T>,
    {
        value
            .as_deref()
            .map(|raw| {
                parse(raw).ok_or_else(|| ConfigError::InvalidCliArgument {
                    argument: argument.to_owned(),
                    value: raw.to_owned(),
                    expected: expected.to_owned(),
                })
            })
            .transpose()
    }

    /// Iterations requested from each worker per run
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Number of runs per benchmark
    pub fn repeat(&self) -> u64 {
        self.repeat
    }

    /// Maximum wait for a single run, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Report format
    pub fn format(&self) -> OutputFormat {
        self.format
    }
}
