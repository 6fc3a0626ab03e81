//! Environment configuration module
//!
//! This module reads and validates the `CHILD_BENCH_*` environment variables.

use super::env_reader::{EnvError, EnvReader, SystemEnvReader};
use crate::report::OutputFormat;
use std::fmt;
use std::time::Duration;

pub const ITERATIONS_VAR: &str = "CHILD_BENCH_ITERATIONS";
pub const REPEAT_VAR: &str = "CHILD_BENCH_REPEAT";
pub const TIMEOUT_VAR: &str = "CHILD_BENCH_TIMEOUT";
pub const FORMAT_VAR: &str = "CHILD_BENCH_FORMAT";

/// Configuration errors that can occur while resolving settings
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Invalid environment variable value
    InvalidEnvironment {
        key: String,
        value: String,
        expected: String,
    },
    /// Environment variable could not be read
    UnreadableEnvironment { key: String },
    /// Invalid CLI argument value
    InvalidCliArgument {
        argument: String,
        value: String,
        expected: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidEnvironment {
                key,
                value,
                expected,
            } => write!(
                f,
                "Invalid environment value: {key}='{value}' (expected: {expected})"
            ),
            ConfigError::UnreadableEnvironment { key } => {
                write!(f, "Environment variable {key} is not valid unicode")
            }
            ConfigError::InvalidCliArgument {
                argument,
                value,
                expected,
            } => write!(
                f,
                "Invalid CLI argument: {argument}='{value}' (expected: {expected})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<EnvError> for ConfigError {
    fn from(error: EnvError) -> Self {
        match error {
            EnvError::NotUnicode { key } => ConfigError::UnreadableEnvironment { key },
        }
    }
}

pub(crate) const POSITIVE_INTEGER: &str = "positive integer";
pub(crate) const POSITIVE_SECONDS: &str = "positive number of seconds";
pub(crate) const FORMAT_NAMES: &str = "text or json";

/// Parse a count that must be at least one
pub(crate) fn parse_positive(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().filter(|&n| n > 0)
}

/// Parse a timeout in (possibly fractional) seconds
pub(crate) fn parse_seconds(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Environment configuration operations
pub struct EnvConfig;

impl EnvConfig {
    /// Get the iteration count from the environment
    pub fn get_iterations() -> Result<Option<u64>, ConfigError> {
        Self::get_iterations_with_reader(&SystemEnvReader)
    }

    /// Get the iteration count with custom reader (for testing)
    pub fn get_iterations_with_reader<R: EnvReader>(
        reader: &R,
    ) -> Result<Option<u64>, ConfigError> {
        Self::read_parsed(reader, ITERATIONS_VAR, parse_positive, POSITIVE_INTEGER)
    }

    /// Get the repeat count from the environment
    pub fn get_repeat() -> Result<Option<u64>, ConfigError> {
        Self::get_repeat_with_reader(&SystemEnvReader)
    }

    /// Get the repeat count with custom reader (for testing)
    pub fn get_repeat_with_reader<R: EnvReader>(reader: &R) -> Result<Option<u64>, ConfigError> {
        Self::read_parsed(reader, REPEAT_VAR, parse_positive, POSITIVE_INTEGER)
    }

    /// Get the per-request timeout from the environment
    pub fn get_timeout() -> Result<Option<Duration>, ConfigError> {
        Self::get_timeout_with_reader(&SystemEnvReader)
    }

    /// Get the per-request timeout with custom reader (for testing)
    pub fn get_timeout_with_reader<R: EnvReader>(
        reader: &R,
    ) -> Result<Option<Duration>, ConfigError> {
        Self::read_parsed(reader, TIMEOUT_VAR, parse_seconds, POSITIVE_SECONDS)
    }

    /// Get the report format from the environment
    pub fn get_format() -> Result<Option<OutputFormat>, ConfigError> {
        Self::get_format_with_reader(&SystemEnvReader)
    }

    /// Get the report format with custom reader (for testing)
    pub fn get_format_with_reader<R: EnvReader>(
        reader: &R,
    ) -> Result<Option<OutputFormat>, ConfigError> {
        Self::read_parsed(
            reader,
            FORMAT_VAR,
            |value| value.parse().ok(),
            FORMAT_NAMES,
        )
    }

    /// Read a variable and parse it; empty values count as unset
    fn read_parsed<R, T, P>(
        reader: &R,
        key: &str,
        parse: P,
        expected: &str,
    ) -> Result<Option<T>, ConfigError>
    where
        R: EnvReader,
        P: Fn(&str) -> Option<T>,
    {
        reader
            .get_var(key)?
            .filter(|value| !value.trim().is_empty())
            .map(|value| {
                parse(&value).ok_or_else(|| ConfigError::InvalidEnvironment {
                    key: key.to_owned(),
                    value: value.clone(),
                    expected: expected.to_owned(),
                })
            })
            .transpose()
    }
}
