//! Environment reader module
//!
//! This module provides a small abstraction over process environment lookups
//! so configuration resolution can be tested without touching the real
//! environment.

use std::env;
use std::fmt;

/// Errors that can occur while reading environment variables
#[derive(Debug, Clone, PartialEq)]
pub enum EnvError {
    /// The variable is set but is not valid unicode
    NotUnicode { key: String },
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvError::NotUnicode { key } => {
                write!(f, "Environment variable {key} is not valid unicode")
            }
        }
    }
}

impl std::error::Error for EnvError {}

/// Trait for reading configuration values from the environment
pub trait EnvReader {
    /// Get a variable by key, `None` when unset
    fn get_var(&self, key: &str) -> Result<Option<String>, EnvError>;
}

/// Reader backed by the real process environment
pub struct SystemEnvReader;

impl EnvReader for SystemEnvReader {
    fn get_var(&self, key: &str) -> Result<Option<String>, EnvError> {
        match env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(EnvError::NotUnicode {
                key: key.to_owned(),
            }),
        }
    }
}

/// Mock environment reader for testing
#[cfg(test)]
pub struct MockEnvReader {
    vars: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl Default for MockEnvReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl MockEnvReader {
    /// Create an empty mock environment
    pub fn new() -> Self {
        Self {
            vars: std::collections::HashMap::new(),
        }
    }

    /// Add a variable to the mock environment
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

#[cfg(test)]
impl EnvReader for MockEnvReader {
    fn get_var(&self, key: &str) -> Result<Option<String>, EnvError> {
        Ok(self.vars.get(key).cloned())
    }
}
