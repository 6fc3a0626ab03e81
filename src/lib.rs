//! child-bench library
//!
//! Runs benchmark scripts in isolated worker processes and collects timing
//! results over a line-delimited JSON protocol.
//!
//! The parent side is [`Bench`]; the worker side, used to write scripts,
//! is [`worker::Script`].
//!
//! # Examples
//!
//! ```no_run
//! use child_bench::Bench;
//!
//! let mut bench = Bench::new("sync", "./target/release/my-bench-script")?;
//!
//! let first = bench.exec(10)?.wait()?;
//! let second = bench.run(5)?;
//! assert_eq!(first.iterations, 10);
//! assert_eq!(second.iterations, 5);
//!
//! bench.close();
//! assert!(bench.is_killed());
//! # Ok::<(), child_bench::Error>(())
//! ```

pub mod bench;
pub mod config;
pub mod error;
pub mod protocol;
pub mod report;
pub mod worker;

pub use bench::{Bench, BenchResult, Pending};
pub use config::{AppConfig, CliArgs, ConfigError};
pub use error::{Error, Result};
pub use report::OutputFormat;
pub use worker::{Done, Script, ScriptError, ScriptResult};
