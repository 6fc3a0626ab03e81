//! Worker side of the harness
//!
//! A benchmark script is an ordinary executable that builds a [`Script`]
//! and hands control to [`Script::serve`]. The worker then answers run
//! requests from the parent until its stdin is closed.
//!
//! ```no_run
//! use child_bench::worker::Script;
//!
//! fn main() -> child_bench::Result<()> {
//!     let mut counter = 0u64;
//!     Script::new(move || {
//!         counter = counter.wrapping_add(1);
//!         Ok(())
//!     })
//!     .serve()
//! }
//! ```
//!
//! Asynchronous scripts receive a [`Done`] handle instead, which may be
//! completed from any thread:
//!
//! ```no_run
//! use child_bench::worker::Script;
//! use std::{thread, time::Duration};
//!
//! fn main() -> child_bench::Result<()> {
//!     Script::new_async(|done| {
//!         thread::spawn(move || {
//!             thread::sleep(Duration::from_millis(10));
//!             done.ok();
//!         });
//!     })
//!     .serve()
//! }
//! ```

use crate::error::Result;
use crate::protocol::{decode_line, encode_line, Request, Response};
use log::{debug, warn};
use std::any::Any;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Message reported when an async step never completes its [`Done`] handle
pub const DONE_DROPPED: &str = "done callback dropped without completing";

/// Failure raised by a benchmark script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError(String);

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        ScriptError(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ScriptError {}

impl From<&str> for ScriptError {
    fn from(message: &str) -> Self {
        ScriptError::new(message)
    }
}

impl From<String> for ScriptError {
    fn from(message: String) -> Self {
        ScriptError(message)
    }
}

/// Outcome of a single script step
pub type ScriptResult = std::result::Result<(), ScriptError>;

/// Completion handle passed to asynchronous steps
///
/// Consuming `self` guarantees a step completes at most once. Dropping the
/// handle without calling either method fails the step.
pub struct Done {
    tx: mpsc::Sender<ScriptResult>,
}

impl Done {
    fn channel() -> (Self, mpsc::Receiver<ScriptResult>) {
        let (tx, rx) = mpsc::channel();
        (Done { tx }, rx)
    }

    /// Complete the step successfully
    pub fn ok(self) {
        self.finish(Ok(()));
    }

    /// Fail the step with `message`
    pub fn fail(self, message: impl Into<String>) {
        self.finish(Err(ScriptError::new(message)));
    }

    /// Complete the step with an explicit result
    pub fn finish(self, result: ScriptResult) {
        // The worker stops listening once a timed-out request is abandoned.
        let _ = self.tx.send(result);
    }
}

type SyncStep = Box<dyn FnMut() -> ScriptResult>;
type AsyncStep = Box<dyn FnMut(Done)>;

enum Step {
    Sync(SyncStep),
    Async(AsyncStep),
}

impl Step {
    fn call(&mut self) -> ScriptResult {
        match self {
            Step::Sync(f) => catch_panic(|| f()),
            Step::Async(f) => {
                let (done, rx) = Done::channel();
                catch_panic(|| {
                    f(done);
                    Ok(())
                })?;
                rx.recv()
                    .unwrap_or_else(|_| Err(ScriptError::new(DONE_DROPPED)))
            }
        }
    }
}

fn catch_panic<F: FnOnce() -> ScriptResult>(f: F) -> ScriptResult {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| Err(panic_message(payload)))
}

fn panic_message(payload: Box<dyn Any + Send>) -> ScriptError {
    if let Some(message) = payload.downcast_ref::<&str>() {
        ScriptError::new(*message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        ScriptError::new(message.clone())
    } else {
        ScriptError::new("benchmark panicked")
    }
}

/// A benchmark script served by a worker process
pub struct Script {
    body: Step,
    before: Option<Step>,
    run: Option<Step>,
}

impl Script {
    /// Create a script from a synchronous benchmark body
    pub fn new<F>(body: F) -> Self
    where
        F: FnMut() -> ScriptResult + 'static,
    {
        Self::from_step(Step::Sync(Box::new(body)))
    }

    /// Create a script from an asynchronous benchmark body
    pub fn new_async<F>(body: F) -> Self
    where
        F: FnMut(Done) + 'static,
    {
        Self::from_step(Step::Async(Box::new(body)))
    }

    fn from_step(body: Step) -> Self {
        Script {
            body,
            before: None,
            run: None,
        }
    }

    /// Call `hook` before each run request, outside the timed region
    #[must_use]
    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: FnMut() -> ScriptResult + 'static,
    {
        self.before = Some(Step::Sync(Box::new(hook)));
        self
    }

    /// Asynchronous variant of [`Script::before`]
    #[must_use]
    pub fn before_async<F>(mut self, hook: F) -> Self
    where
        F: FnMut(Done) + 'static,
    {
        self.before = Some(Step::Async(Box::new(hook)));
        self
    }

    /// Replace the benchmark body; takes precedence over the constructor's body
    #[must_use]
    pub fn run<F>(mut self, body: F) -> Self
    where
        F: FnMut() -> ScriptResult + 'static,
    {
        self.run = Some(Step::Sync(Box::new(body)));
        self
    }

    /// Asynchronous variant of [`Script::run`]
    #[must_use]
    pub fn run_async<F>(mut self, body: F) -> Self
    where
        F: FnMut(Done) + 'static,
    {
        self.run = Some(Step::Async(Box::new(body)));
        self
    }

    /// Run the `before` hook, then time `iterations` sequential calls of the body
    pub fn measure(&mut self, iterations: u64) -> std::result::Result<Duration, ScriptError> {
        if iterations == 0 {
            return Ok(Duration::ZERO);
        }

        if let Some(hook) = self.before.as_mut() {
            hook.call()?;
        }

        let step = match self.run.as_mut() {
            Some(step) => step,
            None => &mut self.body,
        };

        let start = Instant::now();
        for _ in 0..iterations {
            step.call()?;
        }
        Ok(start.elapsed())
    }

    /// Answer a single request
    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::Run { id, iterations } => match self.measure(iterations) {
                Ok(elapsed) => Response::Result {
                    id,
                    total: u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX),
                    iterations,
                },
                Err(error) => Response::Error {
                    id,
                    message: error.0,
                },
            },
        }
    }

    /// Serve requests from `reader` until EOF, writing responses to `writer`
    pub fn serve_with<R: BufRead, W: Write>(&mut self, reader: R, mut writer: W) -> Result<()> {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let request: Request = match decode_line(&line) {
                Ok(request) => request,
                Err(e) => {
                    warn!("ignoring request: {e}");
                    continue;
                }
            };

            debug!("handling {request:?}");
            let response = self.handle(request);
            // Script output may have left a line unterminated.
            let mut framed = String::from("\n");
            framed.push_str(&encode_line(&response)?);
            writer.write_all(framed.as_bytes())?;
            writer.flush()?;
        }

        debug!("request stream closed, worker exiting");
        Ok(())
    }

    /// Serve requests on the process's stdin and stdout
    pub fn serve(mut self) -> Result<()> {
        // Stdout is not locked for the whole loop so script threads can still print.
        self.serve_with(io::stdin().lock(), io::stdout())
    }
}
