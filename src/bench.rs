//! Parent side of the harness
//!
//! A [`Bench`] owns one worker process. Requests are written to the
//! worker's stdin; a reader thread routes responses from its stdout back
//! to the [`Pending`] handle of the matching request.

use crate::error::{Error, Result};
use crate::protocol::{decode_line, encode_line, Request, Response};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Aggregated timing for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchResult {
    /// Name the bench was created with
    pub name: String,
    /// Wall time of all iterations, in nanoseconds
    pub total: u64,
    /// Number of iterations measured
    pub iterations: u64,
}

impl BenchResult {
    /// Mean nanoseconds per iteration, 0 for an empty measurement
    pub fn per_iteration(&self) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            self.total as f64 / self.iterations as f64
        }
    }

    /// Iterations per second, 0 when nothing was timed
    pub fn ops_per_sec(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.iterations as f64 * 1e9 / self.total as f64
        }
    }
}

/// In-flight requests keyed by id
#[derive(Default)]
struct Routes {
    waiting: HashMap<u64, Sender<Response>>,
    /// Set once the worker's stdout is gone
    finished: bool,
}

fn lock_routes(routes: &Mutex<Routes>) -> MutexGuard<'_, Routes> {
    // Routes stay consistent even if a holder panicked.
    routes
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A benchmark script running in its own worker process
pub struct Bench {
    name: String,
    child: Child,
    stdin: Option<ChildStdin>,
    routes: Arc<Mutex<Routes>>,
    next_id: u64,
    killed: bool,
}

impl Bench {
    /// Spawn a worker running `program`
    pub fn new<S: AsRef<OsStr>>(name: impl Into<String>, program: S) -> Result<Self> {
        Self::with_args(name, program, std::iter::empty::<&OsStr>())
    }

    /// Spawn a worker running `program` with extra arguments
    pub fn with_args<S, I, A>(name: impl Into<String>, program: S, args: I) -> Result<Self>
    where
        S: AsRef<OsStr>,
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let name = name.into();
        let program = program.as_ref();

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| Error::Spawn {
                program: program.to_string_lossy().into_owned(),
                source,
            })?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::protocol_error("worker stdout was not captured"))?;

        let routes = Arc::new(Mutex::new(Routes::default()));
        if let Err(e) = Self::spawn_reader(&name, stdout, Arc::clone(&routes)) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        debug!("spawned worker {} for '{name}'", child.id());

        Ok(Bench {
            name,
            child,
            stdin,
            routes,
            next_id: 1,
            killed: false,
        })
    }

    /// Start the thread that routes worker responses to pending requests
    fn spawn_reader(name: &str, stdout: ChildStdout, routes: Arc<Mutex<Routes>>) -> Result<()> {
        let bench_name = name.to_owned();
        thread::Builder::new()
            .name(format!("child-bench-{name}"))
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            warn!("reading from worker '{bench_name}' failed: {e}");
                            break;
                        }
                    };
                    if line.trim().is_empty() {
                        continue;
                    }

                    match decode_line::<Response>(&line) {
                        Ok(response) => Self::route(&routes, response),
                        Err(_) => debug!("[{bench_name}] {line}"),
                    }
                }

                // Dropping the senders fails every request still waiting.
                let mut routes = lock_routes(&routes);
                routes.finished = true;
                routes.waiting.clear();
                debug!("worker output for '{bench_name}' closed");
            })?;
        Ok(())
    }

    fn route(routes: &Mutex<Routes>, response: Response) {
        let id = response.id();
        let sender = lock_routes(routes).waiting.remove(&id);
        match sender {
            // The receiver is gone when the caller stopped waiting.
            Some(sender) => {
                let _ = sender.send(response);
            }
            None => debug!("discarding response for request {id}, nobody is waiting"),
        }
    }

    /// Name this bench reports results under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// OS process id of the worker
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Whether requests can still reach the worker
    pub fn is_connected(&self) -> bool {
        self.stdin.is_some() && !lock_routes(&self.routes).finished
    }

    /// Whether [`Bench::close`] has terminated the worker
    pub fn is_killed(&self) -> bool {
        self.killed
    }

    /// Ask the worker for `iterations` runs without waiting for the answer
    pub fn exec(&mut self, iterations: u64) -> Result<Pending> {
        let id = self.next_id;
        let line = encode_line(&Request::Run { id, iterations })?;

        let stdin = self.stdin.as_mut().ok_or_else(|| Error::Closed {
            name: self.name.clone(),
        })?;

        let (tx, rx) = mpsc::channel();
        {
            let mut routes = lock_routes(&self.routes);
            if routes.finished {
                return Err(Error::WorkerExited {
                    name: self.name.clone(),
                });
            }
            routes.waiting.insert(id, tx);
        }

        if let Err(e) = stdin.write_all(line.as_bytes()).and_then(|()| stdin.flush()) {
            lock_routes(&self.routes).waiting.remove(&id);
            return Err(match e.kind() {
                std::io::ErrorKind::BrokenPipe => Error::WorkerExited {
                    name: self.name.clone(),
                },
                _ => Error::Io(e),
            });
        }

        self.next_id += 1;
        debug!("sent request {id} ({iterations} iterations) to '{}'", self.name);

        Ok(Pending {
            name: self.name.clone(),
            id,
            rx,
            routes: Arc::clone(&self.routes),
        })
    }

    /// Run `iterations` and wait for the result
    pub fn run(&mut self, iterations: u64) -> Result<BenchResult> {
        self.exec(iterations)?.wait()
    }

    /// Disconnect from the worker and kill it
    ///
    /// Calling this more than once is harmless.
    pub fn close(&mut self) {
        if self.killed {
            return;
        }

        self.stdin.take();

        if let Err(e) = self.child.kill() {
            debug!("kill of worker for '{}' failed: {e}", self.name);
        }
        if let Err(e) = self.child.wait() {
            debug!("reaping worker for '{}' failed: {e}", self.name);
        }

        self.killed = true;
        debug!("closed bench '{}'", self.name);
    }
}

impl Drop for Bench {
    fn drop(&mut self) {
        self.close();
    }
}

/// A request that has been sent but not yet answered
///
/// Dropping it, or letting a wait time out, stops routing the worker's
/// answer to it.
#[must_use = "a pending request does nothing unless waited on"]
pub struct Pending {
    name: String,
    id: u64,
    rx: Receiver<Response>,
    routes: Arc<Mutex<Routes>>,
}

impl Pending {
    /// Request id used on the wire
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Block until the worker answers
    pub fn wait(self) -> Result<BenchResult> {
        match self.rx.recv() {
            Ok(response) => self.resolve(response),
            Err(_) => Err(self.exited()),
        }
    }

    /// Block until the worker answers or `timeout` elapses
    pub fn wait_timeout(self, timeout: Duration) -> Result<BenchResult> {
        match self.rx.recv_timeout(timeout) {
            Ok(response) => self.resolve(response),
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout {
                name: self.name.clone(),
                timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(self.exited()),
        }
    }

    /// [`Pending::wait_timeout`] when a timeout is given, [`Pending::wait`] otherwise
    pub fn wait_for(self, timeout: Option<Duration>) -> Result<BenchResult> {
        match timeout {
            Some(timeout) => self.wait_timeout(timeout),
            None => self.wait(),
        }
    }

    fn resolve(&self, response: Response) -> Result<BenchResult> {
        match response {
            Response::Result {
                total, iterations, ..
            } => Ok(BenchResult {
                name: self.name.clone(),
                total,
                iterations,
            }),
            Response::Error { message, .. } => Err(Error::Script {
                name: self.name.clone(),
                message,
            }),
        }
    }

    fn exited(&self) -> Error {
        Error::WorkerExited {
            name: self.name.clone(),
        }
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        // Answered requests are already gone; this clears abandoned ones.
        lock_routes(&self.routes).waiting.remove(&self.id);
    }
}
