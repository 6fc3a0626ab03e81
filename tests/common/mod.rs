//! Shared helpers for the integration tests
//!
//! All worker processes come from the `child-bench-fixture` example; the
//! script it serves is selected by name.

#![allow(dead_code)]

use assert_cmd::Command;
use child_bench::{Bench, Result};
use std::env::consts::EXE_SUFFIX;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Once};

/// Name of the example target holding the fixture worker scripts
pub const FIXTURE_NAME: &str = "child-bench-fixture";

/// Environment variable the fixture reads when started without arguments
pub const FIXTURE_VAR: &str = "CHILD_BENCH_FIXTURE";

static FIXTURE_BUILD: Once = Once::new();

/// `target/<profile>/examples/child-bench-fixture`, next to this test binary's `deps/`
static FIXTURE: LazyLock<PathBuf> = LazyLock::new(|| {
    let exe = std::env::current_exe().expect("locate test binary");
    let profile_dir = exe
        .parent()
        .and_then(Path::parent)
        .expect("test binary lives in target/<profile>/deps");
    profile_dir
        .join("examples")
        .join(format!("{FIXTURE_NAME}{EXE_SUFFIX}"))
});

/// Path of the fixture worker, building it when the test run did not
pub fn fixture() -> &'static Path {
    FIXTURE_BUILD.call_once(|| {
        if FIXTURE.exists() {
            return;
        }
        let output = std::process::Command::new(env!("CARGO"))
            .args(["build", "--example", FIXTURE_NAME])
            .output()
            .expect("Failed to execute cargo build");

        if !output.status.success() {
            panic!(
                "Failed to build fixture worker: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
    });
    &FIXTURE
}

/// `NAME=PROGRAM` target for the fixture worker
pub fn fixture_target(name: &str) -> String {
    format!("{name}={}", fixture().display())
}

/// Spawn a bench named `name` serving the fixture script `script`
pub fn fixture_bench(name: &str, script: &str) -> Result<Bench> {
    Bench::with_args(name, fixture(), [script])
}

/// The child-bench binary with a clean `CHILD_BENCH_*` environment
pub fn child_bench_cmd(script: &str) -> Command {
    let mut cmd = Command::cargo_bin("child-bench").unwrap();
    cmd.env_remove("CHILD_BENCH_ITERATIONS")
        .env_remove("CHILD_BENCH_REPEAT")
        .env_remove("CHILD_BENCH_TIMEOUT")
        .env_remove("CHILD_BENCH_FORMAT")
        .env(FIXTURE_VAR, script);
    cmd
}
