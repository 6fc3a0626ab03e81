//! CLI entry point for child-bench
//!
//! Runs each benchmark script in its own worker process, one after another,
//! and prints a timing report.

use anyhow::{bail, Context};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use child_bench::config::CliArgs;
use child_bench::report::write_report;
use child_bench::{AppConfig, Bench, BenchResult};

/// Run benchmark scripts in isolated worker processes
#[derive(Parser)]
#[command(name = "child-bench")]
#[command(version, about, long_about = None)]
struct Args {
    /// Benchmarks to run, as NAME=PROGRAM or just PROGRAM
    #[arg(required = true, value_name = "TARGET")]
    targets: Vec<String>,

    /// Iterations per run [env: CHILD_BENCH_ITERATIONS] [default: 1000]
    #[arg(short = 'n', long, value_name = "N")]
    iterations: Option<String>,

    /// Runs per benchmark, reusing the same worker [env: CHILD_BENCH_REPEAT] [default: 1]
    #[arg(short, long, value_name = "N")]
    repeat: Option<String>,

    /// Give up on a run after this many seconds [env: CHILD_BENCH_TIMEOUT]
    #[arg(short, long, value_name = "SECONDS")]
    timeout: Option<String>,

    /// Report format: text or json [env: CHILD_BENCH_FORMAT] [default: text]
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<String>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

/// Convert CLI args to CliArgs struct for AppConfig
impl From<&Args> for CliArgs {
    fn from(args: &Args) -> Self {
        Self {
            iterations: args.iterations.clone(),
            repeat: args.repeat.clone(),
            timeout: args.timeout.clone(),
            format: args.format.clone(),
        }
    }
}

/// A benchmark named on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    name: String,
    program: PathBuf,
}

impl Target {
    /// Parse `NAME=PROGRAM`, or `PROGRAM` named after its file stem
    ///
    /// A `=` only separates a name when no path separator comes before it,
    /// so `./v=2/bench` is a bare program.
    fn parse(spec: &str) -> anyhow::Result<Self> {
        let named = spec
            .split_once('=')
            .filter(|(name, _)| !name.chars().any(std::path::is_separator));
        let (name, program) = match named {
            Some((name, program)) => (name.trim().to_owned(), PathBuf::from(program)),
            None => {
                let program = PathBuf::from(spec);
                let name = program
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (name, program)
            }
        };

        if name.is_empty() || program.as_os_str().is_empty() {
            bail!("invalid benchmark target '{spec}' (expected NAME=PROGRAM or PROGRAM)");
        }
        Ok(Target { name, program })
    }
}

/// Run every target in sequence, each in a fresh worker
fn run_benchmarks(targets: &[Target], config: &AppConfig) -> anyhow::Result<Vec<BenchResult>> {
    let mut results = Vec::new();

    for target in targets {
        info!(
            "benchmarking '{}' ({} x {} iterations)",
            target.name,
            config.repeat(),
            config.iterations()
        );

        let mut bench = Bench::new(&target.name, &target.program)
            .with_context(|| format!("starting benchmark '{}'", target.name))?;

        for _ in 0..config.repeat() {
            let result = bench
                .exec(config.iterations())
                .and_then(|pending| pending.wait_for(config.timeout()))
                .with_context(|| format!("running benchmark '{}'", target.name))?;
            results.push(result);
        }

        bench.close();
    }

    Ok(results)
}

/// Write the report to `output`, or stdout when no file was given
fn emit_report(
    results: &[BenchResult],
    config: &AppConfig,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating report file {}", path.display()))?;
            write_report(results, config.format(), BufWriter::new(file))?;
        }
        None => write_report(results, config.format(), io::stdout().lock())?,
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = AppConfig::from_cli(CliArgs::from(&args))?;
    let targets = args
        .targets
        .iter()
        .map(|spec| Target::parse(spec))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let results = run_benchmarks(&targets, &config)?;
    emit_report(&results, &config, args.output.as_deref())
}
