//! Benchmark scripts exercised by the integration tests
//!
//! The script is chosen by the first argument, or by `CHILD_BENCH_FIXTURE`
//! when the binary is started without arguments.

use child_bench::worker::Script;
use std::cell::Cell;
use std::env;
use std::hint::black_box;
use std::process;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const FIXTURE_VAR: &str = "CHILD_BENCH_FIXTURE";

fn sum_squares() -> u64 {
    (0..1000u64).map(|n| black_box(n) * n).sum()
}

fn script(name: &str) -> Option<Script> {
    let script = match name {
        "sync" => Script::new(|| {
            black_box(sum_squares());
            Ok(())
        }),
        "async" => Script::new_async(|done| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                done.ok();
            });
        }),
        "child-error" => Script::new(|| Err("wat".into())),
        "child-error-async" => Script::new_async(|done| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(1));
                done.fail("wat");
            });
        }),
        "child-panic" => Script::new(|| panic!("wat")),
        "before" => {
            let prepared = Rc::new(Cell::new(false));
            let hook = Rc::clone(&prepared);
            Script::new(move || {
                if !prepared.get() {
                    return Err("before hook was not called".into());
                }
                black_box(sum_squares());
                Ok(())
            })
            .before(move || {
                hook.set(true);
                Ok(())
            })
        }
        "before-async" => {
            let prepared = Arc::new(AtomicBool::new(false));
            let hook = Arc::clone(&prepared);
            Script::new(move || {
                if !prepared.load(Ordering::SeqCst) {
                    return Err("before hook was not called".into());
                }
                Ok(())
            })
            .before_async(move |done| {
                let hook = Arc::clone(&hook);
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(5));
                    hook.store(true, Ordering::SeqCst);
                    done.ok();
                });
            })
        }
        "run" => Script::new(|| Err("exported function should not run".into())).run(|| {
            black_box(sum_squares());
            Ok(())
        }),
        "noisy" => Script::new(|| {
            println!("hello from the script");
            Ok(())
        }),
        "partial" => Script::new(|| {
            print!("x");
            Ok(())
        }),
        "exit" => Script::new(|| process::exit(3)),
        "slow" => Script::new(|| {
            thread::sleep(Duration::from_secs(5));
            Ok(())
        }),
        _ => return None,
    };
    Some(script)
}

fn main() {
    env_logger::init();

    let name = env::args()
        .nth(1)
        .or_else(|| env::var(FIXTURE_VAR).ok())
        .unwrap_or_default();

    let Some(script) = script(&name) else {
        eprintln!("unknown fixture script '{name}'");
        process::exit(2);
    };

    if let Err(e) = script.serve() {
        eprintln!("fixture '{name}' failed: {e}");
        process::exit(1);
    }
}
