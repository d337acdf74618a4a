use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use holes::config::{Cli, Command, WriterConfig};
use holes::fs::zeros;
use holes::fs::FilesWriter;
use holes::restore;

/// Set by SIGINT/SIGTERM; restore workers stop at their next chunk.
static CANCEL: AtomicBool = AtomicBool::new(false);

extern "C" fn signal_handler(_sig: libc::c_int) {
    CANCEL.store(true, Ordering::Relaxed);
}

fn install_signal_handlers() {
    unsafe {
        use nix::sys::signal::{signal, SigHandler, Signal};
        signal(Signal::SIGINT, SigHandler::Handler(signal_handler)).ok();
        signal(Signal::SIGTERM, SigHandler::Handler(signal_handler)).ok();
    }
}

fn init_logging(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let (file_layer, guard) = match log_file {
        Some(log_file) => {
            let log_dir = log_file.parent().unwrap_or_else(|| Path::new("."));
            let log_name = log_file
                .file_name()
                .unwrap_or_else(|| std::ffi::OsStr::new("holes.log"));
            let file_appender = tracing_appender::rolling::never(log_dir, log_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        );
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
    guard
}

/// Warn when the writer may hold more files open than the process may.
fn check_open_file_limit(jobs: usize, cache_capacity: usize) {
    use nix::sys::resource::{getrlimit, Resource};

    // stdio, the log file and one source file per job
    let needed = (cache_capacity + 2 * jobs + 8) as u64;
    match getrlimit(Resource::RLIMIT_NOFILE) {
        Ok((soft, _hard)) if (soft as u64) < needed => warn!(
            "open file limit {} may be too low for {} jobs and a cache of {} files",
            soft, jobs, cache_capacity
        ),
        Ok(_) => {}
        Err(e) => warn!("could not read open file limit: {}", e),
    }
}

fn copy(
    sources: Vec<PathBuf>,
    target: PathBuf,
    cache_capacity: usize,
    jobs: usize,
    no_sparse: bool,
) -> holes::error::Result<bool> {
    let config = WriterConfig {
        cache_capacity,
        sparse: !no_sparse && zeros::sparse_files_supported(),
    };
    check_open_file_limit(jobs, config.cache_capacity);

    let plan = restore::plan(&sources, &target)?;
    info!(
        "restoring {} file(s) into {}: jobs={}, cache_capacity={}, sparse={}",
        plan.len(),
        target.display(),
        jobs,
        config.cache_capacity,
        config.sparse
    );

    let writer = FilesWriter::new(&config);
    let summary = restore::run(&writer, &plan, jobs, &CANCEL);
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "{}".to_string())
    );
    Ok(summary.files_failed == 0)
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Copy {
            sources,
            target,
            cache_capacity,
            jobs,
            no_sparse,
            log_file,
        } => {
            let guard = init_logging(log_file.as_deref());
            install_signal_handlers();

            let ok = match copy(sources, target, cache_capacity, jobs, no_sparse) {
                Ok(ok) => ok,
                Err(e) => {
                    error!("{}", e);
                    false
                }
            };
            // Flush the log file before exiting.
            drop(guard);
            if !ok {
                std::process::exit(1);
            }
        }
        Command::ZeroId => {
            let info = serde_json::json!({
                "block_size": zeros::ZERO_BLOCK_SIZE,
                "id": zeros::zeros_id().map(|id| id.to_string()),
                "sparse_supported": zeros::sparse_files_supported(),
            });
            println!("{}", info);
        }
    }
}
