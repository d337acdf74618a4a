//! Restores plain files into a target directory through a [`FilesWriter`].
//!
//! Sources are read in zero-block sized chunks. Chunks whose identity equals
//! the zero block identity are written with `write_zeros`, everything else
//! with `write_to_file`. Each file is restored sequentially by one worker;
//! workers run different files in parallel.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::{HolesError, Result};
use crate::fs::cas::{self, ContentId};
use crate::fs::passthrough::Backend;
use crate::fs::zeros::{self, ZERO_BLOCK_SIZE};
use crate::fs::FilesWriter;
use crate::state::stats::StatsSnapshot;

/// One file to restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    pub source: PathBuf,
    pub target: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct FailedFile {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct RestoreSummary {
    pub files_restored: usize,
    pub files_failed: usize,
    pub failures: Vec<FailedFile>,
    pub writer: StatsSnapshot,
}

/// Map each source to `<target_dir>/<file name>`.
pub fn plan(sources: &[PathBuf], target_dir: &Path) -> Result<Vec<CopyJob>> {
    if !target_dir.is_dir() {
        return Err(HolesError::Config(format!(
            "target is not a directory: {}",
            target_dir.display()
        )));
    }

    let mut seen = HashSet::new();
    let mut jobs = Vec::with_capacity(sources.len());
    for source in sources {
        let name = source.file_name().ok_or_else(|| {
            HolesError::Config(format!("source has no file name: {}", source.display()))
        })?;
        if !seen.insert(name.to_os_string()) {
            return Err(HolesError::Config(format!(
                "more than one source named {:?}",
                name
            )));
        }
        let target = target_dir.join(name);
        if is_same_file(source, &target)? {
            return Err(HolesError::Config(format!(
                "{} would be restored over itself",
                source.display()
            )));
        }
        jobs.push(CopyJob {
            source: source.clone(),
            target,
        });
    }
    Ok(jobs)
}

/// Restore `jobs` using up to `workers` threads.
///
/// A failing file does not stop the others; failures are logged and listed
/// in the summary. Setting `cancel` stops every worker at its next chunk.
pub fn run<B: Backend>(
    writer: &FilesWriter<B>,
    jobs: &[CopyJob],
    workers: usize,
    cancel: &AtomicBool,
) -> RestoreSummary {
    let zero_id = if writer.sparse_enabled() {
        zeros::zeros_id()
    } else {
        None
    };
    let next = AtomicUsize::new(0);
    let restored = AtomicUsize::new(0);
    let failures = Mutex::new(Vec::new());

    std::thread::scope(|scope| {
        for _ in 0..workers.clamp(1, jobs.len().max(1)) {
            scope.spawn(|| loop {
                let i = next.fetch_add(1, Ordering::Relaxed);
                let Some(job) = jobs.get(i) else { break };
                match restore_file(writer, job, zero_id, cancel) {
                    Ok(size) => {
                        debug!("Restored {} ({} bytes)", job.target.display(), size);
                        restored.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        error!("Failed to restore {}: {}", job.target.display(), e);
                        failures.lock().push(FailedFile {
                            path: job.target.display().to_string(),
                            error: e.to_string(),
                        });
                    }
                }
            });
        }
    });

    let failures = failures.into_inner();
    let summary = RestoreSummary {
        files_restored: restored.into_inner(),
        files_failed: failures.len(),
        failures,
        writer: writer.stats().snapshot(),
    };
    info!(
        "Restored {} file(s), {} failed",
        summary.files_restored, summary.files_failed
    );
    summary
}

/// Restore one file, tearing its path down whether or not it succeeded.
pub fn restore_file<B: Backend>(
    writer: &FilesWriter<B>,
    job: &CopyJob,
    zero_id: Option<&ContentId>,
    cancel: &AtomicBool,
) -> Result<u64> {
    let result = copy_chunks(writer, job, zero_id, cancel);
    writer.close(&job.target);
    result
}

fn copy_chunks<B: Backend>(
    writer: &FilesWriter<B>,
    job: &CopyJob,
    zero_id: Option<&ContentId>,
    cancel: &AtomicBool,
) -> Result<u64> {
    let source_err = |source| HolesError::Source {
        path: job.source.clone(),
        source,
    };
    // Opening the target truncates it, so this must be known before the
    // first write.
    if is_same_file(&job.source, &job.target).map_err(source_err)? {
        return Err(HolesError::Config(format!(
            "{} would be restored over itself",
            job.source.display()
        )));
    }
    let mut source = File::open(&job.source).map_err(source_err)?;
    let mut buf = vec![0u8; ZERO_BLOCK_SIZE];
    let mut total = 0u64;

    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(HolesError::Cancelled(job.target.clone()));
        }
        let n = read_chunk(&mut source, &mut buf).map_err(source_err)?;
        if n == 0 {
            break;
        }
        let chunk = &buf[..n];
        let is_zero_block =
            n == ZERO_BLOCK_SIZE && zero_id.is_some_and(|id| cas::hash(chunk) == *id);
        if is_zero_block {
            writer.write_zeros(&job.target)?;
        } else {
            writer.write_to_file(&job.target, chunk)?;
        }
        total += n as u64;
    }

    // An empty source never reaches the writer above.
    if total == 0 {
        writer.write_to_file(&job.target, &[])?;
    }
    Ok(total)
}

/// Fill `buf` from `reader`, stopping early only at end of input.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Whether `target` already exists and is the same file as `source`, through
/// a symlink or hard link or by naming the same path.
fn is_same_file(source: &Path, target: &Path) -> io::Result<bool> {
    let target_meta = match std::fs::metadata(target) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    let source_meta = match std::fs::metadata(source) {
        Ok(meta) => meta,
        // A missing source is reported when its job runs.
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        Ok(source_meta.dev() == target_meta.dev() && source_meta.ino() == target_meta.ino())
    }
    #[cfg(not(unix))]
    {
        let _ = (source_meta, target_meta);
        Ok(std::fs::canonicalize(source)? == std::fs::canonicalize(target)?)
    }
}
