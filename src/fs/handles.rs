use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use super::passthrough::{Backend, OpenMode};
use crate::error::{HolesError, Result};
use crate::state::stats::WriterStats;

struct CacheState<F> {
    /// Paths whose create-or-truncate open has happened.
    in_progress: HashSet<PathBuf>,
    /// Open files not currently used by any write.
    idle: HashMap<PathBuf, F>,
}

/// Hands out exclusively owned output files and keeps up to `capacity` of
/// them open between writes.
///
/// The number of physically open files never exceeds the number of files
/// currently acquired plus `capacity`. A full cache rejects new entries
/// rather than evicting old ones.
pub struct HandleCache<B: Backend> {
    backend: B,
    capacity: usize,
    state: Mutex<CacheState<B::File>>,
}

impl<B: Backend> HandleCache<B> {
    pub fn new(backend: B, capacity: usize) -> Self {
        Self {
            backend,
            capacity,
            state: Mutex::new(CacheState {
                in_progress: HashSet::new(),
                idle: HashMap::new(),
            }),
        }
    }

    /// Take the idle file for `path`, or open it.
    ///
    /// The first open of a path creates or truncates it; later opens append.
    /// Opens happen under the cache lock so the create-vs-append decision and
    /// the open itself are atomic. A path is marked in progress only once its
    /// create-or-truncate open succeeds, so a failed first open can be retried.
    pub fn acquire(&self, path: &Path, stats: &WriterStats) -> Result<B::File> {
        let mut state = self.state.lock();
        if let Some(file) = state.idle.remove(path) {
            debug!("Used cached writer for {}", path.display());
            stats.record_cache_hit();
            return Ok(file);
        }

        let mode = if state.in_progress.contains(path) {
            OpenMode::Append
        } else {
            OpenMode::Create
        };
        let file = self.backend.open(path, mode).map_err(|source| HolesError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        if mode == OpenMode::Create {
            state.in_progress.insert(path.to_path_buf());
        }
        stats.record_open(mode);
        debug!("Opened writer for {} mode={:?}", path.display(), mode);
        Ok(file)
    }

    /// Return a file after a write: cache it if there is room, close it otherwise.
    pub fn release(&self, path: &Path, file: B::File) {
        let rejected = {
            let mut state = self.state.lock();
            if state.idle.len() < self.capacity {
                // A write racing on the same path is a caller error; the
                // displaced file is closed.
                state.idle.insert(path.to_path_buf(), file)
            } else {
                Some(file)
            }
        };
        if rejected.is_some() {
            debug!("Closed writer for {}", path.display());
        }
    }

    /// Forget `path`: close its idle file, if any, and clear its in-progress
    /// mark. The next write to `path` truncates it.
    ///
    /// No write to `path` may be in flight.
    pub fn close(&self, path: &Path) {
        let file = {
            let mut state = self.state.lock();
            state.in_progress.remove(path);
            state.idle.remove(path)
        };
        if file.is_some() {
            debug!("Closed cached writer for {}", path.display());
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of idle files currently held open.
    pub fn idle_len(&self) -> usize {
        self.state.lock().idle.len()
    }

    pub fn is_cached(&self, path: &Path) -> bool {
        self.state.lock().idle.contains_key(path)
    }

    pub fn is_in_progress(&self, path: &Path) -> bool {
        self.state.lock().in_progress.contains(path)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
