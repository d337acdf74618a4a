pub mod cas;
pub mod handles;
pub mod passthrough;
pub mod sparse;
pub mod zeros;

use std::path::Path;

use tracing::debug;

use self::handles::HandleCache;
use self::passthrough::{Backend, OsBackend, OutputFile};
use self::sparse::{extend_file, ExtensionOutcome};
use self::zeros::{ZEROS, ZERO_BLOCK_SIZE};
use crate::config::WriterConfig;
use crate::error::{HolesError, Result};
use crate::state::stats::WriterStats;

/// Writes blobs to output files.
///
/// Each file is written sequentially, start to finish, but many files can be
/// written concurrently from different threads. Any number of files may be
/// logically open; the number of physically open files never exceeds the
/// number of concurrent `write_to_file`/`write_zeros` calls plus the cache
/// capacity. A write never touches another write's open file.
pub struct FilesWriter<B: Backend = OsBackend> {
    cache: HandleCache<B>,
    sparse: bool,
    stats: WriterStats,
}

impl FilesWriter<OsBackend> {
    pub fn new(config: &WriterConfig) -> Self {
        Self::with_backend(OsBackend, config)
    }
}

impl<B: Backend> FilesWriter<B> {
    pub fn with_backend(backend: B, config: &WriterConfig) -> Self {
        Self {
            cache: HandleCache::new(backend, config.cache_capacity),
            sparse: config.sparse && zeros::sparse_files_supported(),
            stats: WriterStats::new(),
        }
    }

    /// Append `blob` to the file at `path`, creating it on the first write.
    pub fn write_to_file(&self, path: &Path, blob: &[u8]) -> Result<()> {
        let mut file = self.cache.acquire(path, &self.stats)?;
        let result = self.write_blob(path, &mut file, blob);
        self.cache.release(path, file);
        result
    }

    /// Append one zero block to the file at `path`, as a hole when possible.
    pub fn write_zeros(&self, path: &Path) -> Result<()> {
        let mut file = self.cache.acquire(path, &self.stats)?;
        let result = self.fill_zeros(path, &mut file);
        self.cache.release(path, file);
        result
    }

    /// Tear down `path` once all of its writes have completed. Writing to
    /// `path` afterwards starts over with an empty file.
    pub fn close(&self, path: &Path) {
        self.cache.close(path);
    }

    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }

    pub fn cache(&self) -> &HandleCache<B> {
        &self.cache
    }

    /// Whether zero blocks are attempted as holes before falling back.
    pub fn sparse_enabled(&self) -> bool {
        self.sparse
    }

    fn write_blob(&self, path: &Path, file: &mut B::File, blob: &[u8]) -> Result<()> {
        let n = file.write(blob).map_err(|source| HolesError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        self.stats.record_bytes(n);
        if n != blob.len() {
            return Err(HolesError::ShortWrite {
                path: path.to_path_buf(),
                expected: blob.len(),
                actual: n,
            });
        }
        Ok(())
    }

    fn fill_zeros(&self, path: &Path, file: &mut B::File) -> Result<()> {
        if self.sparse {
            match extend_file(file, ZERO_BLOCK_SIZE as u64) {
                ExtensionOutcome::Extended => {
                    self.stats.record_hole();
                    return Ok(());
                }
                ExtensionOutcome::SafeToFallback => {
                    debug!("Extending {} failed, writing zeros", path.display());
                    self.stats.record_zero_fallback();
                }
                ExtensionOutcome::Fatal(source) => {
                    return Err(HolesError::Extend {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }
        self.write_blob(path, file, &ZEROS)
    }
}
