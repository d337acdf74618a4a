use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::fs::zeros;

/// Default number of idle output handles kept open between writes.
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Default number of files restored concurrently.
pub const DEFAULT_JOBS: usize = 8;

#[derive(Parser, Debug)]
#[command(name = "holes", about = "Bounded, sparse-aware restore writer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Restore files into a target directory through the bounded writer
    Copy {
        /// Source files to restore
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Directory the files are restored into
        #[arg(short, long)]
        target: PathBuf,

        /// Maximum number of idle open output files
        #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY)]
        cache_capacity: usize,

        /// Number of files restored concurrently
        #[arg(short, long, default_value_t = DEFAULT_JOBS)]
        jobs: usize,

        /// Always write zero blocks as data instead of creating holes
        #[arg(long)]
        no_sparse: bool,

        /// Log file path
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Print the zero block size and identity
    ZeroId,
}

/// Settings for a [`FilesWriter`](crate::fs::FilesWriter).
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Idle handles kept open after a write. Zero disables caching.
    pub cache_capacity: usize,
    /// Allow zero blocks to be written as holes where the platform supports it.
    pub sparse: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            sparse: zeros::sparse_files_supported(),
        }
    }
}
