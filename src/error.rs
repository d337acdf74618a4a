use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HolesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error opening file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error reading source {}: {source}", .path.display())]
    Source {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error writing file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "error writing file {}: wrong length written, want {expected}, got {actual}",
        .path.display()
    )]
    ShortWrite {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("error extending file {}: {source}", .path.display())]
    Extend {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Restore of {} cancelled", .0.display())]
    Cancelled(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HolesError>;
