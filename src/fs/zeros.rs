//! The zero block: a chunk-sized run of zero bytes and its content identity.
//!
//! Callers compare a chunk's identity against [`zeros_id`] to decide whether
//! the chunk can be restored with
//! [`FilesWriter::write_zeros`](crate::fs::FilesWriter::write_zeros).

use std::sync::LazyLock;

use super::cas::{self, ContentId};

/// Size of the zero block. Matches the minimum chunk size of the
/// content-defined chunker, so a zero run of at least this length yields
/// whole zero chunks.
pub const ZERO_BLOCK_SIZE: usize = 512 * 1024;

/// A block of zeros.
pub static ZEROS: [u8; ZERO_BLOCK_SIZE] = [0; ZERO_BLOCK_SIZE];

static ZEROS_ID: LazyLock<Option<ContentId>> = LazyLock::new(|| {
    if sparse_files_supported() {
        Some(cas::hash(&ZEROS))
    } else {
        None
    }
});

/// Reports whether the operating system can write zeros by extending a
/// file's length. The filesystem being restored to may still refuse, so
/// writers must always be ready to fall back to a regular write.
pub const fn sparse_files_supported() -> bool {
    !cfg!(windows)
}

/// Pre-computed identity of [`ZEROS`], or `None` when the platform has no
/// sparse file support and zero blocks should be restored as ordinary data.
pub fn zeros_id() -> Option<&'static ContentId> {
    ZEROS_ID.as_ref()
}
