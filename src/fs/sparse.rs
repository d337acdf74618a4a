use std::io;

use super::passthrough::OutputFile;

/// Result of trying to grow a file without writing data.
#[derive(Debug)]
pub(crate) enum ExtensionOutcome {
    /// The file grew and the cursor sits at the new end.
    Extended,
    /// The file could not grow but was left untouched; writing the zeros as
    /// data is safe.
    SafeToFallback,
    /// The extension failed and the file may have been modified.
    Fatal(io::Error),
}

/// Grow `file` by `by` bytes of zeros via its length.
///
/// The cursor position after a length change is platform defined, so it is
/// moved to the end explicitly. On failure the cursor is moved to the end as
/// well; if that position equals the length read before the attempt, nothing
/// was modified.
pub(crate) fn extend_file<F: OutputFile>(file: &mut F, by: u64) -> ExtensionOutcome {
    let size = match file.len() {
        Ok(size) => size,
        Err(e) => return ExtensionOutcome::Fatal(e),
    };

    let err = match file.set_len(size + by) {
        Ok(()) => {
            return match file.seek_end() {
                Ok(_) => ExtensionOutcome::Extended,
                Err(e) => ExtensionOutcome::Fatal(e),
            };
        }
        Err(e) => e,
    };

    // Seek rather than read the cursor: a handle reopened for append sits at
    // 0 until its first write.
    match file.seek_end() {
        Ok(pos) if pos == size => ExtensionOutcome::SafeToFallback,
        _ => ExtensionOutcome::Fatal(err),
    }
}
