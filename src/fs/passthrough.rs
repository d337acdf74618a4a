//! Filesystem primitives used by the writer.
//! These wrap the OS open/write/truncate/seek/stat calls behind a trait so the
//! handle cache can be driven by something other than the real filesystem.
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

/// How an output file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create the file, or truncate it if it already exists.
    Create,
    /// Open an existing file for appending.
    Append,
}

/// An open output file. Dropping it closes the underlying handle; close
/// errors are ignored.
pub trait OutputFile: Send {
    /// Issue a single write of `buf`, returning the number of bytes written.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Current length of the file.
    fn len(&self) -> io::Result<u64>;

    /// Change the length of the file without writing data.
    fn set_len(&self, size: u64) -> io::Result<()>;

    /// Move the write cursor to the end of the file and return its position.
    fn seek_end(&mut self) -> io::Result<u64>;
}

/// Opens output files.
pub trait Backend: Send + Sync {
    type File: OutputFile;

    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Self::File>;
}

/// Backend over the host filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsBackend;

impl Backend for OsBackend {
    type File = File;

    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<File> {
        let mut options = OpenOptions::new();
        match mode {
            OpenMode::Create => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.append(true),
        };
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        options.open(path)
    }
}

impl OutputFile for File {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(self, buf)
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn set_len(&self, size: u64) -> io::Result<()> {
        File::set_len(self, size)
    }

    fn seek_end(&mut self) -> io::Result<u64> {
        self.seek(SeekFrom::End(0))
    }
}
