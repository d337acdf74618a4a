use std::path::{Path, PathBuf};

use holes::config::WriterConfig;
use holes::error::HolesError;
use holes::fs::passthrough::OpenMode;
use holes::fs::FilesWriter;

use crate::helpers::StubBackend;

fn writer(backend: &StubBackend, cache_capacity: usize) -> FilesWriter<StubBackend> {
    let config = WriterConfig {
        cache_capacity,
        sparse: true,
    };
    FilesWriter::with_backend(backend.clone(), &config)
}

#[test]
fn test_first_open_creates_later_opens_append() {
    let backend = StubBackend::new();
    let writer = writer(&backend, 0);
    let path = Path::new("a");

    let blobs: [&[u8]; 3] = [b"one", b"two", b"three"];
    for blob in blobs {
        writer.write_to_file(path, blob).unwrap();
    }

    assert_eq!(
        backend.open_modes(path),
        vec![OpenMode::Create, OpenMode::Append, OpenMode::Append]
    );
    assert_eq!(backend.contents(path).unwrap(), b"onetwothree");
    assert!(writer.cache().is_in_progress(path));

    let stats = writer.stats().snapshot();
    assert_eq!(stats.created, 1);
    assert_eq!(stats.reopened, 2);
    assert_eq!(stats.cache_hits, 0);
}

#[test]
fn test_cached_handle_is_reused() {
    let backend = StubBackend::new();
    let writer = writer(&backend, 1);
    let path = Path::new("a");

    for _ in 0..3 {
        writer.write_to_file(path, b"x").unwrap();
    }

    assert_eq!(backend.open_modes(path), vec![OpenMode::Create]);
    assert_eq!(writer.stats().snapshot().cache_hits, 2);
    assert_eq!(backend.live(), 1);
    assert!(writer.cache().is_cached(path));
}

#[test]
fn test_cache_never_exceeds_capacity() {
    let backend = StubBackend::new();
    let writer = writer(&backend, 2);
    let paths: Vec<PathBuf> = (0..10).map(|i| PathBuf::from(format!("f{}", i))).collect();

    for round in 0..3 {
        for path in &paths {
            writer.write_to_file(path, format!("{};", round).as_bytes()).unwrap();
            assert!(writer.cache().idle_len() <= 2);
        }
    }

    assert_eq!(writer.cache().idle_len(), 2);
    assert_eq!(backend.live(), 2);
    // First come, first served: the paths that filled the cache keep it.
    assert!(writer.cache().is_cached(&paths[0]));
    assert!(writer.cache().is_cached(&paths[1]));
    assert!(!writer.cache().is_cached(&paths[9]));
    for path in &paths {
        assert_eq!(backend.contents(path).unwrap(), b"0;1;2;");
    }
}

#[test]
fn test_close_forgets_path() {
    let backend = StubBackend::new();
    let writer = writer(&backend, 1);
    let path = Path::new("a");

    writer.write_to_file(path, b"old").unwrap();
    writer.close(path);

    assert_eq!(writer.cache().idle_len(), 0);
    assert_eq!(backend.live(), 0);
    assert!(!writer.cache().is_in_progress(path));

    writer.write_to_file(path, b"new").unwrap();
    assert_eq!(backend.open_modes(path), vec![OpenMode::Create, OpenMode::Create]);
    assert_eq!(backend.contents(path).unwrap(), b"new");
}

#[test]
fn test_close_of_unknown_path_is_noop() {
    let backend = StubBackend::new();
    let writer = writer(&backend, 1);
    writer.write_to_file(Path::new("kept"), b"data").unwrap();

    writer.close(Path::new("never-written"));

    assert!(writer.cache().is_cached(Path::new("kept")));
    assert_eq!(backend.live(), 1);
}

#[test]
fn test_failed_first_open_can_be_retried() {
    let backend = StubBackend::new();
    let writer = writer(&backend, 1);
    let path = Path::new("locked");

    backend.fail_open(path);
    let err = writer.write_to_file(path, b"data").unwrap_err();
    assert!(matches!(err, HolesError::Open { .. }), "got {:?}", err);
    assert!(!writer.cache().is_in_progress(path));

    backend.allow_open(path);
    writer.write_to_file(path, b"data").unwrap();
    assert_eq!(backend.open_modes(path), vec![OpenMode::Create]);
    assert_eq!(backend.contents(path).unwrap(), b"data");
}

#[test]
fn test_failed_reopen_keeps_path_in_progress() {
    let backend = StubBackend::new();
    let writer = writer(&backend, 0);
    let path = Path::new("a");

    writer.write_to_file(path, b"first").unwrap();
    backend.fail_open(path);
    writer.write_to_file(path, b"second").unwrap_err();
    backend.allow_open(path);
    writer.write_to_file(path, b"third").unwrap();

    assert_eq!(
        backend.open_modes(path),
        vec![OpenMode::Create, OpenMode::Append]
    );
    assert_eq!(backend.contents(path).unwrap(), b"firstthird");
}

/// Physically open files never exceed in-flight writes plus the cache size.
#[test]
fn test_open_files_bounded_under_concurrency() {
    const THREADS: usize = 6;
    const FILES_PER_THREAD: usize = 5;
    const BLOBS_PER_FILE: usize = 40;
    const CAPACITY: usize = 3;

    let backend = StubBackend::new();
    let writer = writer(&backend, CAPACITY);

    std::thread::scope(|scope| {
        for t in 0..THREADS {
            let writer = &writer;
            scope.spawn(move || {
                // Interleave this thread's files so handles cycle through the cache.
                for blob in 0..BLOBS_PER_FILE {
                    for f in 0..FILES_PER_THREAD {
                        let path = PathBuf::from(format!("t{}-f{}", t, f));
                        writer.write_to_file(&path, &[blob as u8]).unwrap();
                        assert!(writer.cache().idle_len() <= CAPACITY);
                    }
                }
            });
        }
    });

    assert!(
        backend.max_live() <= THREADS + CAPACITY,
        "{} files open at once",
        backend.max_live()
    );
    assert!(writer.cache().idle_len() <= CAPACITY);
    assert_eq!(backend.live(), writer.cache().idle_len());

    let expected: Vec<u8> = (0..BLOBS_PER_FILE).map(|b| b as u8).collect();
    for t in 0..THREADS {
        for f in 0..FILES_PER_THREAD {
            let path = PathBuf::from(format!("t{}-f{}", t, f));
            assert_eq!(backend.contents(&path).unwrap(), expected);
        }
    }
}
