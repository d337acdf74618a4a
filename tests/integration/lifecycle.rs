use std::fs;

use holes::config::WriterConfig;
use holes::fs::zeros::ZERO_BLOCK_SIZE;
use holes::fs::FilesWriter;

/// After close, the path has no cached file and the next write starts over.
#[test]
fn test_close_then_rewrite_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reused");
    let writer = FilesWriter::new(&WriterConfig {
        cache_capacity: 4,
        ..WriterConfig::default()
    });

    writer.write_to_file(&path, b"first generation").unwrap();
    writer.write_zeros(&path).unwrap();
    assert!(writer.cache().is_cached(&path));
    writer.close(&path);

    assert!(!writer.cache().is_cached(&path));
    assert!(!writer.cache().is_in_progress(&path));
    assert_eq!(
        fs::metadata(&path).unwrap().len(),
        16 + ZERO_BLOCK_SIZE as u64
    );

    writer.write_to_file(&path, b"second").unwrap();
    writer.close(&path);
    assert_eq!(fs::read_to_string(&path).unwrap(), "second");
}

/// Closing one path leaves other paths' cached files alone.
#[test]
fn test_close_is_per_path() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    let writer = FilesWriter::new(&WriterConfig {
        cache_capacity: 2,
        ..WriterConfig::default()
    });

    writer.write_to_file(&a, b"a1").unwrap();
    writer.write_to_file(&b, b"b1").unwrap();
    writer.close(&a);

    assert_eq!(writer.cache().idle_len(), 1);
    assert!(writer.cache().is_cached(&b));

    writer.write_to_file(&b, b"b2").unwrap();
    writer.close(&b);
    assert_eq!(fs::read_to_string(&a).unwrap(), "a1");
    assert_eq!(fs::read_to_string(&b).unwrap(), "b1b2");
    assert_eq!(writer.cache().idle_len(), 0);
}

/// Dropping the writer closes whatever it still caches.
#[test]
fn test_drop_closes_cached_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dropped");
    {
        let writer = FilesWriter::new(&WriterConfig {
            cache_capacity: 1,
            ..WriterConfig::default()
        });
        writer.write_to_file(&path, b"kept").unwrap();
    }
    assert_eq!(fs::read_to_string(&path).unwrap(), "kept");
}
