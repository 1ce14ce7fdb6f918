//! # Filesystem capability
//!
//! The source this design is drawn from treats the filesystem backend as
//! a process-wide swappable variable so tests can run against an
//! in-memory implementation instead of touching disk. We restate that as
//! a narrow trait: the state engine and genesis loader depend only on
//! `{ read_file, write_file, append_file, exists, create_dir_all }` — not
//! on `std::fs` directly — and production/tests each supply their own
//! implementation.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// The filesystem operations the ledger's on-disk state depends on.
pub trait DataFs: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;
    /// Appends a single line (the caller supplies the trailing newline)
    /// to the file at `path`, creating it if absent.
    fn append_line(&self, path: &Path, line: &str) -> io::Result<()>;
}

/// The real, OS-backed filesystem. Used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

impl DataFs for OsFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn append_line(&self, path: &Path, line: &str) -> io::Result<()> {
        use std::fs::OpenOptions;
        use std::io::Write;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")
    }
}

/// An in-memory filesystem for fast, disk-free tests. Paths are compared
/// as-is (no normalization), which is sufficient for the fixed
/// `{dataDir}/database/...` layout this crate uses.
#[derive(Default)]
pub struct InMemoryFs {
    files: Mutex<HashMap<PathBuf, String>>,
}

impl InMemoryFs {
    pub fn new() -> Self {
        InMemoryFs::default()
    }
}

impl DataFs for InMemoryFs {
    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        // Directories are implicit in the flat file map.
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn append_line(&self, path: &Path, line: &str) -> io::Result<()> {
        let mut files = self.files.lock().unwrap();
        let entry = files.entry(path.to_path_buf()).or_default();
        entry.push_str(line);
        entry.push('\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_fs_round_trips_writes() {
        let fs = InMemoryFs::new();
        let path = Path::new("/data/genesis.json");
        assert!(!fs.exists(path));
        fs.write(path, "{}").unwrap();
        assert!(fs.exists(path));
        assert_eq!(fs.read_to_string(path).unwrap(), "{}");
    }

    #[test]
    fn in_memory_fs_appends_lines() {
        let fs = InMemoryFs::new();
        let path = Path::new("/data/block.db");
        fs.append_line(path, "one").unwrap();
        fs.append_line(path, "two").unwrap();
        assert_eq!(fs.read_to_string(path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn missing_file_is_not_found() {
        let fs = InMemoryFs::new();
        let err = fs.read_to_string(Path::new("/nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
