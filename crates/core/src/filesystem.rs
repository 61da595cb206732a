use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

use crate::model::FileEntry;

pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    // Sorted by file name.
    fn list_regular_files(&self, dir: &Path) -> io::Result<Vec<FileEntry>>;

    fn create_dir_if_absent(&self, path: &Path) -> io::Result<()>;

    fn atomic_move(&self, source: &Path, destination: &Path) -> io::Result<()>;

    fn read_all_bytes(&self, path: &Path) -> io::Result<Vec<u8>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_regular_files(&self, dir: &Path) -> io::Result<Vec<FileEntry>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|err| {
                err.into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "directory walk failed"))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            // Metadata can vanish between listing and stat; report size zero rather than abort.
            let size_bytes = entry.metadata().map(|meta| meta.len()).unwrap_or(0);
            entries.push(FileEntry::new(entry.into_path(), size_bytes));
        }
        Ok(entries)
    }

    fn create_dir_if_absent(&self, path: &Path) -> io::Result<()> {
        match fs::create_dir(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn atomic_move(&self, source: &Path, destination: &Path) -> io::Result<()> {
        fs::rename(source, destination)
    }

    fn read_all_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{FileSystem, LocalFileSystem};

    #[test]
    fn lists_only_top_level_regular_files_sorted() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("b.txt"), "b").expect("write b");
        fs::write(temp.path().join("a.txt"), "aaa").expect("write a");
        fs::create_dir(temp.path().join("nested")).expect("mkdir");
        fs::write(temp.path().join("nested").join("c.txt"), "c").expect("write c");

        let entries = LocalFileSystem
            .list_regular_files(temp.path())
            .expect("listing succeeds");
        let names = entries
            .iter()
            .map(|entry| entry.file_name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(entries[0].size_bytes, 3);
    }

    #[test]
    fn listing_missing_directory_fails() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = temp.path().join("missing");
        assert!(LocalFileSystem.list_regular_files(&missing).is_err());
    }

    #[test]
    fn create_dir_if_absent_is_idempotent_but_rejects_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let folder = temp.path().join("A");
        LocalFileSystem
            .create_dir_if_absent(&folder)
            .expect("first create");
        LocalFileSystem
            .create_dir_if_absent(&folder)
            .expect("second create is a no-op");

        let blocker = temp.path().join("B");
        fs::write(&blocker, "not a dir").expect("write blocker");
        assert!(LocalFileSystem.create_dir_if_absent(&blocker).is_err());
    }
}
