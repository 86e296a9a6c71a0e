use std::cmp::Ordering;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::ErrorKind;

use crate::atomic::AtomicFile;

/// Flat directory holding every stored audio file.
#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Resolves a stored file name to its path inside the root.
    ///
    /// The name must be a single plain component. A missing file is fine,
    /// a symlink is not.
    pub async fn resolve_file(&self, name: &str) -> Result<PathBuf, StorageError> {
        if !is_plain_component(name) {
            return Err(StorageError::InvalidPath);
        }
        let target = self.root.join(name);
        match fs::symlink_metadata(&target).await {
            Ok(metadata) if metadata.file_type().is_symlink() => Err(StorageError::InvalidPath),
            Ok(_) => Ok(target),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(target),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    /// Resolves a name that must refer to an existing regular file.
    pub async fn existing_file(&self, name: &str) -> Result<PathBuf, StorageError> {
        let target = self.resolve_file(name).await?;
        let metadata = fs::metadata(&target).await?;
        if !metadata.is_file() {
            return Err(StorageError::Io(io::Error::from(ErrorKind::NotFound)));
        }
        Ok(target)
    }

    /// Lists regular file names in the root, sorted case-insensitively.
    pub async fn list_files(&self) -> Result<Vec<String>, StorageError> {
        let mut dir = fs::read_dir(&self.root).await?;
        let mut names = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let file_type = entry.file_type().await?;
            if !file_type.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            names.push(name);
        }

        names.sort_by(|a, b| match a.to_lowercase().cmp(&b.to_lowercase()) {
            Ordering::Equal => a.cmp(b),
            other => other,
        });

        Ok(names)
    }

    /// Opens a stored file for reading.
    pub async fn open_file(&self, name: &str) -> Result<(File, Metadata), StorageError> {
        let target = self.resolve_file(name).await?;
        let file = File::open(&target).await?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(StorageError::Io(io::Error::from(ErrorKind::NotFound)));
        }
        Ok((file, metadata))
    }

    /// Starts an atomic write that replaces `name` once finalized.
    pub async fn begin_write(&self, name: &str) -> Result<AtomicFile, StorageError> {
        let target = self.resolve_file(name).await?;
        Ok(AtomicFile::new(&target).await?)
    }
}

fn is_plain_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[derive(Debug)]
pub enum StorageError {
    InvalidPath,
    Io(io::Error),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::{Storage, StorageError};
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn resolve_file_rejects_path_components() {
        let temp = tempdir().expect("tempdir");
        let storage = Storage::new(temp.path().to_path_buf());

        for name in ["", ".", "..", "../x.wav", "a/b.wav", "a\\b.wav", "/etc/x.wav"] {
            let result = storage.resolve_file(name).await;
            assert!(
                matches!(result, Err(StorageError::InvalidPath)),
                "{name} should be rejected"
            );
        }
        let path = storage.resolve_file("missing.wav").await.expect("resolve");
        assert_eq!(path, temp.path().join("missing.wav"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn resolve_file_rejects_symlink() {
        use std::os::unix::fs::symlink;

        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("root");
        std::fs::create_dir_all(&root).expect("create root");

        let outside = temp.path().join("outside.wav");
        std::fs::write(&outside, b"secret").expect("write outside file");
        symlink(&outside, root.join("link.wav")).expect("symlink");

        let storage = Storage::new(root);
        let result = storage.resolve_file("link.wav").await;
        assert!(matches!(result, Err(StorageError::InvalidPath)));
    }

    #[tokio::test]
    async fn list_files_skips_directories_and_sorts() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path();
        std::fs::write(root.join("b.wav"), b"").expect("write b");
        std::fs::write(root.join("A.wav"), b"").expect("write A");
        std::fs::write(root.join("notes.txt"), b"").expect("write txt");
        std::fs::create_dir(root.join("sub.wav")).expect("create dir");

        let storage = Storage::new(root.to_path_buf());
        let names = storage.list_files().await.expect("list");
        assert_eq!(names, vec!["A.wav", "b.wav", "notes.txt"]);
    }

    #[tokio::test]
    async fn begin_write_replaces_existing_file() {
        let temp = tempdir().expect("tempdir");
        let storage = Storage::new(temp.path().to_path_buf());
        std::fs::write(temp.path().join("a.wav"), b"old").expect("write old");

        let mut atomic = storage.begin_write("a.wav").await.expect("begin");
        atomic.file_mut().write_all(b"new").await.expect("write");
        atomic.finalize().await.expect("finalize");

        let content = std::fs::read(temp.path().join("a.wav")).expect("read");
        assert_eq!(content, b"new");
        let names = storage.list_files().await.expect("list");
        assert_eq!(names, vec!["a.wav"]);
    }

    #[tokio::test]
    async fn existing_file_rejects_directories_and_missing_names() {
        let temp = tempdir().expect("tempdir");
        std::fs::create_dir(temp.path().join("sub.wav")).expect("create dir");
        std::fs::write(temp.path().join("a.wav"), b"").expect("write");
        let storage = Storage::new(temp.path().to_path_buf());

        for name in ["sub.wav", "missing.wav"] {
            match storage.existing_file(name).await {
                Err(StorageError::Io(err)) => {
                    assert_eq!(err.kind(), std::io::ErrorKind::NotFound, "{name}")
                }
                _ => panic!("{name} should be not found"),
            }
        }
        let path = storage.existing_file("a.wav").await.expect("existing");
        assert_eq!(path, temp.path().join("a.wav"));
    }

    #[tokio::test]
    async fn open_file_reports_missing_as_not_found() {
        let temp = tempdir().expect("tempdir");
        let storage = Storage::new(temp.path().to_path_buf());
        let result = storage.open_file("missing.wav").await;
        match result {
            Err(StorageError::Io(err)) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("expected not found"),
        }
    }
}
