//! Spool temp-file management: a tree rooted at a configured path with
//! `base/`, `data/`, `scan/` subdirectories. Temp files are created,
//! then immediately unlinked, so the returned descriptor has no
//! surviving directory entry (exclusive-create-then-unlink). A
//! reader-preferring lock keeps the cleanup walker from racing file
//! creation.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;

pub const SUBDIRS: [&str; 3] = ["base", "data", "scan"];

pub struct Spool {
    root: PathBuf,
    /// Creators hold the read side; the cleanup walker holds the write
    /// side, so a sweep never deletes a file mid-creation.
    guard: RwLock<()>,
}

impl Spool {
    pub fn new(root: PathBuf) -> Self {
        Spool {
            root,
            guard: RwLock::new(()),
        }
    }

    pub async fn ensure_dirs(&self) -> Result<(), StoreError> {
        for sub in SUBDIRS {
            tokio::fs::create_dir_all(self.root.join(sub)).await?;
        }
        Ok(())
    }

    fn subdir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Creates an anonymous temp file under `data/`: open exclusively,
    /// unlink immediately, return the still-open handle. Concurrent
    /// creation is safe against the cleanup walker via the read lock.
    pub async fn create_temp(&self) -> Result<File, StoreError> {
        let _held = self.guard.read();
        let path = self.subdir("data").join(format!(
            "spool-{}-{}",
            std::process::id(),
            rand::random::<u64>()
        ));
        let file = tokio::fs::OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(&path)
            .await?;
        tokio::fs::remove_file(&path).await?;
        Ok(file)
    }

    pub async fn write_temp(&self, data: &[u8]) -> Result<File, StoreError> {
        let mut file = self.create_temp().await?;
        file.write_all(data).await?;
        Ok(file)
    }

    /// Directory-walk + unlink of lingering files, run at startup and
    /// shutdown. Takes the write side of the guard so no creator races it.
    pub async fn cleanup(&self) -> Result<u64, StoreError> {
        let _held = self.guard.write();
        let mut removed = 0u64;
        for sub in SUBDIRS {
            removed += sweep_dir(&self.subdir(sub)).await?;
        }
        trc::Event::new(trc::EventType::SpoolCleanup)
            .ctx("removed", removed)
            .log();
        Ok(removed)
    }
}

async fn sweep_dir(dir: &Path) -> Result<u64, StoreError> {
    let mut removed = 0u64;
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(StoreError::Io(err)),
    };
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            tokio::fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("magma-spool-test-{}", rand::random::<u64>()))
    }

    #[tokio::test]
    async fn temp_file_has_no_directory_entry() {
        let root = temp_root();
        let spool = Spool::new(root.clone());
        spool.ensure_dirs().await.unwrap();

        let mut file = spool.write_temp(b"assembling a message").await.unwrap();
        let entries = std::fs::read_dir(root.join("data")).unwrap().count();
        assert_eq!(entries, 0);

        use tokio::io::{AsyncReadExt, AsyncSeekExt};
        file.seek(std::io::SeekFrom::Start(0)).await.unwrap();
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"assembling a message");

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn cleanup_sweeps_lingering_files() {
        let root = temp_root();
        let spool = Spool::new(root.clone());
        spool.ensure_dirs().await.unwrap();
        tokio::fs::write(root.join("base").join("leftover"), b"x").await.unwrap();

        let removed = spool.cleanup().await.unwrap();
        assert_eq!(removed, 1);

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
