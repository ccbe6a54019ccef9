//! Content-addressed blob storage ("tanks"): an N-way bank of on-disk
//! stores, selected by a process-wide round-robin cursor at store time.
//! Each tank is a plain directory keyed by the storage object key
//! (`object.<host>.<tank>.<user>.<onum>`), favoring readability over a
//! purpose-built hash file format.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;

pub fn object_key(host: &str, tnum: u64, unum: u64, onum: u64) -> String {
    format!("object.{host}.{tnum}.{unum}.{onum}")
}

pub struct Tank {
    root: PathBuf,
    pub tnum: u64,
}

impl Tank {
    pub fn new(root: PathBuf, tnum: u64) -> Self {
        Tank { root, tnum }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    pub async fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub async fn put(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        fs::read(self.path_for(key)).await.map_err(StoreError::from)
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }
}

/// The N-way bank, with a process-wide round-robin cursor advanced on
/// every `store`.
pub struct TankBank {
    tanks: Vec<Tank>,
    cursor: AtomicU64,
}

impl TankBank {
    pub fn open(root: &Path, count: u64) -> Self {
        let tanks = (0..count)
            .map(|tnum| Tank::new(root.join(format!("tank{tnum}")), tnum))
            .collect();
        TankBank {
            tanks,
            cursor: AtomicU64::new(0),
        }
    }

    pub async fn ensure_dirs(&self) -> Result<(), StoreError> {
        for tank in &self.tanks {
            tank.ensure_dir().await?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tanks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tanks.is_empty()
    }

    /// Selects the next tank by round-robin.
    pub fn select(&self) -> &Tank {
        let n = self.tanks.len() as u64;
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % n;
        &self.tanks[idx as usize]
    }

    pub fn by_tnum(&self, tnum: u64) -> Option<&Tank> {
        self.tanks.iter().find(|t| t.tnum == tnum)
    }
}
